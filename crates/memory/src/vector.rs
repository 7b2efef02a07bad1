//! Contiguous vector over a pluggable [`Storage`] policy
//!
//! The policy decides where slots live: a borrowed fixed buffer
//! ([`StaticStorage`]) or a private arena that grows in place
//! ([`ArenaStorage`]). Either way elements never move once pushed, and a
//! push that does not fit is reported instead of reallocating.

use std::fmt;
use std::mem::MaybeUninit;
use std::ops::{Deref, DerefMut};
use std::ptr;

use crate::error::MemoryResult;
use crate::storage::{ArenaStorage, StaticStorage, Storage};

/// Vector over a caller-owned buffer
pub type StaticVec<'a, T> = Vector<T, StaticStorage<'a, T>>;

/// Growable vector over storage policy `S`
///
/// Derefs to `[T]`, so slice methods (`get`, `first`, `last`, `iter`,
/// indexing, sorting, ...) work directly.
///
/// # Examples
///
/// ```
/// use std::mem::MaybeUninit;
/// use arenakit_memory::vector::Vector;
///
/// let mut buf = [MaybeUninit::<u32>::uninit(); 4];
/// let mut v = Vector::from_buffer(&mut buf);
/// v.push(1).unwrap();
/// v.push(2).unwrap();
/// assert_eq!(v.find(&2), Some(1));
/// assert_eq!(v.pop(), 2);
/// ```
pub struct Vector<T, S: Storage<T> = ArenaStorage<T>> {
    storage: S,
    _marker: std::marker::PhantomData<T>,
}

impl<T> Vector<T, ArenaStorage<T>> {
    /// Arena-backed vector sized for 64 MiB worth of `T`
    pub fn new() -> MemoryResult<Self> {
        Ok(Self::from_storage(ArenaStorage::new()?))
    }

    /// Arena-backed vector holding at least `max_elements`
    pub fn with_capacity(max_elements: usize) -> MemoryResult<Self> {
        Ok(Self::from_storage(ArenaStorage::with_capacity(
            max_elements,
        )?))
    }
}

impl<'a, T> Vector<T, StaticStorage<'a, T>> {
    /// Vector over a caller-owned buffer; capacity is `buf.len()`
    pub fn from_buffer(buf: &'a mut [MaybeUninit<T>]) -> Self {
        Self::from_storage(StaticStorage::new(buf))
    }
}

impl<T, S: Storage<T>> Vector<T, S> {
    /// Wrap an empty storage
    ///
    /// # Panics
    ///
    /// If the storage already has materialized slots.
    pub fn from_storage(storage: S) -> Self {
        assert!(storage.is_empty(), "Vector storage must start empty");
        Self {
            storage,
            _marker: std::marker::PhantomData,
        }
    }

    /// The storage policy
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Maximum number of elements
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Whether the vector has no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether another push would fail
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Append `value`
    ///
    /// # Errors
    ///
    /// [`MemoryError::StorageFull`](crate::error::MemoryError::StorageFull)
    /// when the vector is at capacity; `value` is dropped.
    pub fn push(&mut self, value: T) -> MemoryResult<&mut T> {
        let slot = self.storage.grow()?;
        // SAFETY: grow returned an exclusive, aligned, uninitialised slot.
        unsafe {
            slot.as_ptr().write(value);
            Ok(&mut *slot.as_ptr())
        }
    }

    /// Append a default-constructed element
    pub fn push_new(&mut self) -> MemoryResult<&mut T>
    where
        T: Default,
    {
        self.push(T::default())
    }

    /// Remove and return the last element
    ///
    /// # Panics
    ///
    /// If the vector is empty.
    pub fn pop(&mut self) -> T {
        match self.try_pop() {
            Some(value) => value,
            None => panic!("pop on an empty Vector"),
        }
    }

    /// Remove and return the last element, `None` when empty
    pub fn try_pop(&mut self) -> Option<T> {
        let len = self.len();
        if len == 0 {
            return None;
        }
        // SAFETY: slot len - 1 holds a live value; shrink forgets it without
        // touching the bytes.
        let value = unsafe { ptr::read(self.storage.as_ptr().add(len - 1)) };
        self.storage.shrink();
        Some(value)
    }

    /// Last element (alias for `last`)
    #[inline]
    pub fn back(&self) -> Option<&T> {
        self.last()
    }

    /// First element (alias for `first`)
    #[inline]
    pub fn front(&self) -> Option<&T> {
        self.first()
    }

    /// Index of the first element equal to `value`
    pub fn find(&self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.iter().position(|elem| elem == value)
    }

    /// Remove the element at `index`, shifting later elements down
    ///
    /// # Panics
    ///
    /// If `index >= len`.
    pub fn remove(&mut self, index: usize) -> T {
        let len = self.len();
        assert!(
            index < len,
            "removal index (is {index}) should be < len (is {len})"
        );
        let base = self.storage.as_mut_ptr();
        // SAFETY: index < len so the read is of a live value; the copy moves
        // the tail [index + 1, len) down by one inside the live range, and
        // shrink then forgets the duplicated last slot.
        unsafe {
            let hole = base.add(index);
            let value = ptr::read(hole);
            ptr::copy(hole.add(1), hole, len - index - 1);
            self.storage.shrink();
            value
        }
    }

    /// Remove the first element equal to `value`
    ///
    /// # Panics
    ///
    /// If no element equals `value`.
    pub fn remove_item(&mut self, value: &T) -> T
    where
        T: PartialEq,
    {
        match self.find(value) {
            Some(index) => self.remove(index),
            None => panic!("remove_item: element not found"),
        }
    }

    /// Remove the first element equal to `value`, if any
    pub fn try_remove_item(&mut self, value: &T) -> Option<T>
    where
        T: PartialEq,
    {
        self.find(value).map(|index| self.remove(index))
    }

    /// Drop every element, keeping the storage
    pub fn clear(&mut self) {
        let len = self.len();
        let base = self.storage.as_mut_ptr();
        self.storage.clear();
        // SAFETY: [0, len) were live; the storage has forgotten them but the
        // memory is still mapped, so dropping in place is sound.
        unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(base, len)) };
    }

    /// Clone and append every element of `values`
    ///
    /// Stops at the first failure; elements pushed before it stay.
    pub fn extend_from_slice(&mut self, values: &[T]) -> MemoryResult<()>
    where
        T: Clone,
    {
        for value in values {
            self.push(value.clone())?;
        }
        Ok(())
    }

    /// The elements as a slice
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: [0, len) are live, contiguous and aligned.
        unsafe { std::slice::from_raw_parts(self.storage.as_ptr(), self.len()) }
    }

    /// The elements as a mutable slice
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let len = self.len();
        // SAFETY: as above, and &mut self gives exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.storage.as_mut_ptr(), len) }
    }
}

impl<T, S: Storage<T>> Deref for Vector<T, S> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, S: Storage<T>> DerefMut for Vector<T, S> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, S: Storage<T>> Drop for Vector<T, S> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<'v, T, S: Storage<T>> IntoIterator for &'v Vector<T, S> {
    type Item = &'v T;
    type IntoIter = std::slice::Iter<'v, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'v, T, S: Storage<T>> IntoIterator for &'v mut Vector<T, S> {
    type Item = &'v mut T;
    type IntoIter = std::slice::IterMut<'v, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T: fmt::Debug, S: Storage<T>> fmt::Debug for Vector<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq, S: Storage<T>> PartialEq<[T]> for Vector<T, S> {
    fn eq(&self, other: &[T]) -> bool {
        self.as_slice() == other
    }
}
