//! Fixed-capacity ring buffer over a [`Storage`] policy

use std::fmt;
use std::iter::FusedIterator;
use std::mem::MaybeUninit;
use std::ops::{Index, IndexMut};
use std::ptr;

use crate::error::{MemoryError, MemoryResult};
use crate::storage::{ArenaStorage, StaticStorage, Storage};

/// Queue over a caller-owned buffer
pub type StaticQueue<'a, T> = Queue<T, StaticStorage<'a, T>>;

/// FIFO ring buffer
///
/// Pushes go to `(head + len) % capacity`, pops come from `head`. Storage
/// slots are materialized lazily the first time the write index reaches
/// them, so an arena-backed queue only commits what it has used.
///
/// # Examples
///
/// ```
/// use std::mem::MaybeUninit;
/// use arenakit_memory::queue::Queue;
///
/// let mut buf = [MaybeUninit::<u8>::uninit(); 2];
/// let mut q = Queue::from_buffer(&mut buf);
/// q.push(1).unwrap();
/// q.push(2).unwrap();
/// assert!(q.push(3).is_err());
/// assert_eq!(q.pop(), 1);
/// q.push(3).unwrap();
/// assert_eq!(q.iter().copied().collect::<Vec<_>>(), [2, 3]);
/// ```
pub struct Queue<T, S: Storage<T> = ArenaStorage<T>> {
    storage: S,
    head: usize,
    len: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T> Queue<T, ArenaStorage<T>> {
    /// Arena-backed queue holding at least `capacity` elements
    pub fn with_capacity(capacity: usize) -> MemoryResult<Self> {
        Ok(Self::from_storage(ArenaStorage::with_capacity(capacity)?))
    }
}

impl<'a, T> Queue<T, StaticStorage<'a, T>> {
    /// Queue over a caller-owned buffer; capacity is `buf.len()`
    pub fn from_buffer(buf: &'a mut [MaybeUninit<T>]) -> Self {
        Self::from_storage(StaticStorage::new(buf))
    }
}

impl<T, S: Storage<T>> Queue<T, S> {
    /// Wrap an empty storage
    ///
    /// # Panics
    ///
    /// If the storage already has materialized slots.
    pub fn from_storage(storage: S) -> Self {
        assert!(storage.is_empty(), "Queue storage must start empty");
        Self {
            storage,
            head: 0,
            len: 0,
            _marker: std::marker::PhantomData,
        }
    }

    /// Number of queued elements
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Maximum number of queued elements
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Whether the queue is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether another push would fail
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Slots currently backed by committed memory
    #[inline]
    pub fn size_committed(&self) -> usize {
        self.storage.committed()
    }

    #[inline]
    fn slot(&self, logical: usize) -> usize {
        (self.head + logical) % self.capacity()
    }

    /// Enqueue `value` at the back
    ///
    /// # Errors
    ///
    /// [`MemoryError::StorageFull`] when `len == capacity`; `value` is dropped.
    pub fn push(&mut self, value: T) -> MemoryResult<()> {
        let capacity = self.capacity();
        if self.len == capacity {
            return Err(MemoryError::storage_full(capacity));
        }

        let index = self.slot(self.len);
        let slot = if index == self.storage.len() {
            self.storage.grow()?.as_ptr()
        } else {
            // SAFETY: index < storage.len(), and the slot is outside the live
            // range, so it holds no value.
            unsafe { self.storage.as_mut_ptr().add(index) }
        };
        // SAFETY: slot is materialized, aligned and vacant.
        unsafe { slot.write(value) };
        self.len += 1;
        Ok(())
    }

    /// Dequeue from the front
    ///
    /// # Panics
    ///
    /// If the queue is empty.
    pub fn pop(&mut self) -> T {
        match self.try_pop() {
            Some(value) => value,
            None => panic!("pop on an empty Queue"),
        }
    }

    /// Dequeue from the front, `None` when empty
    pub fn try_pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        // SAFETY: head is inside the live range.
        let value = unsafe { ptr::read(self.storage.as_ptr().add(self.head)) };
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        Some(value)
    }

    /// Element `index` positions behind the front
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        // SAFETY: logical index < len maps to a live slot.
        Some(unsafe { &*self.storage.as_ptr().add(self.slot(index)) })
    }

    /// Mutable element `index` positions behind the front
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.len {
            return None;
        }
        let slot = self.slot(index);
        // SAFETY: as in get, with exclusive access through &mut self.
        Some(unsafe { &mut *self.storage.as_mut_ptr().add(slot) })
    }

    /// Oldest element
    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    /// Newest element
    pub fn back(&self) -> Option<&T> {
        self.len.checked_sub(1).and_then(|last| self.get(last))
    }

    /// Iterate from front to back
    pub fn iter(&self) -> Iter<'_, T, S> {
        Iter {
            queue: self,
            front: 0,
            back: self.len,
        }
    }

    /// Drop every queued element and rewind the storage
    pub fn clear(&mut self) {
        while let Some(value) = self.try_pop() {
            drop(value);
        }
        self.head = 0;
        self.storage.clear();
    }
}

impl<T, S: Storage<T>> Index<usize> for Queue<T, S> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        let len = self.len;
        match self.get(index) {
            Some(value) => value,
            None => panic!("queue index {index} out of range for length {len}"),
        }
    }
}

impl<T, S: Storage<T>> IndexMut<usize> for Queue<T, S> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        let len = self.len;
        match self.get_mut(index) {
            Some(value) => value,
            None => panic!("queue index {index} out of range for length {len}"),
        }
    }
}

impl<T, S: Storage<T>> Drop for Queue<T, S> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: fmt::Debug, S: Storage<T>> fmt::Debug for Queue<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Front-to-back iterator over a [`Queue`]
pub struct Iter<'q, T, S: Storage<T>> {
    queue: &'q Queue<T, S>,
    front: usize,
    back: usize,
}

impl<'q, T, S: Storage<T>> Iterator for Iter<'q, T, S> {
    type Item = &'q T;

    fn next(&mut self) -> Option<&'q T> {
        if self.front == self.back {
            return None;
        }
        let item = self.queue.get(self.front);
        self.front += 1;
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<T, S: Storage<T>> DoubleEndedIterator for Iter<'_, T, S> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        self.queue.get(self.back)
    }
}

impl<T, S: Storage<T>> ExactSizeIterator for Iter<'_, T, S> {}

impl<T, S: Storage<T>> FusedIterator for Iter<'_, T, S> {}

impl<'q, T, S: Storage<T>> IntoIterator for &'q Queue<T, S> {
    type Item = &'q T;
    type IntoIter = Iter<'q, T, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
