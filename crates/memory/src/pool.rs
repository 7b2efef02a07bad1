//! Handle-based element pool with an intrusive free list
//!
//! Elements live in a [`Vector`] of [`Slot`]s. Destroyed slots become
//! [`Slot::Dead`] entries that link to the next free slot, and creation
//! reuses the most recently freed slot first. Handles are plain slot indices:
//! a handle to a slot that has been destroyed and reused refers to the new
//! occupant.

use std::fmt;
use std::ops::{Index, IndexMut};

#[cfg(feature = "logging")]
use tracing::warn;

use crate::arena::Arena;
use crate::error::{MemoryError, MemoryResult};
use crate::storage::{ArenaStorage, StaticStorage, Storage};
use crate::vector::Vector;

/// Pool over a caller-owned buffer
pub type StaticPool<'a, T> = ElementPool<T, StaticStorage<'a, Slot<T>>>;

/// Index of a slot in an [`ElementPool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u32);

impl Handle {
    /// Sentinel that never refers to a slot
    pub const INVALID: Self = Self(u32::MAX);

    /// Handle for slot `index`
    #[inline]
    pub const fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Raw slot index
    #[inline]
    pub const fn into_raw(self) -> u32 {
        self.0
    }

    /// Slot index as `usize`
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Whether this is not [`Handle::INVALID`]
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "#{}", self.0)
        } else {
            f.write_str("#invalid")
        }
    }
}

/// Pool slot: a live element or a link in the free list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot<T> {
    /// Slot holds an element
    Live(T),
    /// Slot is free; `next_free` is the next free slot or [`Handle::INVALID`]
    Dead {
        /// Next slot in the free list
        next_free: Handle,
    },
}

impl<T> Slot<T> {
    /// The element, if the slot is live
    pub fn as_live(&self) -> Option<&T> {
        match self {
            Self::Live(value) => Some(value),
            Self::Dead { .. } => None,
        }
    }

    fn as_live_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Live(value) => Some(value),
            Self::Dead { .. } => None,
        }
    }
}

/// Pool of `T` addressed by [`Handle`]
///
/// # Examples
///
/// ```
/// use arenakit_memory::pool::ElementPool;
///
/// let mut pool = ElementPool::<String>::with_capacity(16).unwrap();
/// let a = pool.create_with("alpha".to_string()).unwrap();
/// let b = pool.create().unwrap();
/// pool[b].push_str("beta");
///
/// assert!(pool.destroy(a));
/// assert!(!pool.destroy(a));
/// assert_eq!(pool.count(), 1);
///
/// // The freed slot is reused first
/// assert_eq!(pool.create().unwrap(), a);
/// ```
pub struct ElementPool<T, S: Storage<Slot<T>> = ArenaStorage<Slot<T>>> {
    slots: Vector<Slot<T>, S>,
    next_free: Handle,
    count: usize,
}

impl<T> ElementPool<T, ArenaStorage<Slot<T>>> {
    /// Arena-backed pool sized for 64 MiB of slots
    pub fn new() -> MemoryResult<Self> {
        Ok(Self::from_storage(ArenaStorage::new()?))
    }

    /// Arena-backed pool holding at least `capacity` elements
    pub fn with_capacity(capacity: usize) -> MemoryResult<Self> {
        Ok(Self::from_storage(ArenaStorage::with_capacity(capacity)?))
    }

    /// Pool whose slots live in a caller-configured arena
    pub fn with_arena(arena: Arena) -> MemoryResult<Self> {
        Ok(Self::from_storage(ArenaStorage::from_arena(arena)?))
    }
}

impl<T, S: Storage<Slot<T>>> ElementPool<T, S> {
    /// Pool over an empty storage
    pub fn from_storage(storage: S) -> Self {
        Self {
            slots: Vector::from_storage(storage),
            next_free: Handle::INVALID,
            count: 0,
        }
    }

    /// Create a default-constructed element
    pub fn create(&mut self) -> MemoryResult<Handle>
    where
        T: Default,
    {
        self.create_with(T::default())
    }

    /// Store `value`, reusing the most recently freed slot if there is one
    ///
    /// # Errors
    ///
    /// [`MemoryError::PoolExhausted`] when no slot is free and the storage
    /// (or the handle space) is full.
    pub fn create_with(&mut self, value: T) -> MemoryResult<Handle> {
        let handle = if self.next_free.is_valid() {
            let handle = self.next_free;
            let slot = &mut self.slots[handle.index()];
            self.next_free = match *slot {
                Slot::Dead { next_free } => next_free,
                Slot::Live(_) => unreachable!("free list points at live slot {handle}"),
            };
            *slot = Slot::Live(value);
            handle
        } else {
            let index = self.slots.len();
            if self.slots.is_full() || index >= Handle::INVALID.index() {
                return Err(MemoryError::pool_exhausted(self.capacity()));
            }
            self.slots.push(Slot::Live(value))?;
            Handle(index as u32)
        };

        self.count += 1;
        Ok(handle)
    }

    /// Remove the element behind `handle` and return it
    ///
    /// # Errors
    ///
    /// - [`MemoryError::InvalidHandle`] if `handle` is past the last slot
    /// - [`MemoryError::DoubleFree`] if the slot is already free
    pub fn take(&mut self, handle: Handle) -> MemoryResult<T> {
        let slots = self.slots.len();
        let slot = self
            .slots
            .get_mut(handle.index())
            .ok_or_else(|| MemoryError::invalid_handle(handle.0, slots))?;
        if slot.as_live().is_none() {
            return Err(MemoryError::double_free(handle.0));
        }

        let old = std::mem::replace(
            slot,
            Slot::Dead {
                next_free: self.next_free,
            },
        );
        self.next_free = handle;
        self.count -= 1;

        match old {
            Slot::Live(value) => Ok(value),
            Slot::Dead { .. } => unreachable!("slot {handle} checked live above"),
        }
    }

    /// Destroy the element behind `handle`
    ///
    /// Returns `false`, leaving the pool untouched, if the handle is out of
    /// range or the slot is already free.
    pub fn destroy(&mut self, handle: Handle) -> bool {
        match self.take(handle) {
            Ok(value) => {
                drop(value);
                true
            }
            Err(_err) => {
                #[cfg(feature = "logging")]
                warn!(%handle, code = _err.code(), "element pool destroy rejected");
                false
            }
        }
    }

    /// Element behind `handle`, `None` if out of range or free
    pub fn try_get(&self, handle: Handle) -> Option<&T> {
        self.slots.get(handle.index()).and_then(Slot::as_live)
    }

    /// Mutable element behind `handle`, `None` if out of range or free
    pub fn try_get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots.get_mut(handle.index()).and_then(Slot::as_live_mut)
    }

    /// Element behind `handle`
    ///
    /// # Panics
    ///
    /// If the handle is out of range or the slot is free.
    pub fn get(&self, handle: Handle) -> &T {
        match self.try_get(handle) {
            Some(value) => value,
            None => panic!("element pool handle {handle} is not live"),
        }
    }

    /// Mutable element behind `handle`
    ///
    /// # Panics
    ///
    /// If the handle is out of range or the slot is free.
    pub fn get_mut(&mut self, handle: Handle) -> &mut T {
        match self.try_get_mut(handle) {
            Some(value) => value,
            None => panic!("element pool handle {handle} is not live"),
        }
    }

    /// Whether `handle` refers to a live element
    pub fn contains(&self, handle: Handle) -> bool {
        self.try_get(handle).is_some()
    }

    /// Visit every live element in slot order
    pub fn for_each(&mut self, mut visitor: impl FnMut(Handle, &mut T)) {
        for (handle, value) in self.iter_mut() {
            visitor(handle, value);
        }
    }

    /// Live elements in slot order
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_live().map(|v| (Handle(i as u32), v)))
    }

    /// Mutable live elements in slot order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_live_mut().map(|v| (Handle(i as u32), v)))
    }

    /// Number of live elements
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Number of slots ever materialized (live and free)
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Maximum number of live elements
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.capacity().min(Handle::INVALID.index())
    }

    /// Whether no element is live
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Drop every element and forget every slot
    pub fn clear(&mut self) {
        self.slots.clear();
        self.next_free = Handle::INVALID;
        self.count = 0;
    }
}

impl<T, S: Storage<Slot<T>>> Index<Handle> for ElementPool<T, S> {
    type Output = T;

    fn index(&self, handle: Handle) -> &T {
        self.get(handle)
    }
}

impl<T, S: Storage<Slot<T>>> IndexMut<Handle> for ElementPool<T, S> {
    fn index_mut(&mut self, handle: Handle) -> &mut T {
        self.get_mut(handle)
    }
}

impl<T: fmt::Debug, S: Storage<Slot<T>>> fmt::Debug for ElementPool<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementPool")
            .field("count", &self.count)
            .field("slots", &self.slots.len())
            .field("next_free", &self.next_free)
            .finish()
    }
}
