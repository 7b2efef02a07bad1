//! Storage policies behind [`Vector`](crate::vector::Vector) and
//! [`Queue`](crate::queue::Queue)
//!
//! A policy owns (or borrows) a contiguous run of slots and can extend or
//! shrink it one slot at a time. Slots `[0, len)` are "materialized": the
//! containers above decide which of them hold live values.
//!
//! # Safety
//!
//! Implementations must keep slots contiguous and must never move them while
//! the storage is alive. Containers hand out references into the slots on
//! that basis.

use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::ptr::NonNull;

use crate::arena::{Arena, ArenaConfig};
use crate::error::{MemoryError, MemoryResult};

/// Default maximum footprint of an arena-backed container
pub const DEFAULT_STORAGE_BYTES: usize = 64 * 1024 * 1024;

/// Elements committed at a time by arena-backed storage
pub const DEFAULT_GROWTH: usize = 16;

/// Name given to arenas created by [`ArenaStorage`]
pub const STORAGE_ARENA_NAME: &str = "VectorArena";

/// Slot provider for contiguous containers
///
/// # Safety
///
/// - [`Storage::as_ptr`] must point to `capacity()` contiguous, correctly
///   aligned slots of `T`, of which `[0, len())` are addressable
/// - slots never move while the storage exists
/// - `len() <= committed() <= capacity()`
pub unsafe trait Storage<T> {
    /// Pointer to slot 0
    fn as_ptr(&self) -> *const T;

    /// Mutable pointer to slot 0
    fn as_mut_ptr(&mut self) -> *mut T;

    /// Number of materialized slots
    fn len(&self) -> usize;

    /// Maximum number of slots
    fn capacity(&self) -> usize;

    /// Slots currently backed by committed memory
    fn committed(&self) -> usize;

    /// Materialize slot `len()` and return a pointer to it (uninitialised)
    ///
    /// # Errors
    ///
    /// [`MemoryError::StorageFull`] when `len() == capacity()`.
    fn grow(&mut self) -> MemoryResult<NonNull<T>>;

    /// Forget the last slot; its value must already be moved out or dropped
    fn shrink(&mut self);

    /// Forget every slot; values must already be moved out or dropped
    fn clear(&mut self);

    /// Whether no slot is materialized
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Static storage
// ============================================================================

/// Fixed-capacity storage over a caller-supplied buffer
///
/// The buffer borrow guarantees it outlives the container.
#[derive(Debug)]
pub struct StaticStorage<'a, T> {
    buf: &'a mut [MaybeUninit<T>],
    len: usize,
}

impl<'a, T> StaticStorage<'a, T> {
    /// Wrap `buf`; capacity is `buf.len()`
    pub fn new(buf: &'a mut [MaybeUninit<T>]) -> Self {
        Self { buf, len: 0 }
    }
}

// SAFETY: the slots are the borrowed buffer, which cannot move or be freed
// while the borrow lives; len never exceeds buf.len().
unsafe impl<T> Storage<T> for StaticStorage<'_, T> {
    #[inline]
    fn as_ptr(&self) -> *const T {
        self.buf.as_ptr().cast()
    }

    #[inline]
    fn as_mut_ptr(&mut self) -> *mut T {
        self.buf.as_mut_ptr().cast()
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    fn committed(&self) -> usize {
        self.buf.len()
    }

    fn grow(&mut self) -> MemoryResult<NonNull<T>> {
        let capacity = self.buf.len();
        let slot = self
            .buf
            .get_mut(self.len)
            .ok_or_else(|| MemoryError::storage_full(capacity))?;
        self.len += 1;
        Ok(NonNull::from(slot).cast())
    }

    fn shrink(&mut self) {
        debug_assert!(self.len > 0, "shrink on empty storage");
        self.len = self.len.saturating_sub(1);
    }

    fn clear(&mut self) {
        self.len = 0;
    }
}

// ============================================================================
// Arena storage
// ============================================================================

/// Storage that grows in place inside a private [`Arena`]
///
/// Each new slot is one more push into the arena, so elements never move and
/// nothing is ever copied. Capacity is fixed by the arena's reservation.
///
/// The arena itself is private: another push into it would land between two
/// slots. Only read-only views of it are exposed.
///
/// ```compile_fail
/// use arenakit_memory::vector::Vector;
///
/// let v = Vector::<u64>::with_capacity(8).unwrap();
/// v.storage().arena().push_value(0xDEADu64).unwrap();
/// ```
pub struct ArenaStorage<T> {
    arena: Arena,
    data_start: usize,
    len: usize,
    capacity: usize,
    _marker: PhantomData<T>,
}

impl<T> ArenaStorage<T> {
    /// Storage for up to 64 MiB worth of `T`
    pub fn new() -> MemoryResult<Self> {
        Self::with_capacity(DEFAULT_STORAGE_BYTES / size_of::<T>().max(1))
    }

    /// Storage for at least `max_elements` elements
    pub fn with_capacity(max_elements: usize) -> MemoryResult<Self> {
        let config =
            ArenaConfig::for_elements::<T>(max_elements, DEFAULT_GROWTH).with_name(STORAGE_ARENA_NAME);
        Self::from_arena(Arena::new(config)?)
    }

    /// Adopt a caller-configured arena; slots start at its current position
    pub fn from_arena(arena: Arena) -> MemoryResult<Self> {
        let align = align_of::<T>().max(8);
        let start = arena.push(0, align)?;
        let data_start = start.as_ptr() as usize - arena.base_ptr().as_ptr() as usize;
        let capacity = match size_of::<T>() {
            0 => usize::MAX,
            size => (arena.reserved_size() - data_start) / size,
        };
        Ok(Self {
            arena,
            data_start,
            len: 0,
            capacity,
            _marker: PhantomData,
        })
    }

    /// Cursor position of the backing arena
    #[inline]
    pub fn pos(&self) -> usize {
        self.arena.pos()
    }

    /// Bytes of the backing arena currently committed
    #[inline]
    pub fn committed_size(&self) -> usize {
        self.arena.committed_size()
    }

    /// Name of the backing arena
    pub fn name(&self) -> Option<&str> {
        self.arena.name()
    }

    /// Offset of slot 0 from the arena base
    pub fn data_start(&self) -> usize {
        self.data_start
    }
}

// SAFETY: slots are consecutive pushes of size_of::<T>() bytes starting at
// an offset aligned for T; the arena reservation never moves and the cursor
// only rewinds through shrink/clear.
unsafe impl<T> Storage<T> for ArenaStorage<T> {
    #[inline]
    fn as_ptr(&self) -> *const T {
        // SAFETY: data_start lies inside the reservation.
        unsafe { self.arena.base_ptr().as_ptr().add(self.data_start).cast() }
    }

    #[inline]
    fn as_mut_ptr(&mut self) -> *mut T {
        self.as_ptr().cast_mut()
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn committed(&self) -> usize {
        match size_of::<T>() {
            0 => self.capacity,
            size => {
                let bytes = self.arena.committed_size().saturating_sub(self.data_start);
                (bytes / size).min(self.capacity)
            }
        }
    }

    fn grow(&mut self) -> MemoryResult<NonNull<T>> {
        if self.len == self.capacity {
            return Err(MemoryError::storage_full(self.capacity));
        }
        // Slot alignment is preserved by data_start and the element stride.
        let slot = self.arena.push(size_of::<T>(), 1)?;
        self.len += 1;
        Ok(slot.cast())
    }

    fn shrink(&mut self) {
        debug_assert!(self.len > 0, "shrink on empty storage");
        if self.len > 0 {
            self.arena.pop(size_of::<T>());
            self.len -= 1;
        }
    }

    fn clear(&mut self) {
        self.arena.pop_to(self.data_start);
        self.len = 0;
    }
}

impl<T> std::fmt::Debug for ArenaStorage<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArenaStorage")
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .field("data_start", &self.data_start)
            .field("arena", &self.arena)
            .finish()
    }
}
