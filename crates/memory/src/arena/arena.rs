//! Virtual-memory-backed bump arena
//!
//! # Safety
//!
//! The arena reserves its whole address range up front and commits pages as
//! the cursor advances:
//! - The region is owned by a [`VirtualRegion`] and released exactly once
//! - Cursor state lives in `Cell`s so pushes only need `&self`
//! - Rewinds (`pop_to`, `pop`, `clear`) need `&mut self`, so no typed
//!   reference handed out by the arena can survive one
//!
//! ## Safety Contracts
//!
//! - Every pointer returned by [`Arena::push`] lies inside committed memory
//! - Raw pointers are not tracked: using one after a rewind or release that
//!   covered it is undefined behaviour
//! - Memory handed out is never reused while the cursor is past it

use std::cell::Cell;
use std::fmt;
use std::ptr::NonNull;

use arenakit_system::utils::checked_align_up;
use arenakit_system::{VirtualRegion, page_size};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

use super::config::ArenaConfig;
use super::stats::ArenaStats;
use crate::error::{MemoryError, MemoryResult};

/// Bytes reserved at the start of every arena for its header record
pub const ARENA_HEADER_SIZE: usize = 64;

const ARENA_MAGIC: u32 = u32::from_le_bytes(*b"ARNA");

/// Self-describing record written at offset 0 of the region
#[repr(C)]
#[derive(Clone, Copy)]
struct RegionHeader {
    magic: u32,
    name_len: u32,
    reserved: usize,
    commit_size: usize,
}

const _: () = assert!(size_of::<RegionHeader>() <= ARENA_HEADER_SIZE);

/// Single-threaded bump allocator over one virtual memory reservation
///
/// Memory is handed out in stack order and given back by rewinding the
/// cursor. The reservation never grows; physical pages are committed in
/// `commit_size` increments as the cursor advances and stay committed until
/// the arena is released.
///
/// # Examples
///
/// ```
/// use arenakit_memory::arena::{Arena, ArenaConfig};
///
/// let mut arena = Arena::new(ArenaConfig::small().with_name("scratch")).unwrap();
/// let start = arena.pos();
///
/// let values = arena.push_slice(&[1u32, 2, 3]).unwrap();
/// assert_eq!(values, &[1, 2, 3]);
///
/// arena.pop_to(start);
/// assert_eq!(arena.pos(), start);
/// assert_eq!(arena.name(), Some("scratch"));
/// ```
pub struct Arena {
    region: VirtualRegion,
    pos: Cell<usize>,
    committed: Cell<usize>,
    reserved: usize,
    commit_size: usize,
    base_pos: usize,
    name_len: usize,
    stats: Cell<ArenaStats>,
}

impl Arena {
    /// Reserve and initialise a new arena
    ///
    /// Sizes are rounded up to the page size. The first commit increment is
    /// committed immediately, then the header record and the name are written
    /// and the cursor is aligned to 8.
    pub fn new(config: ArenaConfig) -> MemoryResult<Self> {
        config.validate()?;

        let page = page_size();
        let reserved = checked_align_up(config.reserve_size, page)
            .ok_or_else(|| MemoryError::size_overflow("arena reserve size"))?;
        let commit_size = checked_align_up(config.commit_size, page)
            .ok_or_else(|| MemoryError::size_overflow("arena commit size"))?
            .min(reserved);

        let region = VirtualRegion::reserve(reserved)?;
        region.commit(0, commit_size)?;

        let name = config.name.as_deref().unwrap_or_default();
        let header = RegionHeader {
            magic: ARENA_MAGIC,
            name_len: name.len() as u32,
            reserved,
            commit_size,
        };
        // SAFETY: offset 0 is committed and page-aligned, and the header fits
        // in the first ARENA_HEADER_SIZE bytes.
        unsafe { region.as_ptr().cast::<RegionHeader>().write(header) };

        let mut arena = Self {
            region,
            pos: Cell::new(ARENA_HEADER_SIZE),
            committed: Cell::new(commit_size),
            reserved,
            commit_size,
            base_pos: ARENA_HEADER_SIZE,
            name_len: name.len(),
            stats: Cell::new(ArenaStats::default()),
        };

        if !name.is_empty() {
            let dst = arena.push(name.len(), 1)?;
            // SAFETY: dst covers name.len() freshly pushed bytes.
            unsafe {
                std::ptr::copy_nonoverlapping(name.as_ptr(), dst.as_ptr(), name.len());
            }
        }
        arena.push(0, 8)?;
        arena.base_pos = arena.pos.get();
        arena.stats.set(ArenaStats::default());

        #[cfg(feature = "logging")]
        debug!(
            name,
            reserved,
            committed = commit_size,
            "arena created"
        );

        Ok(arena)
    }

    /// Push `size` bytes aligned to `align`
    ///
    /// The bytes are not zeroed. Commits whole `commit_size` increments when
    /// the cursor crosses the committed range.
    ///
    /// # Errors
    ///
    /// - [`MemoryError::InvalidAlignment`] if `align` is not a power of two
    /// - [`MemoryError::SizeOverflow`] if the end position overflows
    /// - [`MemoryError::ArenaExhausted`] if the push would pass the
    ///   reservation; nothing is committed and the cursor does not move
    /// - [`MemoryError::System`] if the OS refuses to commit
    pub fn push(&self, size: usize, align: usize) -> MemoryResult<NonNull<u8>> {
        if !align.is_power_of_two() {
            return Err(MemoryError::invalid_alignment(align));
        }

        let pos = self.pos.get();
        let base = self.region.as_ptr() as usize;
        // Align the address, not the offset: `align` may exceed the page size.
        let start = base
            .checked_add(pos)
            .and_then(|addr| checked_align_up(addr, align))
            .map(|addr| addr - base)
            .ok_or_else(|| MemoryError::size_overflow("arena push"))?;
        let new_pos = start
            .checked_add(size)
            .ok_or_else(|| MemoryError::size_overflow("arena push"))?;

        if new_pos > self.reserved {
            self.update_stats(|s| s.failed_pushes += 1);
            return Err(MemoryError::arena_exhausted(
                self.display_name(),
                size,
                self.reserved - pos,
            ));
        }

        if new_pos > self.committed.get() {
            self.commit_to(new_pos)?;
        }

        self.pos.set(new_pos);
        self.update_stats(|s| s.record_push(new_pos));

        // SAFETY: start <= new_pos <= reserved, so the pointer stays inside
        // the region, and the region base is non-null.
        Ok(unsafe { self.region.as_non_null().add(start) })
    }

    /// Push `size` zeroed bytes aligned to `align`
    pub fn push_zeroed(&self, size: usize, align: usize) -> MemoryResult<NonNull<u8>> {
        let ptr = self.push(size, align)?;
        // SAFETY: the push just handed out `size` committed bytes at ptr.
        unsafe { std::ptr::write_bytes(ptr.as_ptr(), 0, size) };
        Ok(ptr)
    }

    fn commit_to(&self, new_pos: usize) -> MemoryResult<()> {
        let committed = self.committed.get();
        let target = new_pos
            .div_ceil(self.commit_size)
            .checked_mul(self.commit_size)
            .map_or(self.reserved, |t| t.min(self.reserved));

        self.region.commit(committed, target - committed)?;
        self.committed.set(target);
        self.update_stats(|s| s.commits += 1);

        #[cfg(feature = "logging")]
        trace!(
            arena = self.display_name(),
            from = committed,
            to = target,
            "arena commit grew"
        );

        Ok(())
    }

    /// Rewind the cursor to `pos`
    ///
    /// Positions inside the header and name are clamped to [`Arena::base_pos`].
    /// Committed memory stays committed.
    ///
    /// # Panics
    ///
    /// If `pos` is past the current position or the committed size.
    ///
    /// Typed references from the arena cannot be used across a rewind:
    ///
    /// ```compile_fail
    /// use arenakit_memory::arena::{Arena, ArenaConfig};
    ///
    /// let mut arena = Arena::new(ArenaConfig::small()).unwrap();
    /// let start = arena.pos();
    /// let values = arena.push_array::<u32>(4).unwrap();
    /// arena.pop_to(start);
    /// values[0] = 1;
    /// ```
    pub fn pop_to(&mut self, pos: usize) {
        let current = self.pos.get();
        assert!(
            pos <= current,
            "pop_to({pos}) is past the arena position {current}"
        );
        assert!(
            pos <= self.committed.get(),
            "pop_to({pos}) is past the committed size {}",
            self.committed.get()
        );
        self.pos.set(pos.max(self.base_pos));
    }

    /// Rewind the cursor by `size` bytes, stopping at the base position
    pub fn pop(&mut self, size: usize) {
        self.pop_to(self.pos.get().saturating_sub(size));
    }

    /// Rewind to the base position, keeping the header and name
    pub fn clear(&mut self) {
        self.pop_to(self.base_pos);
    }

    /// Release the whole reservation
    ///
    /// Dropping the arena releases it too; this variant reports failure.
    /// Containers carved from the arena must be gone first:
    ///
    /// ```compile_fail
    /// use arenakit_memory::arena::{Arena, ArenaConfig};
    ///
    /// let arena = Arena::new(ArenaConfig::small()).unwrap();
    /// let mut ids = arena.push_vector::<u32>(4).unwrap();
    /// ids.push(7).unwrap();
    /// arena.release().unwrap();
    /// assert_eq!(ids[0], 7);
    /// ```
    pub fn release(self) -> MemoryResult<()> {
        #[cfg(feature = "logging")]
        debug!(
            name = self.display_name(),
            reserved = self.reserved,
            committed = self.committed.get(),
            "arena released"
        );

        self.region.release()?;
        Ok(())
    }

    /// Current cursor position, as an offset from the region base
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos.get()
    }

    /// Lowest position a rewind can reach (header plus name, aligned to 8)
    #[inline]
    pub fn base_pos(&self) -> usize {
        self.base_pos
    }

    /// Size of the header area at the start of the region
    #[inline]
    pub fn header_size(&self) -> usize {
        ARENA_HEADER_SIZE
    }

    /// Bytes backed by physical memory
    #[inline]
    pub fn committed_size(&self) -> usize {
        self.committed.get()
    }

    /// Bytes of address space reserved
    #[inline]
    pub fn reserved_size(&self) -> usize {
        self.reserved
    }

    /// Commit increment, rounded to the page size
    #[inline]
    pub fn commit_size(&self) -> usize {
        self.commit_size
    }

    /// Bytes left before the reservation is exhausted
    #[inline]
    pub fn remaining(&self) -> usize {
        self.reserved - self.pos.get()
    }

    /// Name given at creation, read back from the arena's own memory
    pub fn name(&self) -> Option<&str> {
        if self.name_len == 0 {
            return None;
        }
        // SAFETY: the name bytes were copied from a &str right after the
        // header, are committed, and nothing can rewind below base_pos.
        let bytes = unsafe {
            std::slice::from_raw_parts(self.region.as_ptr().add(ARENA_HEADER_SIZE), self.name_len)
        };
        std::str::from_utf8(bytes).ok()
    }

    fn display_name(&self) -> &str {
        self.name().unwrap_or("<unnamed>")
    }

    /// Base address of the region
    #[inline]
    pub fn base_ptr(&self) -> NonNull<u8> {
        self.region.as_non_null()
    }

    /// Whether `ptr` points into memory currently handed out by this arena
    pub fn contains<T: ?Sized>(&self, ptr: *const T) -> bool {
        let base = self.region.as_ptr() as usize;
        let addr = ptr.cast::<u8>() as usize;
        addr >= base + self.base_pos && addr < base + self.pos.get()
    }

    /// Snapshot of the arena's counters
    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            committed_bytes: self.committed.get(),
            reserved_bytes: self.reserved,
            position: self.pos.get(),
            ..self.stats.get()
        }
    }

    /// Whether the header record at offset 0 still describes this arena
    pub fn header_intact(&self) -> bool {
        // SAFETY: offset 0 is committed for the arena's lifetime and no push
        // can hand out bytes below ARENA_HEADER_SIZE.
        let header = unsafe { self.region.as_ptr().cast::<RegionHeader>().read() };
        header.magic == ARENA_MAGIC
            && header.name_len as usize == self.name_len
            && header.reserved == self.reserved
            && header.commit_size == self.commit_size
    }

    fn update_stats(&self, f: impl FnOnce(&mut ArenaStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("name", &self.name())
            .field("pos", &self.pos.get())
            .field("base_pos", &self.base_pos)
            .field("committed", &self.committed.get())
            .field("reserved", &self.reserved)
            .field("commit_size", &self.commit_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arenakit_system::utils::align_up;
    use arenakit_system::{KB, MB};

    fn small_arena() -> Arena {
        Arena::new(ArenaConfig::small()).unwrap()
    }

    #[test]
    fn test_new_arena_layout() {
        let arena = small_arena();
        assert_eq!(arena.header_size(), ARENA_HEADER_SIZE);
        assert_eq!(arena.base_pos(), ARENA_HEADER_SIZE);
        assert_eq!(arena.pos(), arena.base_pos());
        assert_eq!(arena.reserved_size(), MB);
        assert_eq!(arena.commit_size(), align_up(64 * KB, page_size()));
        assert_eq!(arena.committed_size(), arena.commit_size());
        assert_eq!(arena.name(), None);
        assert!(arena.header_intact());
    }

    #[test]
    fn test_name_is_stored_inline() {
        let arena = Arena::new(ArenaConfig::small().with_name("Test")).unwrap();
        assert_eq!(arena.name(), Some("Test"));
        assert_eq!(arena.base_pos(), align_up(ARENA_HEADER_SIZE + 4, 8));

        let name_ptr = unsafe { arena.base_ptr().as_ptr().add(ARENA_HEADER_SIZE) };
        let bytes = unsafe { std::slice::from_raw_parts(name_ptr, 4) };
        assert_eq!(bytes, b"Test");
    }

    #[test]
    fn test_push_alignment() {
        let arena = small_arena();
        arena.push(1, 1).unwrap();
        for align in [1, 2, 4, 8, 16, 64, 4096] {
            let ptr = arena.push(3, align).unwrap();
            assert_eq!(ptr.as_ptr() as usize % align, 0);
        }
    }

    #[test]
    fn test_push_advances_cursor() {
        let arena = small_arena();
        let start = arena.pos();
        arena.push(10, 1).unwrap();
        assert_eq!(arena.pos(), start + 10);
        arena.push(0, 8).unwrap();
        assert_eq!(arena.pos(), align_up(start + 10, 8));
    }

    #[test]
    fn test_invalid_alignment() {
        let arena = small_arena();
        let err = arena.push(8, 3).unwrap_err();
        assert!(matches!(err, MemoryError::InvalidAlignment { alignment: 3 }));
        let err = arena.push(8, 0).unwrap_err();
        assert!(matches!(err, MemoryError::InvalidAlignment { alignment: 0 }));
    }

    #[test]
    fn test_size_overflow() {
        let arena = small_arena();
        let err = arena.push(usize::MAX, 1).unwrap_err();
        assert!(matches!(err, MemoryError::SizeOverflow { .. }));
    }

    #[test]
    fn test_exhaustion_leaves_state_untouched() {
        let arena = small_arena();
        let pos = arena.pos();
        let committed = arena.committed_size();

        let err = arena.push(2 * MB, 8).unwrap_err();
        assert!(err.is_exhaustion());
        assert_eq!(arena.pos(), pos);
        assert_eq!(arena.committed_size(), committed);
        assert_eq!(arena.stats().failed_pushes, 1);
    }

    #[test]
    fn test_commit_grows_in_increments() {
        let arena = small_arena();
        let step = arena.commit_size();

        arena.push(step, 1).unwrap();
        assert_eq!(arena.committed_size(), 2 * step);
        assert_eq!(arena.committed_size() % step, 0);

        arena.push(3 * step, 1).unwrap();
        assert_eq!(arena.committed_size(), 5 * step);
        assert!(arena.committed_size() >= arena.pos());
    }

    #[test]
    fn test_commit_clamps_to_reserved() {
        let config = ArenaConfig::new()
            .with_reserve_size(3 * page_size())
            .with_commit_size(2 * page_size());
        let arena = Arena::new(config).unwrap();
        arena.push(2 * page_size(), 1).unwrap();
        assert_eq!(arena.committed_size(), 3 * page_size());
        assert_eq!(arena.committed_size(), arena.reserved_size());
    }

    #[test]
    fn test_committed_memory_is_writable() {
        let arena = small_arena();
        let size = 200 * KB;
        let ptr = arena.push(size, 16).unwrap();
        let bytes = unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), size) };
        bytes.fill(0x7F);
        assert!(bytes.iter().all(|&b| b == 0x7F));
    }

    #[test]
    fn test_push_zeroed_after_reuse() {
        let mut arena = small_arena();
        let start = arena.pos();
        let ptr = arena.push(64, 8).unwrap();
        unsafe { std::ptr::write_bytes(ptr.as_ptr(), 0xFF, 64) };
        arena.pop_to(start);

        let ptr = arena.push_zeroed(64, 8).unwrap();
        let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), 64) };
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_pop_clamps_to_base() {
        let mut arena = Arena::new(ArenaConfig::small().with_name("clamp")).unwrap();
        arena.push(100, 1).unwrap();
        arena.pop(10_000);
        assert_eq!(arena.pos(), arena.base_pos());

        arena.pop_to(0);
        assert_eq!(arena.pos(), arena.base_pos());
        assert_eq!(arena.name(), Some("clamp"));
    }

    #[test]
    fn test_pop_exact() {
        let mut arena = small_arena();
        let start = arena.pos();
        arena.push(24, 8).unwrap();
        arena.push(8, 8).unwrap();
        arena.pop(8);
        assert_eq!(arena.pos(), start + 24);
    }

    #[test]
    #[should_panic(expected = "past the arena position")]
    fn test_pop_to_past_position_panics() {
        let mut arena = small_arena();
        let pos = arena.pos();
        arena.pop_to(pos + 1);
    }

    #[test]
    fn test_clear_keeps_commit() {
        let mut arena = small_arena();
        arena.push(300 * KB, 8).unwrap();
        let committed = arena.committed_size();
        arena.clear();
        assert_eq!(arena.pos(), arena.base_pos());
        assert_eq!(arena.committed_size(), committed);
    }

    #[test]
    fn test_contains() {
        let arena = small_arena();
        let a = arena.push(16, 8).unwrap();
        assert!(arena.contains(a.as_ptr().cast_const()));
        assert!(!arena.contains(arena.base_ptr().as_ptr().cast_const()));
        let outside = 0u8;
        assert!(!arena.contains(std::ptr::from_ref(&outside)));
    }

    #[test]
    fn test_stats_snapshot() {
        let arena = small_arena();
        arena.push(10, 1).unwrap();
        arena.push(2 * MB, 1).unwrap_err();
        let stats = arena.stats();
        assert_eq!(stats.pushes, 1);
        assert_eq!(stats.failed_pushes, 1);
        assert_eq!(stats.position, arena.pos());
        assert_eq!(stats.high_water, arena.pos());
        assert_eq!(stats.reserved_bytes, MB);
    }

    #[test]
    fn test_release() {
        let arena = small_arena();
        arena.push(128, 8).unwrap();
        arena.release().unwrap();
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let err = Arena::new(ArenaConfig::new().with_commit_size(0)).unwrap_err();
        assert_eq!(err.code(), "MEM:CONFIG:INVALID");
    }

    #[test]
    fn test_arena_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Arena>();
    }

    #[test]
    fn test_debug_output() {
        let arena = Arena::new(ArenaConfig::small().with_name("dbg")).unwrap();
        let text = format!("{arena:?}");
        assert!(text.contains("dbg"));
        assert!(text.contains("reserved"));
    }
}
