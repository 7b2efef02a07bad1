//! Position markers and RAII rewinds
//!
//! A marker records the cursor so a batch of pushes can be undone at once.
//! [`ArenaScope`] does the same automatically when it goes out of scope.

use std::ops::{Deref, DerefMut};

use super::Arena;

/// Position marker for arena state
///
/// Markers must only be used with the arena they were created from; popping
/// with a foreign marker panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaMarker {
    pos: usize,
    arena: usize,
}

impl ArenaMarker {
    /// Cursor position the marker restores
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }
}

impl Arena {
    /// Record the current position
    pub fn marker(&self) -> ArenaMarker {
        ArenaMarker {
            pos: self.pos(),
            arena: self.base_ptr().as_ptr() as usize,
        }
    }

    /// Rewind to a marker taken from this arena
    ///
    /// # Panics
    ///
    /// If the marker belongs to another arena, or lies past the current
    /// position.
    pub fn pop_to_marker(&mut self, marker: ArenaMarker) {
        assert_eq!(
            marker.arena,
            self.base_ptr().as_ptr() as usize,
            "marker is from a different arena"
        );
        self.pop_to(marker.pos);
    }

    /// Open a scope that rewinds to the current position when dropped
    ///
    /// # Examples
    ///
    /// ```
    /// use arenakit_memory::arena::{Arena, ArenaConfig};
    ///
    /// let mut arena = Arena::new(ArenaConfig::small()).unwrap();
    /// let before = arena.pos();
    /// {
    ///     let scope = arena.scope();
    ///     let temp = scope.push_value(7u64).unwrap();
    ///     assert_eq!(*temp, 7);
    /// }
    /// assert_eq!(arena.pos(), before);
    /// ```
    pub fn scope(&mut self) -> ArenaScope<'_> {
        let entry = self.pos();
        ArenaScope { arena: self, entry }
    }
}

/// RAII guard for scoped allocations within an arena
///
/// Derefs to the arena. On drop, rewinds to the position the scope was
/// opened at unless the cursor is already at or below it.
#[must_use = "ArenaScope does nothing unless held"]
#[derive(Debug)]
pub struct ArenaScope<'a> {
    arena: &'a mut Arena,
    entry: usize,
}

impl ArenaScope<'_> {
    /// Position the scope will rewind to
    #[inline]
    pub fn entry_pos(&self) -> usize {
        self.entry
    }

    /// Keep everything pushed inside the scope
    pub fn keep(mut self) {
        self.entry = usize::MAX;
    }
}

impl Deref for ArenaScope<'_> {
    type Target = Arena;

    fn deref(&self) -> &Arena {
        self.arena
    }
}

impl DerefMut for ArenaScope<'_> {
    fn deref_mut(&mut self) -> &mut Arena {
        self.arena
    }
}

impl Drop for ArenaScope<'_> {
    fn drop(&mut self) {
        if self.arena.pos() > self.entry {
            self.arena.pop_to(self.entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::ArenaConfig;
    use super::*;

    #[test]
    fn test_marker_round_trip() {
        let mut arena = Arena::new(ArenaConfig::small()).unwrap();
        arena.push(8, 8).unwrap();
        let marker = arena.marker();
        arena.push(100, 8).unwrap();
        arena.push(1000, 16).unwrap();

        arena.pop_to_marker(marker);
        assert_eq!(arena.pos(), marker.pos());
    }

    #[test]
    #[should_panic(expected = "different arena")]
    fn test_foreign_marker_panics() {
        let a = Arena::new(ArenaConfig::small()).unwrap();
        let mut b = Arena::new(ArenaConfig::small()).unwrap();
        let marker = a.marker();
        b.pop_to_marker(marker);
    }

    #[test]
    fn test_scope_rewinds() {
        let mut arena = Arena::new(ArenaConfig::small()).unwrap();
        let before = arena.pos();
        {
            let scope = arena.scope();
            assert_eq!(scope.entry_pos(), before);
            scope.push(256, 8).unwrap();
            assert!(scope.pos() > before);
        }
        assert_eq!(arena.pos(), before);
    }

    #[test]
    fn test_nested_scopes() {
        let mut arena = Arena::new(ArenaConfig::small()).unwrap();
        let outer_start = arena.pos();
        {
            let mut outer = arena.scope();
            outer.push(64, 8).unwrap();
            let inner_start = outer.pos();
            {
                let inner = outer.scope();
                inner.push(512, 8).unwrap();
            }
            assert_eq!(outer.pos(), inner_start);
        }
        assert_eq!(arena.pos(), outer_start);
    }

    #[test]
    fn test_scope_tolerates_manual_pop() {
        let mut arena = Arena::new(ArenaConfig::small()).unwrap();
        arena.push(32, 8).unwrap();
        let before = arena.pos();
        {
            let mut scope = arena.scope();
            scope.clear();
        }
        assert!(arena.pos() < before);
    }

    #[test]
    fn test_keep() {
        let mut arena = Arena::new(ArenaConfig::small()).unwrap();
        let before = arena.pos();
        {
            let scope = arena.scope();
            scope.push(64, 8).unwrap();
            scope.keep();
        }
        assert_eq!(arena.pos(), before + 64);
    }
}
