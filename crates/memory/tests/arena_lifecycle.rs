//! Arena behaviour through the public API: growth, rewinds, markers, release.

use arenakit_memory::arena::{ARENA_HEADER_SIZE, Arena, ArenaConfig};
use arenakit_memory::error::MemoryError;
use arenakit_system::{KB, MB, page_size, utils::align_up};
use pretty_assertions::assert_eq;

fn small(name: &str) -> Arena {
    Arena::new(ArenaConfig::small().with_name(name)).unwrap()
}

#[test]
fn test_creation_layout() {
    let arena = small("Lifecycle");
    assert_eq!(arena.name(), Some("Lifecycle"));
    assert_eq!(arena.header_size(), ARENA_HEADER_SIZE);
    assert_eq!(arena.base_pos(), align_up(ARENA_HEADER_SIZE + "Lifecycle".len(), 8));
    assert_eq!(arena.pos(), arena.base_pos());
    assert_eq!(arena.reserved_size(), align_up(MB, page_size()));
    assert_eq!(arena.committed_size(), arena.commit_size());
    assert!(arena.header_intact());
}

#[test]
fn test_commit_grows_in_whole_increments() {
    let arena = small("Growth");
    let increment = arena.commit_size();
    let before = arena.committed_size();

    arena.push(increment, 1).unwrap();
    let expected = (arena.pos().div_ceil(increment) * increment).min(arena.reserved_size());
    assert_eq!(arena.committed_size(), expected);
    assert!(arena.committed_size() > before);
    assert!(arena.committed_size() <= arena.reserved_size());
}

#[test]
fn test_push_past_reservation_fails_cleanly() {
    let arena = small("Exhaust");
    let pos = arena.pos();
    let committed = arena.committed_size();

    let err = arena.push(arena.reserved_size(), 1).unwrap_err();
    assert!(matches!(err, MemoryError::ArenaExhausted { .. }));
    assert!(err.is_exhaustion());
    assert_eq!(err.code(), "MEM:ARENA:EXHAUSTED");
    assert_eq!(arena.pos(), pos);
    assert_eq!(arena.committed_size(), committed);

    // The arena is still usable after a failed push.
    arena.push(64, 8).unwrap();
    assert_eq!(arena.stats().failed_pushes, 1);
}

#[test]
fn test_fill_to_the_last_byte() {
    let arena = Arena::new(ArenaConfig::new().with_reserve_size(256 * KB).with_commit_size(64 * KB))
        .unwrap();
    let rest = arena.remaining();
    arena.push(rest, 1).unwrap();
    assert_eq!(arena.pos(), arena.reserved_size());
    assert_eq!(arena.committed_size(), arena.reserved_size());
    assert!(arena.push(1, 1).is_err());
}

#[test]
fn test_rewind_reuses_space() {
    let mut arena = small("Rewind");
    let start = arena.pos();
    let first = arena.push(1000, 1).unwrap();
    arena.pop_to(start);
    let second = arena.push(1000, 1).unwrap();
    assert_eq!(first, second);

    arena.pop(1000);
    assert_eq!(arena.pos(), start);

    arena.push(128, 16).unwrap();
    arena.clear();
    assert_eq!(arena.pos(), arena.base_pos());
}

#[test]
fn test_pop_never_enters_header() {
    let mut arena = small("Header");
    arena.pop_to(0);
    assert_eq!(arena.pos(), arena.base_pos());
    arena.pop(usize::MAX);
    assert_eq!(arena.pos(), arena.base_pos());
    assert_eq!(arena.name(), Some("Header"));
}

#[test]
#[should_panic(expected = "past the arena position")]
fn test_pop_forward_panics() {
    let mut arena = small("Forward");
    let past = arena.pos() + 8;
    arena.pop_to(past);
}

#[test]
fn test_markers_and_scopes() {
    let mut arena = small("Markers");
    let marker = arena.marker();
    arena.push_array::<u64>(32).unwrap();
    {
        let scope = arena.scope();
        scope.push_str("temporary").unwrap();
        assert!(scope.pos() > scope.entry_pos());
    }
    assert_eq!(arena.pos(), marker.pos() + 32 * 8);
    arena.pop_to_marker(marker);
    assert_eq!(arena.pos(), marker.pos());

    let kept = {
        let scope = arena.scope();
        scope.push(16, 8).unwrap();
        let pos = scope.pos();
        scope.keep();
        pos
    };
    assert_eq!(arena.pos(), kept);
}

#[test]
#[should_panic(expected = "different arena")]
fn test_foreign_marker_panics() {
    let a = small("A");
    let mut b = small("B");
    let marker = a.marker();
    b.pop_to_marker(marker);
}

#[test]
fn test_release_and_stats() {
    let arena = small("Stats");
    arena.push(512, 8).unwrap();
    arena.push(256, 64).unwrap();

    let stats = arena.stats();
    assert_eq!(stats.pushes, 2);
    assert_eq!(stats.position, arena.pos());
    assert_eq!(stats.high_water, arena.pos());
    assert!(stats.utilization() > 0.0);

    arena.release().unwrap();
}

#[test]
fn test_arena_moves_across_threads() {
    let arena = small("Mover");
    arena.push_slice(&[1u8, 2, 3]).unwrap();
    let pos = std::thread::spawn(move || {
        arena.push(8, 8).unwrap();
        arena.pos()
    })
    .join()
    .unwrap();
    assert!(pos > 0);
}
