//! A named arena feeding a fixed vector and a raw typed array side by side.

use arenakit_memory::prelude::*;
use arenakit_system::{KB, MB};
use pretty_assertions::assert_eq;

#[test]
fn test_named_arena_vector_scenario() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("arenakit=debug")
        .with_test_writer()
        .try_init();

    let arena = Arena::new(
        ArenaConfig::new()
            .with_reserve_size(MB)
            .with_commit_size(64 * KB)
            .with_name("Test"),
    )
    .unwrap();
    assert_eq!(arena.name(), Some("Test"));

    let mut values = arena.push_vector::<u32>(10).unwrap();
    for value in [69, 55, 420, 67] {
        values.push(value).unwrap();
    }

    // Raw arrays do not track a used count; only the vector does.
    let filler = arena.push_array::<u32>(3).unwrap();
    filler.fill(0xBEEF);

    assert_eq!(values.len(), 4);
    assert_eq!(values.capacity(), 10);
    assert_eq!(values[0], 69);
    assert_eq!(values[1], 55);
    assert_eq!(values[2], 420);
    assert_eq!(values[3], 67);
    assert_eq!(filler, &[0xBEEF; 3]);
    assert!(arena.contains(values.as_ptr()));
    assert!(arena.contains(filler.as_ptr()));
}

#[test]
fn test_containers_share_one_arena() {
    let mut arena = Arena::new(ArenaConfig::small().with_name("Frame")).unwrap();

    for _ in 0..3 {
        let mut scope = arena.scope();
        {
            let mut queue = scope.push_queue::<u32>(4).unwrap();
            let mut pool = scope.push_pool::<String>(4).unwrap();
            let mut ids = scope.push_vector::<Handle>(4).unwrap();

            for n in 0..4 {
                queue.push(n).unwrap();
                ids.push(pool.create_with(format!("job-{n}")).unwrap()).unwrap();
            }
            assert!(queue.is_full());
            assert!(pool.create().is_err());

            while let Some(n) = queue.try_pop() {
                assert_eq!(pool[ids[n as usize]], format!("job-{n}"));
            }
            assert!(pool.destroy(ids[0]));
            assert_eq!(pool.count(), 3);
        }
        scope.clear();
    }
    assert_eq!(arena.pos(), arena.base_pos());
}
