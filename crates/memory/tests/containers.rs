//! Container behaviour over both storage policies.

use std::mem::MaybeUninit;

use arenakit_memory::prelude::*;
use pretty_assertions::assert_eq;

#[test]
fn test_static_vector_capacity_bound() {
    let mut buf = [const { MaybeUninit::<u16>::uninit() }; 5];
    let mut v = StaticVec::from_buffer(&mut buf);
    for n in 0..5 {
        v.push(n).unwrap();
    }
    let err = v.push(5).unwrap_err();
    assert!(matches!(err, MemoryError::StorageFull { capacity: 5 }));
    assert_eq!(v.len(), 5);
    assert_eq!(v.as_slice(), &[0, 1, 2, 3, 4]);
}

#[test]
fn test_arena_vector_grows_in_place() {
    let mut v = Vector::<u64>::with_capacity(10_000).unwrap();
    v.push(1).unwrap();
    let first = v.as_ptr();
    for n in 2..=10_000 {
        v.push(n).unwrap();
    }
    assert_eq!(v.as_ptr(), first);
    assert_eq!(v.len(), 10_000);
    assert_eq!(v.iter().sum::<u64>(), 10_000 * 10_001 / 2);

    assert_eq!(v.remove(0), 1);
    assert_eq!(v.front(), Some(&2));
    assert_eq!(v.remove_item(&10_000), 10_000);
    assert_eq!(v.back(), Some(&9_999));
    assert_eq!(v.find(&500), Some(498));
    assert_eq!(v.try_remove_item(&1), None);

    v.clear();
    assert!(v.is_empty());
    assert_eq!(v.storage().len(), 0);
    assert!(v.storage().committed() > 0);
}

#[test]
fn test_pool_handle_reuse() {
    let mut pool = ElementPool::<u32>::with_capacity(16).unwrap();
    let handles: Vec<Handle> = (0..4).map(|_| pool.create().unwrap()).collect();
    pool[handles[0]] = 99;

    assert!(pool.destroy(handles[0]));
    assert_eq!(pool.try_get(handles[0]), None);

    let again = pool.create().unwrap();
    assert_eq!(again, handles[0]);
    assert_eq!(pool.try_get(again), Some(&0));
}

#[test]
fn test_pool_double_destroy() {
    let mut pool = ElementPool::<String>::with_capacity(8).unwrap();
    let handle = pool.create_with("once".to_string()).unwrap();
    pool.create_with("twice".to_string()).unwrap();

    assert!(pool.destroy(handle));
    let count = pool.count();
    assert!(!pool.destroy(handle));
    assert_eq!(pool.count(), count);
    assert!(matches!(pool.take(handle), Err(MemoryError::DoubleFree { .. })));
    assert!(matches!(
        pool.take(Handle::from_raw(1_000)),
        Err(MemoryError::InvalidHandle { handle: 1_000, .. })
    ));
}

#[test]
fn test_pool_exhaustion_and_recovery() {
    let mut buf = [const { MaybeUninit::<Slot<u8>>::uninit() }; 3];
    let mut pool: StaticPool<'_, u8> = ElementPool::from_storage(StaticStorage::new(&mut buf));
    let handles: Vec<Handle> = (0..3).map(|n| pool.create_with(n).unwrap()).collect();

    let err = pool.create_with(3).unwrap_err();
    assert!(matches!(err, MemoryError::PoolExhausted { capacity: 3 }));

    assert!(pool.destroy(handles[1]));
    assert_eq!(pool.create_with(4).unwrap(), handles[1]);
    assert!(pool.create_with(5).is_err());
}

#[test]
fn test_pool_for_each_visits_live_slots() {
    let mut pool = ElementPool::<u32>::with_capacity(8).unwrap();
    let handles: Vec<Handle> = (0..5).map(|n| pool.create_with(n).unwrap()).collect();
    pool.destroy(handles[2]);

    let mut seen = Vec::new();
    pool.for_each(|handle, value| {
        *value *= 10;
        seen.push(handle.index());
    });
    assert_eq!(seen, [0, 1, 3, 4]);
    assert_eq!(
        pool.iter().map(|(_, v)| *v).collect::<Vec<_>>(),
        [0, 10, 30, 40]
    );
}

#[test]
fn test_queue_wraparound() {
    let mut buf = [const { MaybeUninit::<u32>::uninit() }; 8];
    let mut queue = StaticQueue::from_buffer(&mut buf);

    for n in 0..4 {
        queue.push(n).unwrap();
    }
    for n in 0..3 {
        assert_eq!(queue.pop(), n);
    }
    for n in 4..8 {
        queue.push(n).unwrap();
    }

    assert_eq!(queue.len(), 5);
    assert!(queue.len() <= queue.capacity());
    let read: Vec<u32> = (0..queue.len()).map(|i| queue[i]).collect();
    assert_eq!(read, [3, 4, 5, 6, 7]);
    assert_eq!(queue.front(), Some(&3));
    assert_eq!(queue.back(), Some(&7));
}

#[test]
fn test_arena_queue_reuses_slots_after_wrap() {
    let mut queue = Queue::<u64>::with_capacity(64).unwrap();
    let capacity = queue.capacity() as u64;
    assert!(capacity >= 64);

    for n in 0..capacity {
        queue.push(n).unwrap();
    }
    assert!(queue.is_full());
    assert!(queue.push(capacity).unwrap_err().is_exhaustion());
    let committed = queue.size_committed();
    assert!(committed <= queue.capacity());

    // Drain half, then refill across the end of the ring.
    let half = capacity / 2;
    for n in 0..half {
        assert_eq!(queue.pop(), n);
    }
    for n in capacity..capacity + half {
        queue.push(n).unwrap();
    }
    assert!(queue.is_full());
    assert_eq!(queue.size_committed(), committed);

    let read: Vec<u64> = (0..queue.len()).map(|i| queue[i]).collect();
    let expected: Vec<u64> = (half..capacity + half).collect();
    assert_eq!(read, expected);
    assert_eq!(queue.back(), Some(&(capacity + half - 1)));
}

#[test]
fn test_vector_map_idempotent_add() {
    let mut map = VectorMap::<&str, u32>::with_capacity(16).unwrap();
    let first = map.add("key", 1).unwrap();
    let second = map.add("key", 2).unwrap();

    assert_eq!(first, Added::Inserted(0));
    assert_eq!(second, Added::Existing(0));
    assert_eq!(first.index(), second.index());
    assert_eq!(*map.find_data(&"key"), 1);
    assert_eq!(map.len(), 1);
}
