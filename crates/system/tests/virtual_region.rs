//! Integration tests for reservations through the public API

use arenakit_system::{
    MB, SystemError, SystemResultExt, VirtualRegion, commit, page_size, release, reserve,
};
use pretty_assertions::assert_eq;

#[test]
fn test_commit_in_increments() {
    let page = page_size();
    let region = VirtualRegion::reserve(MB).expect("reserve");
    assert_eq!(region.len(), MB);

    let mut committed = 0;
    while committed < region.len() {
        let step = (64 * 1024).min(region.len() - committed);
        region.commit(committed, step).expect("commit increment");
        // SAFETY: the increment was just committed.
        unsafe { region.as_ptr().add(committed).write((committed / step) as u8) };
        committed += step;
    }

    for (i, offset) in (0..region.len()).step_by(64 * 1024).enumerate() {
        // SAFETY: every byte of the region is committed.
        assert_eq!(unsafe { region.as_ptr().add(offset).read() }, i as u8);
    }
    assert_eq!(committed % page, 0);
}

#[test]
fn test_reservation_len_rounds_to_pages() {
    let region = VirtualRegion::reserve(page_size() + 1).expect("reserve");
    assert_eq!(region.len(), 2 * page_size());
}

#[test]
fn test_commit_past_end_fails() {
    let region = VirtualRegion::reserve(page_size()).expect("reserve");
    let result = region.commit(0, page_size() + 1);
    assert!(matches!(result, Err(SystemError::OutOfRange { .. })));
    assert_eq!(result.os_error_kind(), None);
}

#[test]
fn test_many_regions_are_independent() {
    let regions: Vec<_> = (0..8)
        .map(|_| VirtualRegion::reserve(4 * page_size()).expect("reserve"))
        .collect();

    for (i, region) in regions.iter().enumerate() {
        region.commit(0, 1).expect("commit");
        // SAFETY: first page committed above.
        unsafe { region.as_ptr().write(i as u8) };
    }
    for (i, region) in regions.iter().enumerate() {
        // SAFETY: first page committed above.
        assert_eq!(unsafe { region.as_ptr().read() }, i as u8);
        for other in regions.iter().filter(|r| r.as_ptr() != region.as_ptr()) {
            assert!(!other.contains(region.as_ptr()));
        }
    }
}

#[test]
fn test_region_moves_across_threads() {
    let region = VirtualRegion::reserve(page_size()).expect("reserve");
    region.commit(0, page_size()).expect("commit");

    let handle = std::thread::spawn(move || {
        // SAFETY: the page was committed before the move.
        unsafe { region.as_ptr().write(7) };
        region
    });
    let region = handle.join().expect("thread");
    // SAFETY: committed page.
    assert_eq!(unsafe { region.as_ptr().read() }, 7);
}

#[test]
fn test_free_function_round_trip() {
    let ptr = reserve(2 * page_size()).expect("reserve");
    // SAFETY: ptr is the base of a live reservation of at least two pages.
    unsafe {
        commit(ptr, 2 * page_size()).expect("commit");
        std::ptr::write_bytes(ptr.as_ptr(), 0xCC, 2 * page_size());
        release(ptr, 2 * page_size()).expect("release");
    }
}
