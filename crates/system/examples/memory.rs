use arenakit_system::{self as sys, VirtualRegion, utils::format_bytes};

fn main() -> sys::SystemResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let page = sys::page_size();
    println!("=== Virtual Memory ===");
    println!("page size   : {}", format_bytes(page));
    println!("granularity : {}", format_bytes(sys::allocation_granularity()));

    let region = VirtualRegion::reserve(64 * sys::MB)?;
    println!("reserved    : {} at {:p}", format_bytes(region.len()), region.as_ptr());

    region.commit(0, 16 * page)?;
    // SAFETY: the first sixteen pages were just committed read/write.
    let bytes = unsafe { std::slice::from_raw_parts_mut(region.as_ptr(), 16 * page) };
    bytes.fill(0xAB);
    println!("committed   : {}", format_bytes(bytes.len()));

    region.release()
}
