//! Virtual memory primitives
//!
//! Reserve address space up front, then back it with physical pages on
//! demand. Every arena in the workspace sits on top of these calls.
//!
//! # Safety
//!
//! The free functions perform FFI calls to OS primitives:
//! - **Unix**: `mmap` / `mprotect` / `madvise` / `munmap` / `sysconf`
//! - **Windows**: `VirtualAlloc` / `VirtualFree` / `GetSystemInfo`
//! - **Fallback**: `std::alloc`, where commit and decommit are no-ops
//!
//! Callers of the `unsafe` functions must pass pointers obtained from
//! [`reserve`] that have not been released yet. [`VirtualRegion`] wraps one
//! reservation and upholds those contracts itself.

use std::io;
use std::mem::ManuallyDrop;
use std::ptr::NonNull;

use once_cell::sync::OnceCell;

use crate::core::result::IoResultExt;
use crate::core::{SystemError, SystemResult, SystemResultExt};
use crate::utils::{GB, align_down, checked_align_up};

static PAGE_SIZE: OnceCell<usize> = OnceCell::new();

const FALLBACK_PAGE_SIZE: usize = 4096;

/// Size of a virtual memory page in bytes
///
/// Queried from the OS once and cached for the life of the process.
#[inline]
#[must_use]
pub fn page_size() -> usize {
    *PAGE_SIZE.get_or_init(query_page_size)
}

fn query_page_size() -> usize {
    #[cfg(unix)]
    {
        // SAFETY: sysconf has no memory-safety preconditions.
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 {
            return size as usize;
        }
        FALLBACK_PAGE_SIZE
    }

    #[cfg(windows)]
    {
        use winapi::um::sysinfoapi::{GetSystemInfo, SYSTEM_INFO};

        // SAFETY: SYSTEM_INFO is plain data and GetSystemInfo fills every field.
        let mut info: SYSTEM_INFO = unsafe { std::mem::zeroed() };
        unsafe { GetSystemInfo(&mut info) };
        if info.dwPageSize > 0 {
            return info.dwPageSize as usize;
        }
        FALLBACK_PAGE_SIZE
    }

    #[cfg(not(any(unix, windows)))]
    {
        FALLBACK_PAGE_SIZE
    }
}

/// Granularity that reservations are rounded up to
///
/// 1 GiB on 64-bit targets, where address space is plentiful and coarse
/// reservations keep the OS mapping tables small. One page on 32-bit targets.
#[inline]
#[must_use]
pub fn allocation_granularity() -> usize {
    if cfg!(target_pointer_width = "64") {
        GB
    } else {
        page_size()
    }
}

fn reservation_size(size: usize) -> SystemResult<usize> {
    if size == 0 {
        return Err(SystemError::invalid_size(size, "reservation must be non-zero"));
    }
    checked_align_up(size, allocation_granularity())
        .ok_or_else(|| SystemError::invalid_size(size, "reservation overflows address space"))
}

fn commit_span(size: usize) -> SystemResult<usize> {
    checked_align_up(size, page_size())
        .ok_or_else(|| SystemError::invalid_size(size, "commit size overflows"))
}

/// Reserve `size` bytes of address space without physical backing
///
/// The reservation is rounded up to [`allocation_granularity`]. The memory is
/// inaccessible until [`commit`]ted.
///
/// # Errors
///
/// [`SystemError::InvalidSize`] when `size` is zero or rounds past the end of
/// the address space, [`SystemError::Reserve`] when the OS refuses.
pub fn reserve(size: usize) -> SystemResult<NonNull<u8>> {
    let snapped = reservation_size(size)?;
    let ptr = os_reserve(snapped).or_system(|source| SystemError::Reserve { size, source })?;

    #[cfg(feature = "logging")]
    tracing::debug!(
        requested = size,
        reserved = snapped,
        addr = ?ptr,
        "reserved address space"
    );

    Ok(ptr)
}

/// Back `size` bytes at `ptr` with zero-initialised read/write pages
///
/// `size` is rounded up to the page size. Committing pages that are already
/// committed leaves their contents untouched.
///
/// # Safety
///
/// - `ptr` must be page-aligned and lie inside a live reservation from [`reserve`]
/// - `ptr + size` rounded up to the page size must not pass the end of that reservation
///
/// # Errors
///
/// [`SystemError::Commit`] when the OS cannot provide the pages.
pub unsafe fn commit(ptr: NonNull<u8>, size: usize) -> SystemResult<()> {
    let span = commit_span(size)?;
    if span == 0 {
        return Ok(());
    }
    // SAFETY: forwarded from the caller.
    unsafe { os_commit(ptr, span) }.or_system(|source| SystemError::Commit {
        offset: ptr.as_ptr() as usize,
        size,
        source,
    })
}

/// Drop the physical backing of `size` bytes at `ptr`, keeping the reservation
///
/// The pages read as zero if committed again.
///
/// # Safety
///
/// Same range requirements as [`commit`]. No live reference may point into
/// the range: its contents are discarded.
///
/// # Errors
///
/// [`SystemError::Decommit`] when the OS call fails.
pub unsafe fn decommit(ptr: NonNull<u8>, size: usize) -> SystemResult<()> {
    let span = commit_span(size)?;
    if span == 0 {
        return Ok(());
    }
    // SAFETY: forwarded from the caller.
    unsafe { os_decommit(ptr, span) }.or_system(|source| SystemError::Decommit {
        offset: ptr.as_ptr() as usize,
        size,
        source,
    })
}

/// Return a whole reservation to the OS
///
/// # Safety
///
/// - `ptr` must be the exact pointer returned by [`reserve`]
/// - `size` must be the exact size passed to that [`reserve`] call
/// - the reservation must not have been released already, and nothing may
///   access it afterwards
///
/// # Errors
///
/// [`SystemError::Release`] when the OS call fails.
pub unsafe fn release(ptr: NonNull<u8>, size: usize) -> SystemResult<()> {
    let snapped = reservation_size(size)?;
    // SAFETY: forwarded from the caller.
    unsafe { os_release(ptr, snapped) }.or_system(|source| SystemError::Release { size, source })?;

    #[cfg(feature = "logging")]
    tracing::debug!(size = snapped, addr = ?ptr, "released address space");

    Ok(())
}

/// Terminate the process immediately, without unwinding
pub fn abort() -> ! {
    std::process::abort()
}

// ---------------------------------------------------------------------------
// Platform back ends
// ---------------------------------------------------------------------------

#[cfg(unix)]
fn os_reserve(size: usize) -> io::Result<NonNull<u8>> {
    use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_NORESERVE, MAP_PRIVATE, PROT_NONE, mmap};

    // SAFETY: anonymous private mapping with a null hint; the OS picks the
    // address and reports failure through MAP_FAILED.
    let ptr = unsafe {
        mmap(
            std::ptr::null_mut(),
            size,
            PROT_NONE,
            MAP_PRIVATE | MAP_ANONYMOUS | MAP_NORESERVE,
            -1,
            0,
        )
    };

    if ptr == MAP_FAILED {
        return Err(io::Error::last_os_error());
    }
    NonNull::new(ptr.cast::<u8>()).ok_or_else(|| io::Error::from(io::ErrorKind::OutOfMemory))
}

#[cfg(unix)]
unsafe fn os_commit(ptr: NonNull<u8>, size: usize) -> io::Result<()> {
    // SAFETY: caller guarantees the range lies inside a live mapping.
    let rc = unsafe {
        libc::mprotect(
            ptr.as_ptr().cast::<libc::c_void>(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
        )
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(unix)]
unsafe fn os_decommit(ptr: NonNull<u8>, size: usize) -> io::Result<()> {
    let addr = ptr.as_ptr().cast::<libc::c_void>();
    // SAFETY: caller guarantees the range lies inside a live mapping and that
    // nothing references it. DONTNEED on a private anonymous mapping drops the
    // pages so they read back as zero.
    let rc = unsafe { libc::madvise(addr, size, libc::MADV_DONTNEED) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: same range as above.
    let rc = unsafe { libc::mprotect(addr, size, libc::PROT_NONE) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(unix)]
unsafe fn os_release(ptr: NonNull<u8>, size: usize) -> io::Result<()> {
    // SAFETY: caller guarantees ptr/size describe exactly one live mapping.
    let rc = unsafe { libc::munmap(ptr.as_ptr().cast::<libc::c_void>(), size) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(windows)]
fn os_reserve(size: usize) -> io::Result<NonNull<u8>> {
    use winapi::um::memoryapi::VirtualAlloc;
    use winapi::um::winnt::{MEM_RESERVE, PAGE_NOACCESS};

    // SAFETY: reserving with a null hint has no preconditions; failure is a
    // null return.
    let ptr = unsafe { VirtualAlloc(std::ptr::null_mut(), size, MEM_RESERVE, PAGE_NOACCESS) };
    NonNull::new(ptr.cast::<u8>()).ok_or_else(io::Error::last_os_error)
}

#[cfg(windows)]
unsafe fn os_commit(ptr: NonNull<u8>, size: usize) -> io::Result<()> {
    use winapi::um::memoryapi::VirtualAlloc;
    use winapi::um::winnt::{MEM_COMMIT, PAGE_READWRITE};

    // SAFETY: caller guarantees the range lies inside a live reservation.
    let result = unsafe {
        VirtualAlloc(
            ptr.as_ptr().cast::<winapi::ctypes::c_void>(),
            size,
            MEM_COMMIT,
            PAGE_READWRITE,
        )
    };
    if result.is_null() {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(windows)]
unsafe fn os_decommit(ptr: NonNull<u8>, size: usize) -> io::Result<()> {
    use winapi::um::memoryapi::VirtualFree;
    use winapi::um::winnt::MEM_DECOMMIT;

    // SAFETY: caller guarantees the range lies inside a live reservation and
    // that nothing references it.
    let ok = unsafe {
        VirtualFree(
            ptr.as_ptr().cast::<winapi::ctypes::c_void>(),
            size,
            MEM_DECOMMIT,
        )
    };
    if ok == 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(windows)]
unsafe fn os_release(ptr: NonNull<u8>, _size: usize) -> io::Result<()> {
    use winapi::um::memoryapi::VirtualFree;
    use winapi::um::winnt::MEM_RELEASE;

    // SAFETY: caller guarantees ptr is the base of a live reservation.
    // MEM_RELEASE requires a size of zero.
    let ok = unsafe { VirtualFree(ptr.as_ptr().cast::<winapi::ctypes::c_void>(), 0, MEM_RELEASE) };
    if ok == 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(not(any(unix, windows)))]
fn fallback_layout(size: usize) -> io::Result<std::alloc::Layout> {
    std::alloc::Layout::from_size_align(size, page_size())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

#[cfg(not(any(unix, windows)))]
fn os_reserve(size: usize) -> io::Result<NonNull<u8>> {
    let layout = fallback_layout(size)?;
    // SAFETY: layout has non-zero size (checked by reservation_size).
    let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
    NonNull::new(ptr).ok_or_else(|| io::Error::from(io::ErrorKind::OutOfMemory))
}

#[cfg(not(any(unix, windows)))]
unsafe fn os_commit(_ptr: NonNull<u8>, _size: usize) -> io::Result<()> {
    Ok(())
}

#[cfg(not(any(unix, windows)))]
unsafe fn os_decommit(ptr: NonNull<u8>, size: usize) -> io::Result<()> {
    // SAFETY: caller guarantees the range is inside the allocation and unreferenced.
    unsafe { std::ptr::write_bytes(ptr.as_ptr(), 0, size) };
    Ok(())
}

#[cfg(not(any(unix, windows)))]
unsafe fn os_release(ptr: NonNull<u8>, size: usize) -> io::Result<()> {
    let layout = fallback_layout(size)?;
    // SAFETY: caller guarantees ptr came from os_reserve with the same size.
    unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) };
    Ok(())
}

// ---------------------------------------------------------------------------
// VirtualRegion
// ---------------------------------------------------------------------------

/// Owning handle over one address-space reservation
///
/// The reservation is released when the handle is dropped or passed to
/// [`VirtualRegion::release`].
#[derive(Debug)]
pub struct VirtualRegion {
    ptr: NonNull<u8>,
    len: usize,
}

// SAFETY: the region is exclusively owned; the raw pointer is only an address.
unsafe impl Send for VirtualRegion {}

impl VirtualRegion {
    /// Reserve `len` bytes, rounded up to the page size
    ///
    /// # Errors
    ///
    /// See [`reserve`].
    pub fn reserve(len: usize) -> SystemResult<Self> {
        let len = checked_align_up(len, page_size())
            .ok_or_else(|| SystemError::invalid_size(len, "reservation overflows address space"))?;
        let ptr = reserve(len)?;
        Ok(Self { ptr, len })
    }

    /// Base address of the reservation
    #[inline]
    #[must_use]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Base address as a [`NonNull`]
    #[inline]
    #[must_use]
    pub fn as_non_null(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Usable length in bytes (a whole number of pages)
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`: a region holds at least one page
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `ptr` points inside this reservation
    #[inline]
    #[must_use]
    pub fn contains(&self, ptr: *const u8) -> bool {
        let start = self.ptr.as_ptr() as usize;
        let addr = ptr as usize;
        addr >= start && addr < start + self.len
    }

    fn page_range(&self, offset: usize, len: usize) -> SystemResult<(usize, usize)> {
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= self.len)
            .ok_or_else(|| SystemError::out_of_range(offset, len, self.len))?;
        let page = page_size();
        let start = align_down(offset, page);
        // self.len is page-aligned, so rounding `end` up stays in bounds
        let end = checked_align_up(end, page).unwrap_or(self.len).min(self.len);
        Ok((start, end - start))
    }

    /// Make `[offset, offset + len)` readable and writable
    ///
    /// The range is widened to page boundaries. Already committed pages keep
    /// their contents.
    ///
    /// # Errors
    ///
    /// [`SystemError::OutOfRange`] when the range leaves the region,
    /// [`SystemError::Commit`] when the OS refuses.
    pub fn commit(&self, offset: usize, len: usize) -> SystemResult<()> {
        let (start, span) = self.page_range(offset, len)?;
        if span == 0 {
            return Ok(());
        }
        // SAFETY: start is page-aligned and [start, start + span) lies inside
        // this live reservation. Committing never changes existing contents.
        unsafe { commit(self.ptr.add(start), span) }.map_err(|e| match e {
            SystemError::Commit { source, .. } => SystemError::Commit {
                offset: start,
                size: span,
                source,
            },
            other => other,
        })
    }

    /// Drop the physical backing of `[offset, offset + len)`
    ///
    /// # Safety
    ///
    /// The range is widened to page boundaries and its contents are
    /// discarded; nothing may reference any byte of those pages.
    ///
    /// # Errors
    ///
    /// [`SystemError::OutOfRange`] when the range leaves the region,
    /// [`SystemError::Decommit`] when the OS call fails.
    pub unsafe fn decommit(&self, offset: usize, len: usize) -> SystemResult<()> {
        let (start, span) = self.page_range(offset, len)?;
        if span == 0 {
            return Ok(());
        }
        // SAFETY: range checked above; the caller vouches nothing aliases it.
        unsafe { decommit(self.ptr.add(start), span) }
    }

    /// Release the reservation, reporting failure
    ///
    /// # Errors
    ///
    /// [`SystemError::Release`] when the OS call fails. The address space is
    /// leaked in that case.
    pub fn release(self) -> SystemResult<()> {
        let this = ManuallyDrop::new(self);
        // SAFETY: ptr/len come from a reserve call and ManuallyDrop keeps Drop
        // from releasing a second time.
        unsafe { release(this.ptr, this.len) }
    }
}

impl Drop for VirtualRegion {
    fn drop(&mut self) {
        // SAFETY: ptr/len come from a reserve call and are released exactly once.
        let _ = unsafe { release(self.ptr, self.len) }.ok_or_log("release");
    }
}
