//! Alignment arithmetic, size constants and formatting

/// One kibibyte
pub const KB: usize = 1024;
/// One mebibyte
pub const MB: usize = 1024 * KB;
/// One gibibyte
pub const GB: usize = 1024 * MB;

/// Check if a number is a power of two (zero is not)
#[inline]
#[must_use]
pub const fn is_power_of_two(n: usize) -> bool {
    n != 0 && n.is_power_of_two()
}

/// Round `value` up to a multiple of `align`
///
/// `align` must be a power of two. Overflow wraps in release builds, use
/// [`checked_align_up`] when `value` is untrusted.
///
/// # Examples
///
/// ```
/// use arenakit_system::utils::align_up;
///
/// assert_eq!(align_up(0, 8), 0);
/// assert_eq!(align_up(1, 8), 8);
/// assert_eq!(align_up(4096, 4096), 4096);
/// assert_eq!(align_up(4097, 4096), 8192);
/// ```
#[inline]
#[must_use]
pub const fn align_up(value: usize, align: usize) -> usize {
    debug_assert!(is_power_of_two(align));
    value.wrapping_add(align - 1) & !(align - 1)
}

/// Round `value` up to a multiple of `align`, `None` on overflow
///
/// # Examples
///
/// ```
/// use arenakit_system::utils::checked_align_up;
///
/// assert_eq!(checked_align_up(13, 16), Some(16));
/// assert_eq!(checked_align_up(usize::MAX, 16), None);
/// ```
#[inline]
#[must_use]
pub const fn checked_align_up(value: usize, align: usize) -> Option<usize> {
    debug_assert!(is_power_of_two(align));
    match value.checked_add(align - 1) {
        Some(v) => Some(v & !(align - 1)),
        None => None,
    }
}

/// Round `value` down to a multiple of `align`
///
/// # Examples
///
/// ```
/// use arenakit_system::utils::align_down;
///
/// assert_eq!(align_down(4097, 4096), 4096);
/// assert_eq!(align_down(15, 8), 8);
/// ```
#[inline]
#[must_use]
pub const fn align_down(value: usize, align: usize) -> usize {
    debug_assert!(is_power_of_two(align));
    value & !(align - 1)
}

/// Check whether `value` is a multiple of `align`
#[inline]
#[must_use]
pub const fn is_aligned(value: usize, align: usize) -> bool {
    debug_assert!(is_power_of_two(align));
    value & (align - 1) == 0
}

/// Format bytes as human-readable string
///
/// # Examples
///
/// ```
/// use arenakit_system::utils::format_bytes;
///
/// assert_eq!(format_bytes(1024), "1.00 KB");
/// assert_eq!(format_bytes(1536), "1.50 KB");
/// assert_eq!(format_bytes(1048576), "1.00 MB");
/// ```
#[must_use]
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
