//! Errors raised by virtual memory primitives

use std::io;

use thiserror::Error;

/// Result type for system operations
pub type SystemResult<T> = Result<T, SystemError>;

/// Failure of an OS virtual memory call
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SystemError {
    /// Address space could not be reserved
    #[error("failed to reserve {size} bytes of address space: {source}")]
    Reserve {
        /// Requested size in bytes (before granularity rounding)
        size: usize,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// Reserved pages could not be backed by physical memory
    #[error("failed to commit {size} bytes at offset {offset}: {source}")]
    Commit {
        /// Offset from the region base
        offset: usize,
        /// Size in bytes
        size: usize,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// Physical backing could not be dropped
    #[error("failed to decommit {size} bytes at offset {offset}: {source}")]
    Decommit {
        /// Offset from the region base
        offset: usize,
        /// Size in bytes
        size: usize,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// Reservation could not be returned to the OS
    #[error("failed to release {size} bytes of address space: {source}")]
    Release {
        /// Size of the reservation in bytes
        size: usize,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// A range does not fit inside the region it targets
    #[error("range {offset}..{end} is outside the {region_len}-byte region", end = offset.saturating_add(*len))]
    OutOfRange {
        /// Start of the range
        offset: usize,
        /// Length of the range
        len: usize,
        /// Length of the region
        region_len: usize,
    },

    /// A size argument is unusable (zero, or overflows when rounded)
    #[error("invalid size {size}: {reason}")]
    InvalidSize {
        /// Offending size
        size: usize,
        /// Why it was rejected
        reason: &'static str,
    },
}

impl SystemError {
    /// Stable error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Reserve { .. } => "SYS:VM:RESERVE",
            Self::Commit { .. } => "SYS:VM:COMMIT",
            Self::Decommit { .. } => "SYS:VM:DECOMMIT",
            Self::Release { .. } => "SYS:VM:RELEASE",
            Self::OutOfRange { .. } => "SYS:VM:RANGE",
            Self::InvalidSize { .. } => "SYS:VM:SIZE",
        }
    }

    /// Create an invalid size error
    #[must_use]
    pub fn invalid_size(size: usize, reason: &'static str) -> Self {
        Self::InvalidSize { size, reason }
    }

    /// Create an out of range error
    #[must_use]
    pub fn out_of_range(offset: usize, len: usize, region_len: usize) -> Self {
        Self::OutOfRange {
            offset,
            len,
            region_len,
        }
    }

    /// The OS error behind this failure, if there is one
    #[must_use]
    pub fn os_error(&self) -> Option<&io::Error> {
        match self {
            Self::Reserve { source, .. }
            | Self::Commit { source, .. }
            | Self::Decommit { source, .. }
            | Self::Release { source, .. } => Some(source),
            Self::OutOfRange { .. } | Self::InvalidSize { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_message() {
        let error = SystemError::out_of_range(4096, 8192, 8192);
        assert_eq!(
            error.to_string(),
            "range 4096..12288 is outside the 8192-byte region"
        );
        assert_eq!(error.code(), "SYS:VM:RANGE");
        assert!(error.os_error().is_none());
    }

    #[test]
    fn test_os_error_is_exposed() {
        let error = SystemError::Reserve {
            size: 1024,
            source: io::Error::from(io::ErrorKind::OutOfMemory),
        };
        assert_eq!(error.code(), "SYS:VM:RESERVE");
        assert_eq!(
            error.os_error().map(io::Error::kind),
            Some(io::ErrorKind::OutOfMemory)
        );
        assert!(error.to_string().contains("1024"));
    }
}
