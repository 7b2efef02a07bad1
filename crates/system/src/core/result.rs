//! Result extension traits for system operations

use std::io;

use crate::core::error::{SystemError, SystemResult};

/// Extension trait for [`SystemResult`]
pub trait SystemResultExt<T> {
    /// Log the error (when logging is enabled) and discard it
    ///
    /// Meant for paths that cannot propagate, such as `Drop`.
    fn ok_or_log(self, operation: &'static str) -> Option<T>;

    /// Kind of the underlying OS error, if the failure came from the OS
    fn os_error_kind(&self) -> Option<io::ErrorKind>;
}

impl<T> SystemResultExt<T> for SystemResult<T> {
    fn ok_or_log(self, operation: &'static str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(_error) => {
                #[cfg(feature = "logging")]
                tracing::warn!(
                    operation,
                    code = _error.code(),
                    error = %_error,
                    "virtual memory operation failed"
                );
                None
            }
        }
    }

    fn os_error_kind(&self) -> Option<io::ErrorKind> {
        self.as_ref()
            .err()
            .and_then(SystemError::os_error)
            .map(io::Error::kind)
    }
}

/// Lift an OS call result into a [`SystemResult`]
pub(crate) trait IoResultExt<T> {
    fn or_system(self, f: impl FnOnce(io::Error) -> SystemError) -> SystemResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    #[inline]
    fn or_system(self, f: impl FnOnce(io::Error) -> SystemError) -> SystemResult<T> {
        self.map_err(f)
    }
}
