//! Standalone error types for arenakit-memory
//!
//! Uses thiserror for clean, idiomatic Rust error definitions.
//!
//! Two classes of failure exist. Running out of room (arena reservation,
//! fixed storage, pool handle space) is reported through [`MemoryError`].
//! Breaking an invariant (rewinding past the cursor, indexing out of range,
//! popping an empty container) panics.

use arenakit_system::{SystemError, abort};
use thiserror::Error;

#[cfg(feature = "logging")]
use tracing::{error, warn};

// ============================================================================
// Main Error Types
// ============================================================================

/// Memory management errors
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum MemoryError {
    // --- Capacity Errors ---
    #[error("Arena '{arena}' exhausted: requested {requested} bytes, available {available}")]
    ArenaExhausted {
        arena: String,
        requested: usize,
        available: usize,
    },

    #[error("Storage full: capacity {capacity} elements")]
    StorageFull { capacity: usize },

    #[error("Element pool exhausted: all {capacity} handles in use")]
    PoolExhausted { capacity: usize },

    // --- Handle Errors ---
    #[error("Invalid handle {handle}: pool has {slots} slots")]
    InvalidHandle { handle: u32, slots: usize },

    #[error("Handle {handle} refers to a slot that is already free")]
    DoubleFree { handle: u32 },

    // --- Layout Errors ---
    #[error("Invalid alignment: {alignment} is not a power of two")]
    InvalidAlignment { alignment: usize },

    #[error("Size overflow during operation: {operation}")]
    SizeOverflow { operation: &'static str },

    // --- Configuration Errors ---
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // --- System Errors ---
    #[error(transparent)]
    System(#[from] SystemError),
}

impl MemoryError {
    /// Whether the error reports running out of capacity
    ///
    /// These are the only errors a caller can recover from by freeing,
    /// popping, or using a larger container.
    #[must_use]
    pub fn is_exhaustion(&self) -> bool {
        matches!(
            self,
            Self::ArenaExhausted { .. } | Self::StorageFull { .. } | Self::PoolExhausted { .. }
        )
    }

    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ArenaExhausted { .. } => "MEM:ARENA:EXHAUSTED",
            Self::StorageFull { .. } => "MEM:STORAGE:FULL",
            Self::PoolExhausted { .. } => "MEM:POOL:EXHAUSTED",
            Self::InvalidHandle { .. } => "MEM:POOL:HANDLE",
            Self::DoubleFree { .. } => "MEM:POOL:DOUBLE_FREE",
            Self::InvalidAlignment { .. } => "MEM:ALLOC:ALIGN",
            Self::SizeOverflow { .. } => "MEM:ALLOC:OVERFLOW",
            Self::InvalidConfig { .. } => "MEM:CONFIG:INVALID",
            Self::System(_) => "MEM:SYSTEM",
        }
    }

    // ============================================================================
    // Convenience Constructors
    // ============================================================================

    /// Create arena exhausted error
    pub fn arena_exhausted(arena: &str, requested: usize, available: usize) -> Self {
        #[cfg(feature = "logging")]
        warn!(arena, requested, available, "arena exhausted");

        Self::ArenaExhausted {
            arena: arena.to_string(),
            requested,
            available,
        }
    }

    /// Create storage full error
    pub fn storage_full(capacity: usize) -> Self {
        #[cfg(feature = "logging")]
        warn!(capacity, "fixed storage full");

        Self::StorageFull { capacity }
    }

    /// Create pool exhausted error
    pub fn pool_exhausted(capacity: usize) -> Self {
        #[cfg(feature = "logging")]
        warn!(capacity, "element pool exhausted");

        Self::PoolExhausted { capacity }
    }

    /// Create invalid handle error
    pub fn invalid_handle(handle: u32, slots: usize) -> Self {
        Self::InvalidHandle { handle, slots }
    }

    /// Create double free error
    pub fn double_free(handle: u32) -> Self {
        Self::DoubleFree { handle }
    }

    /// Create invalid alignment error
    pub fn invalid_alignment(alignment: usize) -> Self {
        Self::InvalidAlignment { alignment }
    }

    /// Create size overflow error
    pub fn size_overflow(operation: &'static str) -> Self {
        Self::SizeOverflow { operation }
    }

    /// Create invalid config error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result type for memory operations
pub type MemoryResult<T> = core::result::Result<T, MemoryError>;

/// Extension trait for [`MemoryResult`]
pub trait MemoryResultExt<T> {
    /// Unwrap the value, or log the error and abort the process
    ///
    /// For callers that treat allocation failure as fatal. Does not unwind.
    fn or_abort(self) -> T;
}

impl<T> MemoryResultExt<T> for MemoryResult<T> {
    fn or_abort(self) -> T {
        match self {
            Ok(value) => value,
            Err(_err) => {
                #[cfg(feature = "logging")]
                error!(code = _err.code(), error = %_err, "fatal memory error, aborting");

                abort()
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
