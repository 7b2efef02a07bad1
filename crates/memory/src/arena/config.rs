//! Arena creation parameters

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use arenakit_system::{GB, KB, MB};

use super::ARENA_HEADER_SIZE;
use crate::error::{MemoryError, MemoryResult};

/// Longest arena name, in bytes, that fits after the header
pub const MAX_NAME_LEN: usize = 256;

/// Default address space reserved per arena
pub const DEFAULT_RESERVE_SIZE: usize = 64 * MB;

/// Default commit increment
pub const DEFAULT_COMMIT_SIZE: usize = 64 * KB;

/// Arena configuration builder
///
/// Both sizes are rounded up to the page size when the arena is created.
///
/// # Examples
///
/// ```
/// use arenakit_memory::arena::ArenaConfig;
///
/// let config = ArenaConfig::default()
///     .with_reserve_size(1024 * 1024)
///     .with_name("Test");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ArenaConfig {
    /// Address space reserved up front; the arena never grows past it
    pub reserve_size: usize,
    /// Granularity of physical commits as the cursor advances
    pub commit_size: usize,
    /// Optional name, stored inline in the arena's own memory
    pub name: Option<String>,
}

impl ArenaConfig {
    /// Creates new config with default values (64 MiB reserve, 64 KiB commits)
    pub fn new() -> Self {
        Self {
            reserve_size: DEFAULT_RESERVE_SIZE,
            commit_size: DEFAULT_COMMIT_SIZE,
            name: None,
        }
    }

    /// Small scratch arenas: 1 MiB reserve, 64 KiB commits
    pub fn small() -> Self {
        Self {
            reserve_size: MB,
            commit_size: 64 * KB,
            name: None,
        }
    }

    /// Large long-lived arenas: 1 GiB reserve, 1 MiB commits
    pub fn large() -> Self {
        Self {
            reserve_size: GB,
            commit_size: MB,
            name: None,
        }
    }

    /// Sizing for an arena that backs `count` elements of `T`
    ///
    /// Commits `growth` elements at a time. The reservation includes room for
    /// the header, the longest name and alignment padding, so at least `count`
    /// elements always fit.
    pub fn for_elements<T>(count: usize, growth: usize) -> Self {
        let elem = size_of::<T>().max(1);
        let overhead = ARENA_HEADER_SIZE + MAX_NAME_LEN + align_of::<T>().max(8);
        Self {
            reserve_size: count.saturating_mul(elem).saturating_add(overhead),
            commit_size: growth.max(1).saturating_mul(elem),
            name: None,
        }
    }

    /// Sets the reserved address space
    #[must_use = "builder methods must be chained or built"]
    pub fn with_reserve_size(mut self, size: usize) -> Self {
        self.reserve_size = size;
        self
    }

    /// Sets the commit increment
    #[must_use = "builder methods must be chained or built"]
    pub fn with_commit_size(mut self, size: usize) -> Self {
        self.commit_size = size;
        self
    }

    /// Sets the arena name
    #[must_use = "builder methods must be chained or built"]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> MemoryResult<()> {
        if self.reserve_size == 0 {
            return Err(MemoryError::invalid_config(
                "Reserve size must be greater than 0",
            ));
        }

        if self.commit_size == 0 {
            return Err(MemoryError::invalid_config(
                "Commit size must be greater than 0",
            ));
        }

        let name_len = self.name.as_deref().map_or(0, str::len);
        if name_len > MAX_NAME_LEN {
            return Err(MemoryError::invalid_config(format!(
                "Arena name is {name_len} bytes, the limit is {MAX_NAME_LEN}"
            )));
        }

        if ARENA_HEADER_SIZE + name_len > self.reserve_size {
            return Err(MemoryError::invalid_config(
                "Reserve size must hold the arena header and name",
            ));
        }

        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new()
    }
}
