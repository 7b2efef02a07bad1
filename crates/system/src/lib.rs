#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![allow(unsafe_code)] // Virtual memory management is FFI all the way down
//! # arenakit-system
//!
//! Thin, cross-platform wrapper over the operating system's virtual memory
//! primitives. This is the only crate in the workspace that talks to the OS.
//!
//! It provides:
//! - Page size query
//! - Address-space reservation without physical backing
//! - Commit / decommit of pages inside a reservation
//! - Release of a whole reservation
//! - Immediate process abort for fail-fast callers
//! - [`VirtualRegion`], an owning handle over one reservation
//!
//! ## Example
//!
//! ```no_run
//! use arenakit_system::{VirtualRegion, page_size};
//!
//! fn main() -> arenakit_system::SystemResult<()> {
//!     let region = VirtualRegion::reserve(16 * page_size())?;
//!     region.commit(0, page_size())?;
//!
//!     // SAFETY: the first page was just committed read/write.
//!     unsafe { region.as_ptr().write(0xAB) };
//!
//!     region.release()
//! }
//! ```
pub mod core;
pub mod memory;
pub mod utils;

// Re-exports
pub use core::{SystemError, SystemResult, SystemResultExt};
pub use memory::{
    VirtualRegion, abort, allocation_granularity, commit, decommit, page_size, release, reserve,
};
pub use utils::{GB, KB, MB};
