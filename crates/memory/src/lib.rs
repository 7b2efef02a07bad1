//! # arenakit-memory
//!
//! Arena-first memory management on top of reserved virtual memory.
//!
//! The crate is built around one allocator and four containers:
//! - [`Arena`]: a stack allocator over a reserved range, committing pages
//!   lazily and freeing by rewinding its cursor
//! - [`Vector`]: a contiguous array generic over a [`Storage`] policy, either
//!   a fixed caller-provided buffer ([`StaticStorage`]) or a private growing
//!   arena ([`ArenaStorage`])
//! - [`Queue`]: a FIFO ring buffer over the same storage policies
//! - [`ElementPool`]: a slot pool with an intrusive free list and stable
//!   [`Handle`]s
//! - [`VectorMap`]: a small insertion-ordered map with linear lookup
//!
//! ## Quick Start
//!
//! ```rust
//! use arenakit_memory::prelude::*;
//!
//! fn main() -> MemoryResult<()> {
//!     let arena = Arena::new(ArenaConfig::small().with_name("Scratch"))?;
//!
//!     // Fixed-capacity vector carved from the arena
//!     let mut ids = arena.push_vector::<u32>(4)?;
//!     ids.push(7)?;
//!
//!     // Growable vector backed by its own arena
//!     let mut names = Vector::<&str>::with_capacity(1024)?;
//!     names.push("alpha")?;
//!
//!     // Pool with stable handles
//!     let mut pool = ElementPool::<u64>::with_capacity(64)?;
//!     let handle = pool.create_with(42)?;
//!     assert_eq!(pool[handle], 42);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `logging` (default): structured logging through `tracing`
//! - `serde`: `Serialize` / `Deserialize` for [`ArenaConfig`]

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(unsafe_code)] // Raw storage and arena pointers are the point of this crate
// Storage and arena helpers hand out `&mut` from `&self` by construction
#![allow(clippy::mut_from_ref)]

pub mod arena;
pub mod error;
pub mod map;
pub mod pool;
pub mod queue;
pub mod storage;
pub mod vector;

pub use crate::arena::{Arena, ArenaConfig, ArenaMarker, ArenaScope, ArenaStats};
pub use crate::error::{MemoryError, MemoryResult, MemoryResultExt};
pub use crate::map::{Added, MapPair, VectorMap};
pub use crate::pool::{ElementPool, Handle, Slot, StaticPool};
pub use crate::queue::{Queue, StaticQueue};
pub use crate::storage::{ArenaStorage, StaticStorage, Storage};
pub use crate::vector::{StaticVec, Vector};

pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::arena::{Arena, ArenaConfig, ArenaMarker, ArenaScope, ArenaStats};
    pub use crate::error::{MemoryError, MemoryResult, MemoryResultExt};
    pub use crate::map::{Added, MapPair, VectorMap};
    pub use crate::pool::{ElementPool, Handle, Slot, StaticPool};
    pub use crate::queue::{Queue, StaticQueue};
    pub use crate::storage::{ArenaStorage, StaticStorage, Storage};
    pub use crate::vector::{StaticVec, Vector};
}
