//! Virtual-memory backed stack arena
//!
//! An [`Arena`] reserves a large address range up front and commits pages
//! on demand as its cursor advances. Allocation is a pointer bump; freeing is
//! a rewind of the cursor, either explicit ([`Arena::pop_to`]) or scoped
//! ([`Arena::scope`]).
//!
//! ```
//! use arenakit_memory::arena::{Arena, ArenaConfig};
//!
//! let mut arena = Arena::new(ArenaConfig::small().with_name("frame")).unwrap();
//! let start = arena.marker();
//! let ids = arena.push_array::<u32>(16).unwrap();
//! ids[0] = 7;
//! arena.pop_to_marker(start);
//! assert_eq!(arena.pos(), arena.base_pos());
//! ```

#[allow(clippy::module_inception)]
mod arena;
mod config;
mod scope;
mod stats;
mod typed;

pub use arena::{ARENA_HEADER_SIZE, Arena};
pub use config::{ArenaConfig, DEFAULT_COMMIT_SIZE, DEFAULT_RESERVE_SIZE, MAX_NAME_LEN};
pub use scope::{ArenaMarker, ArenaScope};
pub use stats::ArenaStats;
