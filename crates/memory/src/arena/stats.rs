//! Statistics tracking for arena allocators

use std::fmt;

use arenakit_system::utils::format_bytes;

/// Snapshot of arena activity
///
/// Counters accumulate over the arena's lifetime; `position` and
/// `committed_bytes` describe the arena at the moment of the snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Successful pushes
    pub pushes: u64,
    /// Pushes rejected because the reservation was exhausted
    pub failed_pushes: u64,
    /// Times the committed range had to grow
    pub commits: u64,
    /// Bytes currently backed by physical memory
    pub committed_bytes: usize,
    /// Bytes of address space reserved
    pub reserved_bytes: usize,
    /// Current cursor position
    pub position: usize,
    /// Highest cursor position ever reached
    pub high_water: usize,
}

impl ArenaStats {
    /// Fraction of the reservation in use (0.0 - 1.0)
    pub fn utilization(&self) -> f64 {
        if self.reserved_bytes == 0 {
            return 0.0;
        }
        self.position as f64 / self.reserved_bytes as f64
    }

    /// Fraction of committed memory the cursor has covered (0.0 - 1.0)
    pub fn commit_efficiency(&self) -> f64 {
        if self.committed_bytes == 0 {
            return 0.0;
        }
        self.position as f64 / self.committed_bytes as f64
    }

    pub(crate) fn record_push(&mut self, position: usize) {
        self.pushes += 1;
        self.high_water = self.high_water.max(position);
    }
}

impl fmt::Display for ArenaStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Arena Statistics:")?;
        writeln!(
            f,
            "  Position: {} / {} reserved ({:.1}%)",
            format_bytes(self.position),
            format_bytes(self.reserved_bytes),
            self.utilization() * 100.0
        )?;
        writeln!(f, "  Committed: {}", format_bytes(self.committed_bytes))?;
        writeln!(f, "  High water: {}", format_bytes(self.high_water))?;
        writeln!(
            f,
            "  Pushes: {} ({} failed), commits: {}",
            self.pushes, self.failed_pushes, self.commits
        )
    }
}
