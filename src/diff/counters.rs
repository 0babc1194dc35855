//! Sync outcome counters.

use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncCounters {
    /// Source files already present in the target.
    pub equal: u64,
    /// Source files without a live match in the target.
    pub new: u64,
    /// Tombstoned source files whose content was removed from the target.
    pub deleted: u64,
    pub copied: u64,
    /// Target files removed.
    pub removed: u64,
    /// New files not copied because the destination path was occupied.
    pub skipped: u64,
    pub errors: u64,
}

impl SyncCounters {
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SyncCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "equal={} new={} deleted={} copied={} removed={} skipped={} errors={}",
            self.equal, self.new, self.deleted, self.copied, self.removed, self.skipped, self.errors
        )
    }
}
