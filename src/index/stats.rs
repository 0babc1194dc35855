//! Load statistics and repo summaries.

use std::collections::BTreeMap;
use std::time::Duration;

/// Outcome of replaying one or more shard logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Frames read, corrupt ones included.
    pub lines: u64,
    /// Frames that superseded an existing record for the same path.
    pub changes: u64,
    /// Live records that are not tombstones.
    pub files: u64,
    /// Tombstoned records.
    pub missing: u64,
    /// Σ(group size − 1) over non-tombstoned hash groups.
    pub duplicates: u64,
    /// Frames skipped because they could not be decoded.
    pub corrupt: u64,
    pub elapsed: Duration,
}

impl LoadStats {
    pub fn merge(&mut self, other: &LoadStats) {
        self.lines += other.lines;
        self.changes += other.changes;
        self.files += other.files;
        self.missing += other.missing;
        self.duplicates += other.duplicates;
        self.corrupt += other.corrupt;
        self.elapsed += other.elapsed;
    }
}

/// Content summary of a loaded repo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoStats {
    pub files: u64,
    pub missing: u64,
    pub total_size: u64,
    pub mime_types: BTreeMap<String, u64>,
}
