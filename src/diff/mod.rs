//! Content-based comparison and one-way sync between two repos.
//!
//! Files are matched by content identity (hash and size) only; paths never
//! take part in matching.

pub mod counters;
pub mod filter;

pub use counters::SyncCounters;
pub use filter::RecordFilter;

use crate::error::{DedupError, Result};
use crate::index::RepoManager;
use crate::types::Record;
use filetime::FileTime;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    /// No live record with the same content in the target.
    New,
    Equal,
    /// The target only holds tombstones for this content.
    DeletedInTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub kind: DiffKind,
    pub record: Record,
}

pub struct DiffEngine<'a> {
    source: &'a RepoManager,
    target: &'a RepoManager,
    filter: RecordFilter,
}

impl<'a> DiffEngine<'a> {
    pub fn new(source: &'a RepoManager, target: &'a RepoManager) -> Self {
        DiffEngine {
            source,
            target,
            filter: RecordFilter::All,
        }
    }

    pub fn with_filter(mut self, filter: RecordFilter) -> Self {
        self.filter = filter;
        self
    }

    fn live_sources(&self) -> impl Iterator<Item = Record> + '_ {
        self.source
            .stream()
            .into_iter()
            .filter(move |r| r.is_live() && self.filter.matches(r))
    }

    pub fn classify(&self, record: &Record) -> DiffKind {
        let matches = self.target.get_by_hash_and_size(&record.hash, record.size);
        if matches.iter().any(Record::is_live) {
            DiffKind::Equal
        } else if matches.is_empty() {
            DiffKind::New
        } else {
            DiffKind::DeletedInTarget
        }
    }

    /// Classify every live source record. `Equal` entries are only returned
    /// when `verbose` is set.
    pub fn print(&self, verbose: bool) -> Vec<DiffEntry> {
        let mut entries = Vec::new();
        for record in self.live_sources() {
            let kind = self.classify(&record);
            match kind {
                DiffKind::Equal if !verbose => continue,
                DiffKind::New => info!("New: {}", record.relative_path),
                DiffKind::Equal => info!("Equal: {}", record.relative_path),
                DiffKind::DeletedInTarget => info!("Deleted in target: {}", record.relative_path),
            }
            entries.push(DiffEntry { kind, record });
        }
        entries
    }

    /// Copy (or move) source files whose content is unknown to the target
    /// into `target_dir`, replacing existing files. Stops at the first
    /// failure.
    pub fn copy(&self, target_dir: &Path, move_files: bool) -> Result<u64> {
        let source_root = &self.source.repo().absolute_path;
        let mut count = 0;
        for record in self.live_sources() {
            if !self
                .target
                .get_by_hash_and_size(&record.hash, record.size)
                .is_empty()
            {
                continue;
            }
            let from = record.path_under(source_root);
            let to = record.path_under(target_dir);
            let result = if move_files {
                move_file(&from, &to)
            } else {
                copy_file(&from, &to)
            };
            result.map_err(|e| DedupError::write(&to, e))?;
            let verb = if move_files { "Moved" } else { "Copied" };
            debug!("{} {} -> {}", verb, from.display(), to.display());
            count += 1;
        }
        Ok(count)
    }

    /// Delete source files whose content is live in the target. Stops at the
    /// first failure.
    pub fn delete(&self) -> Result<u64> {
        let source_root = &self.source.repo().absolute_path;
        let mut count = 0;
        for record in self.live_sources() {
            if self.classify(&record) != DiffKind::Equal {
                continue;
            }
            let path = record.path_under(source_root);
            remove_if_present(&path).map_err(|e| DedupError::write(&path, e))?;
            self.source.add_repo_file(record.with_missing(true))?;
            count += 1;
        }
        Ok(count)
    }

    /// One-way sync from source to target.
    ///
    /// With `copy_new`, content missing from the target is copied to the same
    /// relative path unless that path is occupied. With `delete_missing`,
    /// content tombstoned in the source is removed from the target. Failures
    /// are counted and do not stop the sync.
    pub fn sync(&self, copy_new: bool, delete_missing: bool) -> SyncCounters {
        let mut counters = SyncCounters::default();

        for record in self.source.stream() {
            if !self.filter.matches(&record) {
                continue;
            }
            let live_matches: Vec<Record> = self
                .target
                .get_by_hash_and_size(&record.hash, record.size)
                .into_iter()
                .filter(Record::is_live)
                .collect();

            if record.missing {
                if delete_missing && !live_matches.is_empty() {
                    counters.deleted += 1;
                    for target in live_matches {
                        match self.remove_from_target(&target) {
                            Ok(()) => counters.removed += 1,
                            Err(e) => {
                                warn!("Failed to remove {}: {}", target.relative_path, e);
                                counters.errors += 1;
                            }
                        }
                    }
                }
                continue;
            }

            if !live_matches.is_empty() {
                counters.equal += 1;
                continue;
            }

            counters.new += 1;
            if !copy_new {
                continue;
            }
            match self.copy_to_target(&record) {
                Ok(true) => counters.copied += 1,
                Ok(false) => {
                    debug!("Destination occupied, skipping {}", record.relative_path);
                    counters.skipped += 1;
                }
                Err(e) => {
                    warn!("Failed to copy {}: {}", record.relative_path, e);
                    counters.errors += 1;
                }
            }
        }

        info!("Sync finished: {}", counters);
        counters
    }

    /// Returns false when the destination already exists.
    fn copy_to_target(&self, record: &Record) -> Result<bool> {
        let to = record.path_under(&self.target.repo().absolute_path);
        if fs::symlink_metadata(&to).is_ok() {
            return Ok(false);
        }
        let from = record.path_under(&self.source.repo().absolute_path);
        copy_file(&from, &to).map_err(|e| DedupError::write(&to, e))?;
        self.target.add_repo_file(record.clone().with_missing(false))?;
        Ok(true)
    }

    fn remove_from_target(&self, record: &Record) -> Result<()> {
        let path = record.path_under(&self.target.repo().absolute_path);
        remove_if_present(&path).map_err(|e| DedupError::write(&path, e))?;
        self.target.add_repo_file(record.clone().with_missing(true))
    }
}

/// Copy a file, creating parent directories and keeping its timestamps.
fn copy_file(from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    let meta = fs::metadata(from)?;
    fs::copy(from, to)?;
    filetime::set_file_times(
        to,
        FileTime::from_last_access_time(&meta),
        FileTime::from_last_modification_time(&meta),
    )
}

fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    copy_file(from, to)?;
    fs::remove_file(from)
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
