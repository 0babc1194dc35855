//! A single shard: one append-only log plus its in-memory live view.

use crate::codec::{FrameReader, FrameWriter};
use crate::error::{DedupError, Result};
use crate::index::hash_index::HashIndex;
use crate::index::stats::LoadStats;
use crate::types::{Codec, Record};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

pub struct Shard {
    path: PathBuf,
    codec: Codec,
    compressed: bool,
    live: HashMap<String, Record>,
    by_hash: HashIndex,
    writer: Option<FrameWriter>,
}

impl Shard {
    pub fn new(path: impl Into<PathBuf>, codec: Codec, compressed: bool) -> Self {
        Shard {
            path: path.into(),
            codec,
            compressed,
            live: HashMap::new(),
            by_hash: HashIndex::new(),
            writer: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replay the log into the live view.
    ///
    /// The file is created when absent. Undecodable frames are skipped; if any
    /// were found the log is moved to `<file>.bak` and rewritten from the live
    /// view.
    pub fn load(&mut self) -> Result<LoadStats> {
        let started = Instant::now();
        let _span = tracing::debug_span!("shard_load", path = %self.path.display()).entered();

        self.close()?;
        self.live.clear();
        self.by_hash.clear();
        self.ensure_file()?;

        let mut stats = LoadStats::default();
        let codec = self.codec.record_codec();
        let mut reader = FrameReader::open(&self.path, self.codec.framing(), self.compressed)
            .map_err(|e| DedupError::load(&self.path, e))?;

        loop {
            let frame = match reader.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData
                    ) =>
                {
                    warn!("Truncated tail in {}: {}", self.path.display(), e);
                    stats.lines += 1;
                    stats.corrupt += 1;
                    break;
                }
                Err(e) => return Err(DedupError::load(&self.path, e)),
            };
            stats.lines += 1;

            match codec.decode(&frame) {
                Ok(record) if has_identity(&record) => {
                    if self.apply(record) {
                        stats.changes += 1;
                    }
                }
                Ok(record) => {
                    warn!(
                        "Skipping record without hash in {}: {}",
                        self.path.display(),
                        record.relative_path
                    );
                    stats.corrupt += 1;
                }
                Err(e) => {
                    warn!(
                        "Skipping corrupt frame {} in {}: {}",
                        stats.lines,
                        self.path.display(),
                        e
                    );
                    stats.corrupt += 1;
                }
            }
        }

        if stats.corrupt > 0 {
            self.repair()?;
        }

        self.fill_counts(&mut stats);
        stats.elapsed = started.elapsed();
        debug!(
            lines = stats.lines,
            files = stats.files,
            missing = stats.missing,
            corrupt = stats.corrupt,
            "Shard loaded"
        );
        Ok(stats)
    }

    fn ensure_file(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DedupError::load(parent, e))?;
        }
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map(|_| ())
            .map_err(|e| DedupError::load(&self.path, e))
    }

    /// Fold a record into the live view. Returns true when it superseded a
    /// different record for the same path.
    fn apply(&mut self, record: Record) -> bool {
        self.by_hash.insert(&record.hash, &record.relative_path);
        match self.live.insert(record.relative_path.clone(), record) {
            Some(previous) => self.live.get(&previous.relative_path) != Some(&previous),
            None => false,
        }
    }

    fn repair(&mut self) -> Result<()> {
        let backup = backup_path(&self.path);
        warn!(
            "Rewriting {} from {} live records, original kept at {}",
            self.path.display(),
            self.live.len(),
            backup.display()
        );
        std::fs::rename(&self.path, &backup).map_err(|e| DedupError::write(&backup, e))?;
        self.rewrite()
    }

    /// Replace the log with one frame per live record.
    fn rewrite(&self) -> Result<()> {
        let codec = self.codec.record_codec();
        let mut writer = FrameWriter::create(&self.path, self.codec.framing(), self.compressed)
            .map_err(|e| DedupError::write(&self.path, e))?;
        for record in self.stream() {
            let payload = codec
                .encode(&record)
                .map_err(|e| {
                    DedupError::write(&self.path, io::Error::new(io::ErrorKind::InvalidData, e))
                })?;
            writer
                .write_frame(&payload)
                .map_err(|e| DedupError::write(&self.path, e))?;
        }
        writer.finish().map_err(|e| DedupError::write(&self.path, e))
    }

    fn fill_counts(&self, stats: &mut LoadStats) {
        stats.files = self.live.values().filter(|r| r.is_live()).count() as u64;
        stats.missing = self.live.len() as u64 - stats.files;
        stats.duplicates = self
            .by_hash
            .iter()
            .map(|(_, paths)| {
                let live = paths
                    .iter()
                    .filter(|p| self.live.get(*p).is_some_and(Record::is_live))
                    .count() as u64;
                live.saturating_sub(1)
            })
            .sum();
    }

    /// Append one record. The live view changes only after the frame is
    /// written and flushed.
    pub fn add(&mut self, record: Record) -> Result<()> {
        let payload = self
            .codec
            .record_codec()
            .encode(&record)
            .map_err(|e| {
                DedupError::write(&self.path, io::Error::new(io::ErrorKind::InvalidData, e))
            })?;

        if self.writer.is_none() {
            let writer = FrameWriter::append(&self.path, self.codec.framing(), self.compressed)
                .map_err(|e| DedupError::write(&self.path, e))?;
            self.writer = Some(writer);
        }
        let written = match self.writer.as_mut() {
            Some(writer) => writer.write_frame(&payload).and_then(|_| writer.flush()),
            None => Ok(()),
        };
        if let Err(e) = written {
            self.discard_writer();
            return Err(DedupError::write(&self.path, e));
        }

        self.apply(record);
        Ok(())
    }

    /// Drop a failed append session so no partial frame reaches the log.
    fn discard_writer(&mut self) {
        let Some(writer) = self.writer.take() else {
            return;
        };
        let restored = match writer.abandon() {
            Ok(restored) => restored,
            Err(e) => {
                warn!("Failed to truncate {}: {}", self.path.display(), e);
                false
            }
        };
        if !restored {
            if let Err(e) = self.rewrite() {
                warn!("Failed to rewrite {}: {}", self.path.display(), e);
            }
        }
    }

    /// Release the append writer. Returns whether one was open.
    pub fn close(&mut self) -> Result<bool> {
        match self.writer.take() {
            Some(writer) => {
                writer.finish().map_err(|e| DedupError::close(&self.path, e))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn get_by_hash(&self, hash: &str) -> Vec<Record> {
        self.by_hash
            .paths_for(hash)
            .filter_map(|path| self.live.get(path))
            .cloned()
            .collect()
    }

    pub fn get_by_path(&self, relative_path: &str) -> Option<Record> {
        self.live.get(relative_path).cloned()
    }

    /// Snapshot of every live record, ordered by path.
    pub fn stream(&self) -> Vec<Record> {
        let mut records: Vec<Record> = self.live.values().cloned().collect();
        records.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        records
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

impl Drop for Shard {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close shard on drop: {}", e);
        }
    }
}

/// Every record needs a hash, except empty files whose inline hash is "".
fn has_identity(record: &Record) -> bool {
    !record.hash.is_empty() || record.size == 0
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}
