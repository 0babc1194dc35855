//! Repo manager: owns the shards of one repo and decides, per file, whether
//! the index needs a new record.

use crate::error::{DedupError, Result};
use crate::hasher::{inline_hash, FileHasher, INLINE_HASH_LIMIT};
use crate::index::shard::Shard;
use crate::index::stats::{LoadStats, RepoStats};
use crate::metadata::MetadataProvider;
use crate::types::{Record, Repo};
use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tracing::{debug, info, warn};

pub struct RepoManager {
    repo: Repo,
    index_dir: PathBuf,
    shards: Vec<Arc<Mutex<Shard>>>,
}

/// Result of the synchronous part of [`RepoManager::add_path`].
enum Change {
    Done(Option<Record>),
    NeedsHash(PendingRecord),
}

/// A record waiting for its content hash.
struct PendingRecord {
    path: PathBuf,
    record: Record,
    shard: Arc<Mutex<Shard>>,
    /// Live record for the same path left behind in another shard after a
    /// size change; tombstoned once the new record is written.
    stale: Option<(Arc<Mutex<Shard>>, Record)>,
}

impl PendingRecord {
    fn commit(self, hash: String) -> Result<Option<Record>> {
        let mut record = self.record;
        record.hash = hash;
        self.shard.lock().add(record.clone())?;
        if let Some((shard, old)) = self.stale {
            shard.lock().add(old.with_missing(true))?;
        }
        Ok(Some(record))
    }
}

impl RepoManager {
    pub fn new(repo: Repo, index_dir: impl Into<PathBuf>) -> Self {
        RepoManager {
            repo,
            index_dir: index_dir.into(),
            shards: Vec::new(),
        }
    }

    pub fn repo(&self) -> &Repo {
        &self.repo
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    pub fn shard_path(&self, index: usize) -> PathBuf {
        self.index_dir.join(format!("{}.idx", index))
    }

    pub fn is_loaded(&self) -> bool {
        !self.shards.is_empty()
    }

    /// (Re)load every shard, creating missing shard files. Any shard failure
    /// aborts the whole load.
    pub fn load(&mut self) -> Result<LoadStats> {
        self.close()?;
        self.shards.clear();

        let count = self.repo.shard_count.max(1) as usize;
        let mut total = LoadStats::default();
        let mut shards = Vec::with_capacity(count);
        for index in 0..count {
            let mut shard =
                Shard::new(self.shard_path(index), self.repo.codec, self.repo.compressed);
            let stats = shard.load()?;
            total.merge(&stats);
            shards.push(Arc::new(Mutex::new(shard)));
        }
        self.shards = shards;

        info!(
            repo = %self.repo.name,
            files = total.files,
            missing = total.missing,
            duplicates = total.duplicates,
            corrupt = total.corrupt,
            "Loaded repo index in {:?}",
            total.elapsed
        );
        Ok(total)
    }

    fn shard_for(&self, size: u64) -> Result<&Arc<Mutex<Shard>>> {
        self.shards
            .get(self.repo.shard_for(size))
            .ok_or_else(|| DedupError::OpenRepo(format!("Repo {} is not loaded", self.repo.name)))
    }

    /// Path of `path` relative to the repo root, `/` separated.
    pub fn relative_path(&self, path: &Path) -> Result<String> {
        let relative = path.strip_prefix(&self.repo.absolute_path).map_err(|_| {
            DedupError::UpdateRepo(format!(
                "{} is outside repo root {}",
                path.display(),
                self.repo.absolute_path.display()
            ))
        })?;
        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        Ok(parts.join("/"))
    }

    /// Bring the index up to date for one file.
    ///
    /// The change decision runs before this returns; only hashing of files of
    /// at least [`INLINE_HASH_LIMIT`] bytes is deferred to the returned future.
    /// Resolves to the written record, or `None` when the file is unchanged or
    /// no longer exists.
    pub fn add_path(
        &self,
        path: &Path,
        hasher: &Arc<dyn FileHasher>,
        metadata: &dyn MetadataProvider,
    ) -> BoxFuture<'static, Result<Option<Record>>> {
        match self.decide(path, metadata) {
            Ok(Change::Done(outcome)) => future::ready(Ok(outcome)).boxed(),
            Ok(Change::NeedsHash(pending)) => {
                let hasher = Arc::clone(hasher);
                async move {
                    let hash = hasher.hash(&pending.path).await?;
                    pending.commit(hash)
                }
                .boxed()
            }
            Err(e) => future::ready(Err(e)).boxed(),
        }
    }

    fn decide(&self, path: &Path, metadata: &dyn MetadataProvider) -> Result<Change> {
        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Skipping vanished file {}", path.display());
                return Ok(Change::Done(None));
            }
            Err(e) => return Err(DedupError::load(path, e)),
        };

        let relative = self.relative_path(path)?;
        let existing = self.get_by_path(&relative);
        let size = meta.len();
        let modified = modified_millis(&meta);

        if let Some(old) = &existing {
            if old.size == size && modified <= old.last_modified {
                if old.is_live() {
                    return Ok(Change::Done(None));
                }
                debug!("File reappeared: {}", relative);
                let revived = old.clone().with_missing(false);
                self.shard_for(size)?.lock().add(revived.clone())?;
                return Ok(Change::Done(Some(revived)));
            }
        }

        let mime_type = metadata.detect(path);
        let mut record =
            Record::new(String::new(), relative, size, modified).with_mime_type(mime_type.clone());
        match metadata.enrich(path, mime_type.as_deref()) {
            Ok(enrichment) => enrichment.apply(&mut record),
            Err(e) => debug!("No enrichment for {}: {}", path.display(), e),
        }

        let moved = |old: &Record| self.repo.shard_for(old.size) != self.repo.shard_for(size);
        let stale = match existing {
            Some(old) if old.is_live() && moved(&old) => {
                Some((Arc::clone(self.shard_for(old.size)?), old))
            }
            _ => None,
        };
        let pending = PendingRecord {
            path: path.to_path_buf(),
            record,
            shard: Arc::clone(self.shard_for(size)?),
            stale,
        };

        if size < INLINE_HASH_LIMIT {
            let bytes = fs::read(path).map_err(|e| DedupError::load(path, e))?;
            return pending.commit(inline_hash(&bytes)).map(Change::Done);
        }
        Ok(Change::NeedsHash(pending))
    }

    /// Append a record as is, bypassing change detection.
    pub fn add_repo_file(&self, record: Record) -> Result<()> {
        self.shard_for(record.size)?.lock().add(record)
    }

    pub fn get_by_hash(&self, hash: &str) -> Vec<Record> {
        self.shards
            .iter()
            .flat_map(|shard| shard.lock().get_by_hash(hash))
            .collect()
    }

    pub fn get_by_hash_and_size(&self, hash: &str, size: u64) -> Vec<Record> {
        match self.shard_for(size) {
            Ok(shard) => shard
                .lock()
                .get_by_hash(hash)
                .into_iter()
                .filter(|r| r.size == size)
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Current record for a path across all shards: a live record beats
    /// any tombstone, then the newest modification time wins.
    pub fn get_by_path(&self, relative_path: &str) -> Option<Record> {
        self.shards
            .iter()
            .filter_map(|shard| shard.lock().get_by_path(relative_path))
            .max_by_key(|r| (r.is_live(), r.last_modified))
    }

    /// Snapshot of every live record, tombstones included.
    pub fn stream(&self) -> Vec<Record> {
        self.shards
            .iter()
            .flat_map(|shard| shard.lock().stream())
            .collect()
    }

    pub fn stats(&self) -> RepoStats {
        let mut stats = RepoStats::default();
        for record in self.stream() {
            if record.missing {
                stats.missing += 1;
                continue;
            }
            stats.files += 1;
            stats.total_size += record.size;
            let mime = record.mime_type.unwrap_or_else(|| "unknown".to_string());
            *stats.mime_types.entry(mime).or_default() += 1;
        }
        stats
    }

    /// Close every shard. The first failure is returned after all shards
    /// were attempted.
    pub fn close(&self) -> Result<()> {
        let mut first_error = None;
        for shard in &self.shards {
            if let Err(e) = shard.lock().close() {
                warn!("Failed to close shard: {}", e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

pub(crate) fn modified_millis(meta: &fs::Metadata) -> u64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
