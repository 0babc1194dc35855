//! Incremental repo update: walk the tree, hash what changed, tombstone what
//! disappeared.

pub mod eta;
pub mod observer;

pub use eta::{Clock, EtaPredictor, SystemClock};
pub use observer::{UpdateObserver, UpdateProgress};

use crate::config::DedupConfig;
use crate::error::{DedupError, Result};
use crate::hasher::{Blake3Hasher, FileHasher};
use crate::index::{LoadStats, RepoManager};
use crate::metadata::{ExtensionMimeProvider, MetadataProvider};
use crate::types::Repo;
use crate::walker::ResilientWalker;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Outcome of one update run.
#[derive(Debug, Clone, Default)]
pub struct UpdateSummary {
    pub load: LoadStats,
    pub files: u64,
    pub dirs: u64,
    pub hashed: u64,
    pub unchanged: u64,
    /// Paths tombstoned because the walk did not see them.
    pub deleted: u64,
    pub errors: u64,
    pub first_error: Option<String>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct UpdateOptions {
    pub hash_threads: usize,
    pub eta_window: usize,
    pub shutdown_timeout: Duration,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self::from_config(&DedupConfig::default())
    }
}

impl UpdateOptions {
    pub fn from_config(config: &DedupConfig) -> Self {
        UpdateOptions {
            hash_threads: config.hash_threads.max(1),
            eta_window: config.eta_window.max(1),
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
        }
    }
}

/// Runs updates of whole repos.
///
/// `update` blocks on its own runtime and must not be called from inside an
/// async context.
pub struct RepoUpdater {
    options: UpdateOptions,
    hasher: Arc<dyn FileHasher>,
    metadata: Arc<dyn MetadataProvider>,
}

impl RepoUpdater {
    pub fn new(options: UpdateOptions) -> Self {
        let hasher = Arc::new(Blake3Hasher::new(options.hash_threads));
        RepoUpdater {
            options,
            hasher,
            metadata: Arc::new(ExtensionMimeProvider),
        }
    }

    pub fn with_hasher(mut self, hasher: Arc<dyn FileHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_metadata(mut self, metadata: Arc<dyn MetadataProvider>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn update(&self, repo: &Repo, index_dir: impl Into<PathBuf>) -> Result<UpdateSummary> {
        let started = Instant::now();
        let root = repo.absolute_path.clone();
        if !root.is_dir() {
            return Err(DedupError::UpdateRepo(format!(
                "Repo root {} does not exist",
                root.display()
            )));
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.options.hash_threads)
            .thread_name("dedup-hash")
            .enable_all()
            .build()?;

        let mut manager = RepoManager::new(repo.clone(), index_dir);
        let load = manager.load()?;
        let manager = Arc::new(manager);

        info!(repo = %repo.name, root = %root.display(), "Updating repo");
        let observer = UpdateObserver::new(
            Arc::clone(&manager),
            Arc::clone(&self.hasher),
            Arc::clone(&self.metadata),
            runtime.handle().clone(),
            EtaPredictor::new(self.options.eta_window),
        );
        ResilientWalker::new().walk(&root, &observer);

        let progress = observer.progress();
        if progress.errors > 0 && progress.dirs_finished <= 1 && progress.files == 0 {
            manager.close()?;
            runtime.shutdown_timeout(self.options.shutdown_timeout);
            return Err(DedupError::UpdateRepo(format!(
                "Walking {} failed: {}",
                root.display(),
                progress.first_error.unwrap_or_default()
            )));
        }

        let mut summary = UpdateSummary {
            load,
            files: progress.files,
            dirs: progress.dirs_finished,
            hashed: progress.hashed,
            unchanged: progress.unchanged,
            errors: progress.errors,
            first_error: progress.first_error,
            ..Default::default()
        };

        for record in observer.take_remaining() {
            let path = record.relative_path.clone();
            match manager.add_repo_file(record.with_missing(true)) {
                Ok(()) => summary.deleted += 1,
                Err(e) => {
                    warn!("Failed to tombstone {}: {}", path, e);
                    summary.errors += 1;
                    summary.first_error.get_or_insert_with(|| e.to_string());
                }
            }
        }

        manager.close()?;
        runtime.shutdown_timeout(self.options.shutdown_timeout);

        summary.elapsed = started.elapsed();
        info!(
            repo = %repo.name,
            files = summary.files,
            hashed = summary.hashed,
            unchanged = summary.unchanged,
            deleted = summary.deleted,
            errors = summary.errors,
            "Update finished in {:?}",
            summary.elapsed
        );
        Ok(summary)
    }
}
