//! Walk observer that brings a repo index up to date.

use crate::error::DedupError;
use crate::hasher::FileHasher;
use crate::index::RepoManager;
use crate::metadata::MetadataProvider;
use crate::types::Record;
use crate::update::eta::EtaPredictor;
use crate::walker::FileObserver;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinSet};
use tracing::{info, warn};

const REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Counter snapshot of a running update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateProgress {
    pub files: u64,
    pub dirs_found: u64,
    pub dirs_finished: u64,
    pub hashed: u64,
    pub unchanged: u64,
    pub errors: u64,
    pub first_error: Option<String>,
    pub eta: Option<Duration>,
}

#[derive(Default)]
struct Counters {
    files: AtomicU64,
    dirs_found: AtomicU64,
    dirs_finished: AtomicU64,
    hashed: AtomicU64,
    unchanged: AtomicU64,
    errors: AtomicU64,
    first_error: Mutex<Option<String>>,
}

impl Counters {
    fn record_error(&self, context: &str, error: &DedupError) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        warn!("{}: {}", context, error);
        let mut first = self.first_error.lock();
        if first.is_none() {
            *first = Some(format!("{}: {}", context, error));
        }
    }
}

/// Dispatches every observed file to [`RepoManager::add_path`] on the
/// hashing runtime and tracks which previously indexed paths were seen.
pub struct UpdateObserver {
    manager: Arc<RepoManager>,
    hasher: Arc<dyn FileHasher>,
    metadata: Arc<dyn MetadataProvider>,
    runtime: Handle,
    remaining: Mutex<HashMap<String, Record>>,
    counters: Arc<Counters>,
    eta: Arc<Mutex<EtaPredictor>>,
    /// In-flight work; finished tasks are reaped as new ones are spawned.
    pending: Mutex<JoinSet<()>>,
    scan_finished: AtomicBool,
    started: Instant,
    last_report: Mutex<Instant>,
}

impl UpdateObserver {
    pub fn new(
        manager: Arc<RepoManager>,
        hasher: Arc<dyn FileHasher>,
        metadata: Arc<dyn MetadataProvider>,
        runtime: Handle,
        eta: EtaPredictor,
    ) -> Self {
        let remaining = manager
            .stream()
            .into_iter()
            .filter(Record::is_live)
            .map(|r| (r.relative_path.clone(), r))
            .collect();
        let started = eta.now();
        UpdateObserver {
            manager,
            hasher,
            metadata,
            runtime,
            remaining: Mutex::new(remaining),
            counters: Arc::new(Counters::default()),
            eta: Arc::new(Mutex::new(eta)),
            pending: Mutex::new(JoinSet::new()),
            scan_finished: AtomicBool::new(false),
            started,
            last_report: Mutex::new(started),
        }
    }

    /// Previously indexed paths not observed so far.
    pub fn take_remaining(&self) -> Vec<Record> {
        let mut records: Vec<Record> = self.remaining.lock().drain().map(|(_, r)| r).collect();
        records.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        records
    }

    pub fn progress(&self) -> UpdateProgress {
        let c = &self.counters;
        let hashed = c.hashed.load(Ordering::Relaxed);
        let unchanged = c.unchanged.load(Ordering::Relaxed);
        let errors = c.errors.load(Ordering::Relaxed);
        let files = c.files.load(Ordering::Relaxed);
        let processed = hashed + unchanged;
        let outstanding = files.saturating_sub(processed);
        UpdateProgress {
            files,
            dirs_found: c.dirs_found.load(Ordering::Relaxed),
            dirs_finished: c.dirs_finished.load(Ordering::Relaxed),
            hashed,
            unchanged,
            errors,
            first_error: c.first_error.lock().clone(),
            eta: self.eta.lock().estimate(
                self.started,
                processed,
                outstanding,
                self.scan_finished.load(Ordering::Acquire),
            ),
        }
    }

    fn reap(&self, joined: std::result::Result<(), JoinError>) {
        if let Err(e) = joined {
            self.counters
                .record_error("hash task", &DedupError::General(e.to_string()));
        }
    }

    /// Tasks spawned and not yet reaped.
    pub fn in_flight(&self) -> usize {
        self.pending.lock().len()
    }

    fn maybe_report(&self) {
        let now = Instant::now();
        {
            let mut last = self.last_report.lock();
            if now.duration_since(*last) < REPORT_INTERVAL {
                return;
            }
            *last = now;
        }
        let p = self.progress();
        let finish_at = p
            .eta
            .and_then(|eta| chrono::Duration::from_std(eta).ok())
            .map(|eta| (chrono::Local::now() + eta).format("%H:%M:%S").to_string());
        info!(
            files = p.files,
            dirs = p.dirs_finished,
            dirs_found = p.dirs_found,
            hashed = p.hashed,
            unchanged = p.unchanged,
            errors = p.errors,
            eta_secs = p.eta.map(|d| d.as_secs()),
            finish_at = finish_at.as_deref(),
            "Update progress"
        );
    }
}

impl FileObserver for UpdateObserver {
    fn file(&self, path: &Path) {
        self.counters.files.fetch_add(1, Ordering::Relaxed);
        if let Ok(relative) = self.manager.relative_path(path) {
            self.remaining.lock().remove(&relative);
        }

        let work = self
            .manager
            .add_path(path, &self.hasher, self.metadata.as_ref());
        let counters = Arc::clone(&self.counters);
        let eta = Arc::clone(&self.eta);
        let display = path.display().to_string();
        let task = async move {
            match work.await {
                Ok(Some(_)) => {
                    counters.hashed.fetch_add(1, Ordering::Relaxed);
                }
                Ok(None) => {
                    counters.unchanged.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => counters.record_error(&display, &e),
            }
            eta.lock().trigger();
        };

        let mut pending = self.pending.lock();
        pending.spawn_on(task, &self.runtime);
        while let Some(joined) = pending.try_join_next() {
            self.reap(joined);
        }
    }

    fn add_dir(&self, _path: &Path) {
        self.counters.dirs_found.fetch_add(1, Ordering::Relaxed);
    }

    fn finished_dir(&self, _path: &Path) {
        self.counters.dirs_finished.fetch_add(1, Ordering::Relaxed);
        self.maybe_report();
    }

    fn fail(&self, path: Option<&Path>, error: &DedupError) {
        let context = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "walk".to_string());
        self.counters.record_error(&context, error);
    }

    fn scan_finished(&self) {
        self.scan_finished.store(true, Ordering::Release);
    }

    /// Wait for every outstanding hashing task.
    fn close(&self) {
        let mut pending = std::mem::take(&mut *self.pending.lock());
        self.runtime.block_on(async {
            while let Some(joined) = pending.join_next().await {
                self.reap(joined);
            }
        });
    }
}
