//! Producer/consumer directory walker.
//!
//! ```text
//! discovery thread: walkdir (pre-order, sorted, no symlink dirs)
//! │   add_dir + send every directory
//! ▼
//! unbounded channel
//! │   recv with a 1s timeout
//! ▼
//! caller thread: list regular files, sorted → file() … finished_dir()
//! ```
//!
//! Errors are reported through [`FileObserver::fail`] and never stop the walk.

use super::FileObserver;
use crate::error::DedupError;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, trace};
use walkdir::WalkDir;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ResilientWalker {
    poll_interval: Duration,
}

impl Default for ResilientWalker {
    fn default() -> Self {
        Self::new()
    }
}

impl ResilientWalker {
    pub fn new() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Walk `root`, blocking until every discovered directory was processed.
    pub fn walk(&self, root: &Path, observer: &dyn FileObserver) {
        let (tx, rx) = unbounded::<PathBuf>();
        let finished = AtomicBool::new(false);

        thread::scope(|scope| {
            let finished = &finished;
            scope.spawn(move || {
                discover(root, &tx, observer);
                observer.scan_finished();
                finished.store(true, Ordering::Release);
                drop(tx);
            });

            self.consume(&rx, finished, observer);
        });

        observer.close();
    }

    fn consume(&self, rx: &Receiver<PathBuf>, finished: &AtomicBool, observer: &dyn FileObserver) {
        loop {
            match rx.recv_timeout(self.poll_interval) {
                Ok(dir) => process_dir(&dir, observer),
                Err(RecvTimeoutError::Timeout) => {
                    trace!(
                        finished = finished.load(Ordering::Acquire),
                        "Waiting for directories"
                    );
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }
}

fn discover(root: &Path, tx: &Sender<PathBuf>, observer: &dyn FileObserver) {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.file_type().is_dir());

    for entry in walker {
        match entry {
            Ok(entry) => {
                let dir = entry.into_path();
                observer.add_dir(&dir);
                if tx.send(dir).is_err() {
                    debug!("Directory queue closed, stopping discovery");
                    return;
                }
            }
            Err(e) => {
                let path = e.path().map(Path::to_path_buf);
                observer.fail(path.as_deref(), &DedupError::Io(e.into()));
            }
        }
    }
}

fn process_dir(dir: &Path, observer: &dyn FileObserver) {
    match list_files(dir) {
        Ok(files) => {
            for file in files {
                observer.file(&file);
            }
        }
        Err(e) => observer.fail(Some(dir), &DedupError::Io(e)),
    }
    observer.finished_dir(dir);
}

/// Regular, non-symlink files of `dir` in name order.
fn list_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
