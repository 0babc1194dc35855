//! Directory traversal.

pub mod resilient;

pub use resilient::ResilientWalker;

use crate::error::DedupError;
use std::path::Path;

/// Callbacks fired during a walk. Every method defaults to a no-op.
///
/// `add_dir`, `scan_finished` and directory-level `fail` calls come from the
/// discovery thread; `file`, `finished_dir` and `close` from the thread that
/// called [`ResilientWalker::walk`].
pub trait FileObserver: Send + Sync {
    fn file(&self, _path: &Path) {}

    fn add_dir(&self, _path: &Path) {}

    fn finished_dir(&self, _path: &Path) {}

    fn fail(&self, _path: Option<&Path>, _error: &DedupError) {}

    /// Discovery is complete; called exactly once per walk.
    fn scan_finished(&self) {}

    fn close(&self) {}
}
