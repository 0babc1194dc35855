//! ConfigLoader facade delegating to the merge service.

use super::merge::service::MergeService;
use super::DedupConfig;
use config::ConfigError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the global file and environment.
    pub fn load() -> Result<DedupConfig, ConfigError> {
        MergeService::load()
    }

    /// Load configuration from a specific file with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<DedupConfig, ConfigError> {
        MergeService::load_from_file(path)
    }

    pub fn default() -> DedupConfig {
        DedupConfig::default()
    }
}
