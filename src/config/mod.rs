//! Configuration
//!
//! Settings are layered: built-in defaults, then the global config file
//! (`$XDG_CONFIG_HOME/dedup/config.toml`), then `DEDUP__*` environment
//! variables.

pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;

pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;

use crate::catalogue::{RepoSettings, YamlCatalogue};
use crate::logging::LoggingConfig;
use crate::types::Codec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Directory holding one subdirectory per repo index.
    #[serde(default = "default_repo_dir")]
    pub repo_dir: PathBuf,

    /// Files hashed concurrently during an update.
    #[serde(default = "default_hash_threads")]
    pub hash_threads: usize,

    /// Completions tracked by the ETA predictor.
    #[serde(default = "default_eta_window")]
    pub eta_window: usize,

    #[serde(default = "default_shard_count")]
    pub default_shard_count: u32,

    #[serde(default)]
    pub default_codec: Codec,

    #[serde(default)]
    pub compressed: bool,

    /// Upper bound on waiting for hashing tasks when an update ends.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_repo_dir() -> PathBuf {
    xdg::data_home()
        .map(|dir| dir.join("dedup").join("repos"))
        .unwrap_or_else(|| PathBuf::from(".dedup").join("repos"))
}

fn default_hash_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn default_eta_window() -> usize {
    crate::update::eta::DEFAULT_WINDOW
}

fn default_shard_count() -> u32 {
    10
}

fn default_shutdown_timeout_secs() -> u64 {
    60
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            repo_dir: default_repo_dir(),
            hash_threads: default_hash_threads(),
            eta_window: default_eta_window(),
            default_shard_count: default_shard_count(),
            default_codec: Codec::default(),
            compressed: false,
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            logging: LoggingConfig::default(),
        }
    }
}

impl DedupConfig {
    /// Layout for newly created repos.
    pub fn repo_settings(&self) -> RepoSettings {
        RepoSettings {
            shard_count: self.default_shard_count.max(1),
            codec: self.default_codec,
            compressed: self.compressed,
        }
    }

    pub fn catalogue(&self) -> YamlCatalogue {
        YamlCatalogue::new(&self.repo_dir)
    }
}
