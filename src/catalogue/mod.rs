//! Repo catalogue: where repos are registered and their shard files live.

pub mod yaml;

pub use yaml::YamlCatalogue;

use crate::error::{DedupError, Result};
use crate::index::RepoManager;
use crate::types::{Codec, Repo};
use std::path::{Path, PathBuf};

/// Index layout chosen when a repo is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepoSettings {
    pub shard_count: u32,
    pub codec: Codec,
    pub compressed: bool,
}

impl Default for RepoSettings {
    fn default() -> Self {
        RepoSettings {
            shard_count: 10,
            codec: Codec::Json,
            compressed: false,
        }
    }
}

pub trait RepoCatalogue: Send + Sync {
    /// Directory holding one subdirectory per repo.
    fn repo_dir(&self) -> &Path;

    fn get_repos(&self) -> Result<Vec<Repo>>;

    fn get_repo(&self, name: &str) -> Result<Option<Repo>>;

    /// Register a repo and create its empty shard files. Fails if it exists.
    fn create_repo(&self, name: &str, path: &Path, settings: RepoSettings) -> Result<Repo>;

    fn change_path(&self, name: &str, path: &Path) -> Result<Repo>;

    /// Change codec or compression of a repo whose shards are still empty.
    fn set_repo_config(&self, name: &str, codec: Codec, compressed: bool) -> Result<Repo>;

    fn rename_repo(&self, old_name: &str, new_name: &str) -> Result<Repo>;

    fn delete_repo(&self, name: &str) -> Result<()>;

    fn index_dir(&self, name: &str) -> PathBuf {
        self.repo_dir().join(name)
    }

    /// Manager for a registered repo. Not loaded yet.
    fn open(&self, name: &str) -> Result<RepoManager> {
        let repo = self
            .get_repo(name)?
            .ok_or_else(|| DedupError::OpenRepo(format!("Unknown repo: {}", name)))?;
        Ok(RepoManager::new(repo, self.index_dir(name)))
    }
}
