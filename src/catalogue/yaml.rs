use crate::catalogue::{RepoCatalogue, RepoSettings};
use crate::error::{DedupError, Result};
use crate::types::{Codec, Repo};
use std::fs;
use std::path::{Path, PathBuf};

pub const REPO_FILE: &str = "dedup_repo.yml";

/// Catalogue stored as `<repo_dir>/<name>/dedup_repo.yml`, next to the
/// repo's shard files.
pub struct YamlCatalogue {
    repo_dir: PathBuf,
}

impl YamlCatalogue {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    fn repo_file(&self, name: &str) -> PathBuf {
        self.index_dir(name).join(REPO_FILE)
    }

    fn read_repo(path: &Path) -> std::result::Result<Repo, String> {
        let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
        serde_yaml::from_str(&content).map_err(|e| e.to_string())
    }

    fn write_repo(&self, repo: &Repo) -> std::result::Result<(), String> {
        let yaml = serde_yaml::to_string(repo).map_err(|e| e.to_string())?;
        fs::write(self.repo_file(&repo.name), yaml).map_err(|e| e.to_string())
    }

    fn require(&self, name: &str, err: fn(String) -> DedupError) -> Result<Repo> {
        self.get_repo(name)?
            .ok_or_else(|| err(format!("Repo {} does not exist", name)))
    }

    fn shards_empty(&self, repo: &Repo) -> bool {
        (0..repo.shard_count.max(1)).all(|i| {
            fs::metadata(self.index_dir(&repo.name).join(format!("{}.idx", i)))
                .map(|m| m.len() == 0)
                .unwrap_or(true)
        })
    }
}

fn validate_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(format!("Invalid repo name: {:?}", name));
    }
    Ok(())
}

fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

impl RepoCatalogue for YamlCatalogue {
    fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    fn get_repos(&self) -> Result<Vec<Repo>> {
        if !self.repo_dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.repo_dir).map_err(|e| {
            DedupError::OpenRepo(format!(
                "Failed to read repo directory {}: {}",
                self.repo_dir.display(),
                e
            ))
        })?;

        let mut repos = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(
                        "Failed to read directory entry in {}: {}",
                        self.repo_dir.display(),
                        e
                    );
                    continue;
                }
            };
            let file = entry.path().join(REPO_FILE);
            if !file.is_file() {
                continue;
            }
            match Self::read_repo(&file) {
                Ok(repo) => repos.push(repo),
                Err(e) => tracing::error!("Failed to parse repo config {}: {}", file.display(), e),
            }
        }
        repos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(repos)
    }

    fn get_repo(&self, name: &str) -> Result<Option<Repo>> {
        let file = self.repo_file(name);
        if !file.is_file() {
            return Ok(None);
        }
        Self::read_repo(&file)
            .map(Some)
            .map_err(|e| DedupError::OpenRepo(format!("{}: {}", file.display(), e)))
    }

    fn create_repo(&self, name: &str, path: &Path, settings: RepoSettings) -> Result<Repo> {
        validate_name(name).map_err(DedupError::CreateRepo)?;
        if self.repo_file(name).exists() {
            return Err(DedupError::CreateRepo(format!("Repo {} already exists", name)));
        }

        let repo = Repo {
            name: name.to_string(),
            absolute_path: absolute(path)
                .map_err(|e| DedupError::CreateRepo(format!("{}: {}", path.display(), e)))?,
            shard_count: settings.shard_count.max(1),
            codec: settings.codec,
            compressed: settings.compressed,
        };

        let dir = self.index_dir(name);
        fs::create_dir_all(&dir)
            .map_err(|e| DedupError::CreateRepo(format!("{}: {}", dir.display(), e)))?;
        for i in 0..repo.shard_count {
            let shard = dir.join(format!("{}.idx", i));
            fs::File::create(&shard)
                .map_err(|e| DedupError::CreateRepo(format!("{}: {}", shard.display(), e)))?;
        }
        self.write_repo(&repo).map_err(DedupError::CreateRepo)?;

        tracing::info!(repo = name, shards = repo.shard_count, "Created repo");
        Ok(repo)
    }

    fn change_path(&self, name: &str, path: &Path) -> Result<Repo> {
        let mut repo = self.require(name, DedupError::ModifyRepo)?;
        repo.absolute_path = absolute(path)
            .map_err(|e| DedupError::ModifyRepo(format!("{}: {}", path.display(), e)))?;
        self.write_repo(&repo).map_err(DedupError::ModifyRepo)?;
        Ok(repo)
    }

    fn set_repo_config(&self, name: &str, codec: Codec, compressed: bool) -> Result<Repo> {
        let mut repo = self.require(name, DedupError::ModifyRepo)?;
        if repo.codec == codec && repo.compressed == compressed {
            return Ok(repo);
        }
        if !self.shards_empty(&repo) {
            return Err(DedupError::ModifyRepo(format!(
                "Repo {} already has records; prune it with the new codec instead",
                name
            )));
        }
        repo.codec = codec;
        repo.compressed = compressed;
        self.write_repo(&repo).map_err(DedupError::ModifyRepo)?;
        Ok(repo)
    }

    fn rename_repo(&self, old_name: &str, new_name: &str) -> Result<Repo> {
        validate_name(new_name).map_err(DedupError::RenameRepo)?;
        let mut repo = self.require(old_name, DedupError::RenameRepo)?;
        let target = self.index_dir(new_name);
        if target.exists() {
            return Err(DedupError::RenameRepo(format!(
                "Cannot rename {} to {}: target exists",
                old_name, new_name
            )));
        }

        fs::rename(self.index_dir(old_name), &target)
            .map_err(|e| DedupError::RenameRepo(format!("{} -> {}: {}", old_name, new_name, e)))?;
        repo.name = new_name.to_string();
        self.write_repo(&repo).map_err(DedupError::RenameRepo)?;
        Ok(repo)
    }

    fn delete_repo(&self, name: &str) -> Result<()> {
        let dir = self.index_dir(name);
        if !dir.is_dir() {
            return Err(DedupError::DeleteRepo(format!("Repo {} does not exist", name)));
        }

        let doomed = self.repo_dir.join(format!("{}_del", name));
        if doomed.exists() {
            fs::remove_dir_all(&doomed)
                .map_err(|e| DedupError::DeleteRepo(format!("{}: {}", doomed.display(), e)))?;
        }
        fs::rename(&dir, &doomed)
            .map_err(|e| DedupError::DeleteRepo(format!("{}: {}", dir.display(), e)))?;
        fs::remove_dir_all(&doomed)
            .map_err(|e| DedupError::DeleteRepo(format!("{}: {}", doomed.display(), e)))
    }
}
