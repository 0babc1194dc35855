#![allow(dead_code)]

use dedup::catalogue::{RepoCatalogue, RepoSettings, YamlCatalogue};
use dedup::hasher::{hash_file, FileHasher};
use dedup::index::RepoManager;
use dedup::update::{RepoUpdater, UpdateOptions, UpdateSummary};
use dedup::{Codec, Repo};
use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub struct Fixture {
    pub temp: TempDir,
    pub catalogue: YamlCatalogue,
}

impl Fixture {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let catalogue = YamlCatalogue::new(temp.path().join("repos"));
        Fixture { temp, catalogue }
    }

    pub fn create_repo(&self, name: &str, shards: u32, codec: Codec) -> Repo {
        let root = self.temp.path().join("trees").join(name);
        fs::create_dir_all(&root).unwrap();
        self.catalogue
            .create_repo(
                name,
                &root,
                RepoSettings {
                    shard_count: shards,
                    codec,
                    compressed: false,
                },
            )
            .unwrap()
    }

    pub fn updater(&self) -> RepoUpdater {
        RepoUpdater::new(UpdateOptions {
            hash_threads: 2,
            eta_window: 16,
            shutdown_timeout: Duration::from_secs(5),
        })
    }

    pub fn update(&self, repo: &Repo) -> UpdateSummary {
        self.updater()
            .update(repo, self.catalogue.index_dir(&repo.name))
            .unwrap()
    }

    pub fn loaded(&self, name: &str) -> RepoManager {
        let mut manager = self.catalogue.open(name).unwrap();
        manager.load().unwrap();
        manager
    }
}

pub fn write(repo: &Repo, relative: &str, content: &[u8]) -> PathBuf {
    let path = repo.absolute_path.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

pub fn set_mtime(path: &Path, secs: i64) {
    filetime::set_file_mtime(path, FileTime::from_unix_time(secs, 0)).unwrap();
}

pub fn shard_lines(manager: &RepoManager) -> usize {
    (0..manager.repo().shard_count as usize)
        .map(|i| {
            fs::read_to_string(manager.shard_path(i))
                .unwrap()
                .lines()
                .filter(|l| !l.trim().is_empty())
                .count()
        })
        .sum()
}

/// BLAKE3 hasher that counts how often it was asked to hash.
#[derive(Default)]
pub struct CountingHasher {
    pub calls: AtomicUsize,
}

impl CountingHasher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl FileHasher for CountingHasher {
    async fn hash(&self, path: &Path) -> dedup::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        hash_file(path)
    }
}

pub fn counting() -> Arc<CountingHasher> {
    Arc::new(CountingHasher::default())
}
