//! Content hashing.
//!
//! Files shorter than [`INLINE_HASH_LIMIT`] bytes are identified by the hex of
//! their content; everything else goes through a [`FileHasher`].

use crate::error::{DedupError, Result};
use async_trait::async_trait;
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Files below this size are "hashed" inline as the hex of their bytes.
pub const INLINE_HASH_LIMIT: u64 = 20;

#[async_trait]
pub trait FileHasher: Send + Sync {
    /// Hex digest of the file content.
    async fn hash(&self, path: &Path) -> Result<String>;
}

/// BLAKE3 hasher running each file on the blocking pool, with at most
/// `threads` files in flight.
pub struct Blake3Hasher {
    permits: Arc<Semaphore>,
}

impl Blake3Hasher {
    pub fn new(threads: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(threads.max(1))),
        }
    }
}

impl Default for Blake3Hasher {
    fn default() -> Self {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self::new(threads)
    }
}

#[async_trait]
impl FileHasher for Blake3Hasher {
    async fn hash(&self, path: &Path) -> Result<String> {
        let _permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| DedupError::General(format!("Hasher shut down: {}", e)))?;
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || hash_file(&path))
            .await
            .map_err(|e| DedupError::General(format!("Hash task failed: {}", e)))?
    }
}

/// Synchronous BLAKE3 digest of a file.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| DedupError::load(path, e))?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher).map_err(|e| DedupError::load(path, e))?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// Identity "hash" used for tiny files.
pub fn inline_hash(bytes: &[u8]) -> String {
    hex::encode(bytes)
}
