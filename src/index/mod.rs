//! Persistent sharded index.
//!
//! A repo's index is split into `shard_count` append-only logs; a record lives
//! in shard `size mod shard_count`. Each shard keeps the latest record per
//! relative path and a reverse hash → paths index in memory.

pub mod hash_index;
pub mod manager;
pub mod shard;
pub mod stats;

pub use manager::RepoManager;
pub use shard::Shard;
pub use stats::{LoadStats, RepoStats};
