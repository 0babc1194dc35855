//! Dedup: durable content index for large file trees
//!
//! Keeps a sharded, append-only index of every file in a tracked tree
//! ("repo"). The index makes re-scans skip unchanged files, finds duplicates
//! by content within and across repos, and drives one-way content-based sync
//! between two repos.

pub mod catalogue;
pub mod codec;
pub mod config;
pub mod diff;
pub mod dupes;
pub mod error;
pub mod hasher;
pub mod index;
pub mod logging;
pub mod metadata;
pub mod prune;
pub mod types;
pub mod update;
pub mod walker;

pub use error::{DedupError, ErrorKind, Result};
pub use types::{Codec, ContentKey, ImageSize, Record, Repo};
