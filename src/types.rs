//! Core types for the dedup index.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// On-disk record encoding of a repo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Codec {
    #[default]
    Json,
    #[serde(alias = "MESSAGEPACK")]
    Binary,
}

/// A tracked directory tree and the layout of its index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repo {
    pub name: String,
    pub absolute_path: PathBuf,
    #[serde(rename = "indices", default = "default_shard_count")]
    pub shard_count: u32,
    #[serde(default)]
    pub codec: Codec,
    #[serde(default)]
    pub compressed: bool,
}

fn default_shard_count() -> u32 {
    1
}

impl Repo {
    pub fn new(name: impl Into<String>, absolute_path: impl Into<PathBuf>) -> Self {
        Repo {
            name: name.into(),
            absolute_path: absolute_path.into(),
            shard_count: default_shard_count(),
            codec: Codec::default(),
            compressed: false,
        }
    }

    /// Shard index owning records of the given size.
    pub fn shard_for(&self, size: u64) -> usize {
        (size % u64::from(self.shard_count.max(1))) as usize
    }
}

/// Pixel dimensions attached by image enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// Content identity of a file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentKey {
    pub hash: String,
    pub size: u64,
}

/// One entry of a shard log.
///
/// `relative_path` is the logical key: the latest record for a path wins.
/// A record with `missing` set is a tombstone that keeps the last known
/// content identity of a file that disappeared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "h", default, skip_serializing_if = "String::is_empty")]
    pub hash: String,

    #[serde(rename = "p", default = "default_relative_path")]
    pub relative_path: String,

    #[serde(rename = "s", default)]
    pub size: u64,

    /// Milliseconds since the Unix epoch.
    #[serde(rename = "l", default)]
    pub last_modified: u64,

    #[serde(rename = "d", default, skip_serializing_if = "is_false")]
    pub missing: bool,

    #[serde(rename = "m", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    #[serde(rename = "f", default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,

    #[serde(rename = "a", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,

    #[serde(rename = "i", default, skip_serializing_if = "Option::is_none")]
    pub image_size: Option<ImageSize>,
}

fn default_relative_path() -> String {
    ".".to_string()
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Record {
    pub fn new(
        hash: impl Into<String>,
        relative_path: impl Into<String>,
        size: u64,
        last_modified: u64,
    ) -> Self {
        Record {
            hash: hash.into(),
            relative_path: relative_path.into(),
            size,
            last_modified,
            missing: false,
            mime_type: None,
            fingerprint: None,
            attributes: BTreeMap::new(),
            image_size: None,
        }
    }

    pub fn with_missing(mut self, missing: bool) -> Self {
        self.missing = missing;
        self
    }

    pub fn with_mime_type(mut self, mime_type: Option<String>) -> Self {
        self.mime_type = mime_type;
        self
    }

    pub fn key(&self) -> ContentKey {
        ContentKey {
            hash: self.hash.clone(),
            size: self.size,
        }
    }

    pub fn is_live(&self) -> bool {
        !self.missing
    }

    /// Resolve the record against a repo root using the platform separator.
    pub fn path_under(&self, root: &std::path::Path) -> PathBuf {
        self.relative_path
            .split('/')
            .filter(|part| !part.is_empty() && *part != ".")
            .fold(root.to_path_buf(), |acc, part| acc.join(part))
    }
}
