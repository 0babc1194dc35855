//! Reverse content index: hash → relative paths.

use std::collections::{HashMap, HashSet};

/// Maps a content hash to every path whose live record carries it, plus the
/// reverse association used to detach a path when its record is superseded.
#[derive(Debug, Default)]
pub struct HashIndex {
    index: HashMap<String, HashSet<String>>,
    reverse: HashMap<String, String>,
}

impl HashIndex {
    pub fn new() -> Self {
        HashIndex {
            index: HashMap::new(),
            reverse: HashMap::new(),
        }
    }

    /// Associate `path` with `hash`, detaching it from any previous hash.
    pub fn insert(&mut self, hash: &str, path: &str) {
        if self.reverse.get(path).map(String::as_str) == Some(hash) {
            return;
        }
        self.remove(path);
        self.index
            .entry(hash.to_string())
            .or_default()
            .insert(path.to_string());
        self.reverse.insert(path.to_string(), hash.to_string());
    }

    pub fn remove(&mut self, path: &str) {
        if let Some(hash) = self.reverse.remove(path) {
            if let Some(paths) = self.index.get_mut(&hash) {
                paths.remove(path);
                if paths.is_empty() {
                    self.index.remove(&hash);
                }
            }
        }
    }

    pub fn paths_for(&self, hash: &str) -> impl Iterator<Item = &String> {
        self.index.get(hash).into_iter().flatten()
    }

    pub fn hash_for(&self, path: &str) -> Option<&str> {
        self.reverse.get(path).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HashSet<String>)> {
        self.index.iter()
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.reverse.clear();
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
