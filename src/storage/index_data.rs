//! Serializable fact store: per-file facts keyed by path.
//!
//! Plain data, so the graph can always be rebuilt from it.

use crate::indexing::FileFacts;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct IndexData {
    #[serde(default)]
    pub files: IndexMap<String, FileFacts>,
}

impl IndexData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn content_hash(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(|facts| facts.content_hash.as_str())
    }
}
