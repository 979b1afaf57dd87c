//! Persistence of the fact store.
//!
//! Facts are the source of truth; the graph is rebuilt from them on load.

use crate::error::{IndexError, IndexResult};
use crate::storage::IndexData;
use std::path::{Path, PathBuf};
use tracing::debug;

const FACTS_FILE: &str = "facts.json";

/// Manages persistence of the index
#[derive(Debug)]
pub struct IndexPersistence {
    base_path: PathBuf,
}

impl IndexPersistence {
    /// Create a new persistence manager
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn facts_path(&self) -> PathBuf {
        self.base_path.join(FACTS_FILE)
    }

    /// Save the fact store as pretty JSON
    pub fn save(&self, data: &IndexData) -> IndexResult<()> {
        std::fs::create_dir_all(&self.base_path).map_err(|source| IndexError::FileWrite {
            path: self.base_path.clone(),
            source,
        })?;

        let path = self.facts_path();
        let json = serde_json::to_string_pretty(data)?;
        std::fs::write(&path, json).map_err(|source| IndexError::FileWrite {
            path: path.clone(),
            source,
        })?;

        debug!(
            "[persistence] saved {} files to {}",
            data.file_count(),
            path.display()
        );
        Ok(())
    }

    /// Load the fact store from disk
    pub fn load(&self) -> IndexResult<IndexData> {
        Self::load_file(&self.facts_path())
    }

    /// Read a fact file from an arbitrary location, such as one written by a
    /// front end.
    pub fn load_file(path: &Path) -> IndexResult<IndexData> {
        let content = std::fs::read_to_string(path).map_err(|source| IndexError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let data: IndexData = serde_json::from_str(&content)?;
        debug!(
            "[persistence] loaded {} files from {}",
            data.file_count(),
            path.display()
        );
        Ok(data)
    }

    /// Check if an index exists
    pub fn exists(&self) -> bool {
        self.facts_path().exists()
    }

    /// Delete the persisted index
    pub fn clear(&self) -> Result<(), std::io::Error> {
        let path = self.facts_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::{FileFacts, UsageSite};
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = IndexPersistence::new(temp_dir.path().join("index"));

        let mut data = IndexData::new();
        data.files.insert(
            "src/a.cs".to_string(),
            FileFacts::new("abc").usage(UsageSite::call("A.Run()", "B.Go()", "src/a.cs", 1, 2)),
        );
        data.files
            .insert("src/b.cs".to_string(), FileFacts::new("def"));

        persistence.save(&data).unwrap();
        let loaded = persistence.load().unwrap();

        assert_eq!(loaded, data);
        let paths: Vec<_> = loaded.files.keys().cloned().collect();
        assert_eq!(paths, vec!["src/a.cs", "src/b.cs"]);
    }

    #[test]
    fn test_exists_and_clear() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = IndexPersistence::new(temp_dir.path().to_path_buf());

        assert!(!persistence.exists());
        persistence.save(&IndexData::new()).unwrap();
        assert!(persistence.exists());

        persistence.clear().unwrap();
        assert!(!persistence.exists());
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = IndexPersistence::new(temp_dir.path().to_path_buf());

        assert!(matches!(
            persistence.load(),
            Err(IndexError::FileRead { .. })
        ));
    }
}
