//! Persistent `source name -> version token` cache.

use crate::error::PersistenceError;
use crate::fetcher::VersionToken;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct VersionStore {
    path: PathBuf,
    versions: BTreeMap<String, VersionToken>,
}

impl VersionStore {
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            versions: BTreeMap::new(),
        }
    }

    /// Loads the cache, starting empty (with a warning) if it cannot be read.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::try_load(&path).await {
            Ok(store) => store,
            Err(e) => {
                warn!("Could not load version cache: {}", e);
                Self::empty(path)
            }
        }
    }

    /// A missing file is an empty cache, not an error.
    pub async fn try_load(path: &Path) -> Result<Self, PersistenceError> {
        let contents = match fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::empty(path));
            }
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        let versions =
            serde_json::from_str(&contents).map_err(|source| PersistenceError::Format {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            versions,
        })
    }

    /// Writes the cache to a temporary file, then renames it into place.
    pub async fn save(&self) -> Result<(), PersistenceError> {
        let io_err = |source| PersistenceError::Io {
            path: self.path.display().to_string(),
            source,
        };
        let json =
            serde_json::to_string_pretty(&self.versions).map_err(|source| {
                PersistenceError::Format {
                    path: self.path.display().to_string(),
                    source,
                }
            })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        fs::write(&tmp, json).await.map_err(io_err)?;
        fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        info!("Saved version cache to {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&VersionToken> {
        self.versions.get(name)
    }

    pub fn set(&mut self, name: &str, version: VersionToken) {
        self.versions.insert(name.to_string(), version);
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("versions.json");

        let store = VersionStore::load(&path).await;
        assert!(store.is_empty());

        let mut store = store;
        store.set("Hagezi Pro++", VersionToken::new("2025.1222"));
        store.set("Hagezi Pro++", VersionToken::new("2025.1223"));
        store.save().await.unwrap();

        let reloaded = VersionStore::try_load(&path).await.unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get("Hagezi Pro++").unwrap().as_str(), "2025.1223");
        assert!(!dir.path().join("versions.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("versions.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            VersionStore::try_load(&path).await,
            Err(PersistenceError::Format { .. })
        ));
        assert!(VersionStore::load(&path).await.is_empty());
    }

    #[tokio::test]
    async fn test_file_format_is_plain_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("versions.json");
        std::fs::write(&path, r#"{"A": "1", "Old": "x"}"#).unwrap();

        let store = VersionStore::load(&path).await;
        assert_eq!(store.get("A"), Some(&VersionToken::new("1")));
        assert_eq!(store.get("Old"), Some(&VersionToken::new("x")));
    }
}
