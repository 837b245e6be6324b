use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{BootstrapError, Result};

/// Persistent state store for a client: string values under string keys.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get_value(&self, name: &str) -> Result<Option<String>>;
    async fn set_value(&self, name: &str, value: &str) -> Result<()>;
    fn location(&self) -> &Path;
}

/// One file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Opens the store, creating the directory if needed.
    pub async fn open(dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| BootstrapError::Store {
                path: dir.to_path_buf(),
                source,
            })?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn key_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(|c: char| c == '/' || c == '\\' || c == '\0')
        {
            return Err(BootstrapError::InvalidStoreKey(name.to_string()));
        }
        Ok(self.dir.join(name))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get_value(&self, name: &str) -> Result<Option<String>> {
        let path = self.key_path(name)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(BootstrapError::Store { path, source }),
        }
    }

    async fn set_value(&self, name: &str, value: &str) -> Result<()> {
        let path = self.key_path(name)?;
        // write-then-rename so a reader never sees a torn value
        let tmp = self.dir.join(format!(".{}.tmp", name));
        tokio::fs::write(&tmp, value)
            .await
            .map_err(|source| BootstrapError::Store {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| BootstrapError::Store { path, source })
    }

    fn location(&self) -> &Path {
        &self.dir
    }
}

// Generic Helper: Put
pub async fn put_json<T: Serialize + Sync>(store: &dyn KeyValueStore, name: &str, value: &T) -> Result<()> {
    let serialized = serde_json::to_string(value)?;
    store.set_value(name, &serialized).await
}

// Generic Helper: Get
pub async fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, name: &str) -> Result<Option<T>> {
    match store.get_value(name).await? {
        Some(data) => Ok(Some(serde_json::from_str(&data)?)),
        None => Ok(None),
    }
}
