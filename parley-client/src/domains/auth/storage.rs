//! Durable key-value storage for the session
//!
//! The session is two string entries: the bearer token under
//! [`ACCESS_TOKEN_KEY`] and the JSON profile snapshot under [`USER_KEY`].

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};

use super::errors::StorageError;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const USER_KEY: &str = "user";

/// Persistent string storage keyed by name.
#[async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Removing an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Session entries kept in a single JSON document on disk.
///
/// Every write replaces the whole file through a sibling temp file and a
/// rename, so a crash mid-write leaves the previous document intact.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

type Document = BTreeMap<String, String>;

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "session.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn read_document(&self) -> Result<Document, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Document::new());
            }
            Err(source) => {
                return Err(StorageError::ReadFailed {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_slice(&bytes).map_err(|source| {
            StorageError::CorruptedData {
                path: self.path.clone(),
                source,
            }
        })
    }

    /// Document to edit, and whether it must be written back even when
    /// unchanged. A corrupt file is replaced instead of blocking writes.
    async fn editable_document(&self) -> Result<(Document, bool), StorageError> {
        match self.read_document().await {
            Ok(doc) => Ok((doc, false)),
            Err(err @ StorageError::CorruptedData { .. }) => {
                log::warn!("[SessionStore] Replacing unreadable file: {}", err);
                Ok((Document::new(), true))
            }
            Err(err) => Err(err),
        }
    }

    async fn write_document(&self, doc: &Document) -> Result<(), StorageError> {
        let write_err = |source| StorageError::WriteFailed {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let json = serde_json::to_vec_pretty(doc).map_err(|err| {
            write_err(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
        })?;

        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, &json).await.map_err(write_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(&temp_path, perms)
                .await
                .map_err(write_err)?;
        }

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(write_err)?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_document().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let (mut doc, _) = self.editable_document().await?;
        doc.insert(key.to_string(), value.to_string());
        self.write_document(&doc).await?;
        log::debug!("[SessionStore] Stored '{}' in {:?}", key, self.path);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let (mut doc, reset) = self.editable_document().await?;
        if doc.remove(key).is_none() && !reset {
            return Ok(());
        }
        self.write_document(&doc).await?;
        log::debug!("[SessionStore] Removed '{}' from {:?}", key, self.path);
        Ok(())
    }
}

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
