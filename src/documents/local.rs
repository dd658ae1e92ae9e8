//! Filesystem document storage

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use super::error::{DocumentError, DocumentResult};
use super::DocumentStorage;

/// Stores documents as plain files under a root directory.
///
/// Keys look like `<application_id>/<document_id>-<file_name>`.
#[derive(Debug, Clone)]
pub struct LocalDocumentStorage {
    root: PathBuf,
}

impl LocalDocumentStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a path, refusing anything that leaves the root
    fn resolve(&self, key: &str) -> DocumentResult<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(DocumentError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl DocumentStorage for LocalDocumentStorage {
    async fn put(&self, key: &str, bytes: &[u8]) -> DocumentResult<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;
        tracing::debug!(key, size = bytes.len(), "Document written");
        Ok(())
    }

    async fn get(&self, key: &str) -> DocumentResult<Vec<u8>> {
        let path = self.resolve(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(DocumentError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> DocumentResult<bool> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
