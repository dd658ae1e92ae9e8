//! LendBridge Documents
//!
//! Supporting files (bank statements, tax returns) attached to an
//! application. Bytes go through a [`DocumentStorage`] backend; metadata
//! rows live in the store.
//!
//! ```text
//! upload → validate_upload → sanitize_file_name → storage.put(key) → store.insert_document
//! ```

pub mod error;
pub mod local;

pub use error::{DocumentError, DocumentResult};
pub use local::LocalDocumentStorage;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Content types accepted for upload
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "image/png",
    "image/jpeg",
    "text/csv",
    "text/plain",
];

const MAX_FILE_NAME_LEN: usize = 120;

/// Backend that holds document bytes
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// Write bytes under `key`, replacing anything already there
    async fn put(&self, key: &str, bytes: &[u8]) -> DocumentResult<()>;

    /// Read the bytes stored under `key`
    async fn get(&self, key: &str) -> DocumentResult<Vec<u8>>;

    /// Remove `key`; returns false when nothing was stored
    async fn delete(&self, key: &str) -> DocumentResult<bool>;
}

/// Document upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsConfig {
    /// Root directory for stored files; defaults to `<data_dir>/documents`
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Maximum upload size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

fn default_max_upload_bytes() -> u64 {
    10 * 1024 * 1024
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            dir: None,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl DocumentsConfig {
    pub fn resolve_dir(&self, data_dir: &Path) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| data_dir.join("documents"))
    }
}

/// Normalize a content type (drops parameters like `; charset=utf-8`)
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Check size and content type of an upload
pub fn validate_upload(content_type: &str, size: u64, max_bytes: u64) -> DocumentResult<String> {
    if size == 0 {
        return Err(DocumentError::Empty);
    }
    if size > max_bytes {
        return Err(DocumentError::TooLarge {
            size,
            max: max_bytes,
        });
    }

    let normalized = normalize_content_type(content_type);
    if !ALLOWED_CONTENT_TYPES.contains(&normalized.as_str()) {
        return Err(DocumentError::UnsupportedType(content_type.to_string()));
    }
    Ok(normalized)
}

/// Reduce a client-supplied file name to a safe single path segment
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let mut cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    cleaned = cleaned.trim_matches(|c| c == '.' || c == '_').to_string();
    if cleaned.len() > MAX_FILE_NAME_LEN {
        cleaned = cleaned[cleaned.len() - MAX_FILE_NAME_LEN..].to_string();
    }
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned
    }
}

/// Storage key for a document
pub fn storage_key(application_id: Uuid, document_id: Uuid, file_name: &str) -> String {
    format!("{}/{}-{}", application_id, document_id, file_name)
}
