//! Storage collaborators: where source images come from, where results go,
//! and where the per-upload file list is recorded.
//!
//! The batch layer only sees the [`ObjectStore`] and [`MetadataStore`]
//! traits. Two families of implementations ship with the crate:
//!
//! | Store | Object store | Metadata store |
//! |---|---|---|
//! | Filesystem | [`FsObjectStore`], a directory standing in for the bucket | [`FsMetadataStore`], one JSON file per upload |
//! | Memory | [`MemoryObjectStore`] | [`MemoryMetadataStore`] |
//!
//! Source references of the form `data:<mime>;base64,<payload>` never reach a
//! store; [`resolve_source`] decodes them in place.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("Invalid inline image: {0}")]
    InvalidInline(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Store unavailable: {0}")]
    Backend(String),
}

impl StoreError {
    /// True when the reference itself is at fault rather than the store.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound(_) | StoreError::InvalidKey(_) | StoreError::InvalidInline(_)
        )
    }
}

/// Blob storage keyed by path-like strings.
pub trait ObjectStore: Sync {
    fn fetch(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    fn store(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StoreError>;

    /// Remove an object. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Bookkeeping of which files belong to which upload.
pub trait MetadataStore: Sync {
    fn record_uploaded_files(
        &self,
        upload_id: &str,
        filenames: &[String],
    ) -> Result<(), StoreError>;

    /// Remove the record for an upload. Deleting a missing record is not an error.
    fn delete_record(&self, upload_id: &str) -> Result<(), StoreError>;
}

const DATA_URI_PREFIX: &str = "data:";

/// Fetch the bytes behind a source reference.
///
/// Inline `data:` URIs are decoded here; everything else goes to `store`.
pub fn resolve_source(store: &dyn ObjectStore, reference: &str) -> Result<Vec<u8>, StoreError> {
    let trimmed = reference.trim();
    if trimmed.starts_with(DATA_URI_PREFIX) {
        decode_data_uri(trimmed)
    } else {
        store.fetch(trimmed)
    }
}

/// Decode `data:<mime>;base64,<payload>`.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, StoreError> {
    let rest = uri
        .strip_prefix(DATA_URI_PREFIX)
        .ok_or_else(|| StoreError::InvalidInline("missing data: prefix".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| StoreError::InvalidInline("missing ',' separator".to_string()))?;
    if !header.to_ascii_lowercase().ends_with(";base64") {
        return Err(StoreError::InvalidInline(
            "only base64 data URIs are supported".to_string(),
        ));
    }
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| StoreError::InvalidInline(e.to_string()))
}

/// Turn a key into a relative path, rejecting anything that could escape the root.
fn checked_relative_path(key: &str) -> Result<PathBuf, StoreError> {
    let path = Path::new(key);
    if key.trim().is_empty() {
        return Err(StoreError::InvalidKey("empty key".to_string()));
    }
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return Err(StoreError::InvalidKey(key.to_string())),
        }
    }
    if out.as_os_str().is_empty() {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(out)
}

// ============================================================================
// Filesystem
// ============================================================================

/// A directory on disk standing in for the bucket.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        Ok(self.root.join(checked_relative_path(key)?))
    }
}

impl ObjectStore for FsObjectStore {
    fn fetch(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(key)?;
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StoreError::NotFound(key.to_string()),
            _ => StoreError::Io(e),
        })
    }

    fn store(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;
        tracing::debug!(key, content_type, bytes = bytes.len(), "stored object");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Record written by [`FsMetadataStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub upload_id: String,
    pub filenames: Vec<String>,
}

/// One `{upload_id}.json` document per upload.
#[derive(Debug, Clone)]
pub struct FsMetadataStore {
    dir: PathBuf,
}

impl FsMetadataStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn record_path(&self, upload_id: &str) -> Result<PathBuf, StoreError> {
        let relative = checked_relative_path(upload_id)?;
        if relative.components().count() != 1 {
            return Err(StoreError::InvalidKey(upload_id.to_string()));
        }
        Ok(self.dir.join(format!("{upload_id}.json")))
    }

    /// Read back a record, if one exists.
    pub fn load(&self, upload_id: &str) -> Result<Option<UploadRecord>, StoreError> {
        let path = self.record_path(upload_id)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl MetadataStore for FsMetadataStore {
    fn record_uploaded_files(
        &self,
        upload_id: &str,
        filenames: &[String],
    ) -> Result<(), StoreError> {
        let path = self.record_path(upload_id)?;
        std::fs::create_dir_all(&self.dir)?;
        let record = UploadRecord {
            upload_id: upload_id.to_string(),
            filenames: filenames.to_vec(),
        };
        std::fs::write(&path, serde_json::to_string_pretty(&record)?)?;
        Ok(())
    }

    fn delete_record(&self, upload_id: &str) -> Result<(), StoreError> {
        let path = self.record_path(upload_id)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Memory
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-process object store.
///
/// `failing_after(n)` makes every `store` after the first `n` fail, which is
/// how rollback paths are exercised.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    store_limit: Option<usize>,
    stores: Mutex<usize>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_after(successful_stores: usize) -> Self {
        Self {
            store_limit: Some(successful_stores),
            ..Self::default()
        }
    }

    fn lock_objects(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, StoredObject>>, StoreError> {
        self.objects
            .lock()
            .map_err(|_| StoreError::Backend("object map poisoned".to_string()))
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.lock_objects().ok()?.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock_objects()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn fetch(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.lock_objects()?
            .get(key)
            .map(|object| object.bytes.clone())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn store(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StoreError> {
        if let Some(limit) = self.store_limit {
            let mut stores = self
                .stores
                .lock()
                .map_err(|_| StoreError::Backend("counter poisoned".to_string()))?;
            if *stores >= limit {
                return Err(StoreError::Backend(format!("refusing to store {key}")));
            }
            *stores += 1;
        }
        self.lock_objects()?.insert(
            key.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.lock_objects()?.remove(key);
        Ok(())
    }
}

/// In-process metadata store. `failing()` rejects every record.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    records: Mutex<BTreeMap<String, Vec<String>>>,
    deleted: Mutex<Vec<String>>,
    fail: bool,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn get(&self, upload_id: &str) -> Option<Vec<String>> {
        self.records.lock().ok()?.get(upload_id).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().map(|r| r.is_empty()).unwrap_or(true)
    }

    /// Upload ids passed to `delete_record`, in call order.
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn record_uploaded_files(
        &self,
        upload_id: &str,
        filenames: &[String],
    ) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::Backend("metadata table unavailable".to_string()));
        }
        self.records
            .lock()
            .map_err(|_| StoreError::Backend("record map poisoned".to_string()))?
            .insert(upload_id.to_string(), filenames.to_vec());
        Ok(())
    }

    fn delete_record(&self, upload_id: &str) -> Result<(), StoreError> {
        self.deleted
            .lock()
            .map_err(|_| StoreError::Backend("delete log poisoned".to_string()))?
            .push(upload_id.to_string());
        self.records
            .lock()
            .map_err(|_| StoreError::Backend("record map poisoned".to_string()))?
            .remove(upload_id);
        Ok(())
    }
}
