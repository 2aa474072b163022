use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::LambdaError;

/// Free-form file metadata (filename, mime_type, size, ...).
pub type Metadata = Map<String, Value>;

/// Metadata key under which the per-dispatch signing key travels.
///
/// The value is a single-use secret: it must be removed before any metadata derived
/// from a callback is persisted.
pub const SIGNING_KEY_FIELD: &str = "key";

/// A file sitting in one of the configured storages.
///
/// Serialized as `{"id": ..., "storage": ..., "metadata": {...}}`. Variant descriptors
/// returned by the remote function may omit `id`; unknown keys are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub storage: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UploadedFile {
    pub fn new(id: impl Into<String>, storage: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            storage: storage.into(),
            metadata: Metadata::new(),
            extra: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn from_json(data: &str) -> Result<Self, LambdaError> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn to_json(&self) -> Result<String, LambdaError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn filename(&self) -> Option<&str> {
        self.metadata.get("filename").and_then(Value::as_str)
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.metadata.get("mime_type").and_then(Value::as_str)
    }

    pub fn size(&self) -> Option<u64> {
        self.metadata.get("size").and_then(Value::as_u64)
    }

    /// Lowercased extension taken from the id, falling back to the original filename.
    pub fn extension(&self) -> Option<String> {
        fn ext_of(name: &str) -> Option<String> {
            let base = name.rsplit('/').next()?;
            let (stem, ext) = base.rsplit_once('.')?;
            if stem.is_empty() || ext.is_empty() {
                return None;
            }
            Some(ext.to_lowercase())
        }

        ext_of(&self.id).or_else(|| self.filename().and_then(ext_of))
    }

    pub fn signing_key(&self) -> Option<&str> {
        self.metadata.get(SIGNING_KEY_FIELD).and_then(Value::as_str)
    }

    pub fn set_signing_key(&mut self, key: String) {
        self.metadata
            .insert(SIGNING_KEY_FIELD.to_string(), Value::String(key));
    }

    /// Remove the signing key, returning whether one was present.
    pub fn erase_signing_key(&mut self) -> bool {
        self.metadata.remove(SIGNING_KEY_FIELD).is_some()
    }
}
