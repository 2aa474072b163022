use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::LambdaError;
use crate::models::UploadedFile;

/// Identity of the record owning an attachment.
///
/// Travels as a two-element array `["User", "1"]`; numeric ids are accepted on input
/// and normalised to strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RecordRefRepr", into = "(String, String)")]
pub struct RecordRef {
    pub record_type: String,
    pub record_id: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordIdRepr {
    Text(String),
    Number(i64),
}

#[derive(Deserialize)]
struct RecordRefRepr(String, RecordIdRepr);

impl From<RecordRefRepr> for RecordRef {
    fn from(repr: RecordRefRepr) -> Self {
        let record_id = match repr.1 {
            RecordIdRepr::Text(id) => id,
            RecordIdRepr::Number(id) => id.to_string(),
        };
        Self {
            record_type: repr.0,
            record_id,
        }
    }
}

impl From<RecordRef> for (String, String) {
    fn from(record: RecordRef) -> Self {
        (record.record_type, record.record_id)
    }
}

impl RecordRef {
    pub fn new(record_type: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            record_id: record_id.into(),
        }
    }
}

impl Display for RecordRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}#{}", self.record_type, self.record_id)
    }
}

/// Context handed to the processing hook and to location generation.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadContext {
    pub record: RecordRef,
    pub name: String,
    pub action: Option<String>,
}

/// Correlation data round-tripped verbatim through the remote function.
///
/// Carries enough to reload the exact record and attachment field without any other
/// shared state. Extra keys supplied by the host are preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackContext {
    pub record: RecordRef,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CallbackContext {
    pub fn new(record: RecordRef, name: impl Into<String>) -> Self {
        Self {
            record,
            name: name.into(),
            extra: Map::new(),
        }
    }
}

/// Job payload produced by the host's backgrounding hook.
///
/// `attachment` holds the cached-file descriptor, either as a JSON string or inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchData {
    pub attachment: Value,
    pub record: RecordRef,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DispatchData {
    pub fn new(
        cached_file: &UploadedFile,
        record: RecordRef,
        name: impl Into<String>,
    ) -> Result<Self, LambdaError> {
        Ok(Self {
            attachment: Value::String(cached_file.to_json()?),
            record,
            name: name.into(),
            action: Some("store".to_string()),
            phase: Some("store".to_string()),
            extra: Map::new(),
        })
    }

    /// Resolve the cached file referenced by this job.
    pub fn cached_file(&self) -> Result<UploadedFile, LambdaError> {
        match &self.attachment {
            Value::String(raw) => UploadedFile::from_json(raw),
            other => Ok(serde_json::from_value(other.clone())?),
        }
    }

    /// Correlation context: everything except the attachment blob and lifecycle markers.
    pub fn callback_context(&self) -> CallbackContext {
        CallbackContext {
            record: self.record.clone(),
            name: self.name.clone(),
            extra: self.extra.clone(),
        }
    }

    pub fn upload_context(&self) -> UploadContext {
        UploadContext {
            record: self.record.clone(),
            name: self.name.clone(),
            action: self.action.clone(),
        }
    }
}
