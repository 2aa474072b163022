//! The processing request ("assembly") sent to the remote function.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{CallbackContext, UploadedFile};

/// Storage location handed to the remote function for one storage role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageTarget {
    /// Bucket name
    pub name: String,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_options: Option<Value>,
}

/// A derived variant the remote function should produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSpec {
    pub name: String,
    /// Storage role the variant is written to
    pub storage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Additional transform parameters passed through untouched
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl VersionSpec {
    pub fn new(name: impl Into<String>, storage: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storage: storage.into(),
            width: None,
            height: None,
            format: None,
            params: Map::new(),
        }
    }

    pub fn resize(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

/// Immutable once sent.
///
/// The function name is not part of the payload; it is passed to the provider as the
/// invocation target. `context` is attached by the dispatcher right before sending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assembly {
    #[serde(skip)]
    pub function: String,
    #[serde(rename = "callbackURL")]
    pub callback_url: String,
    pub copy_original: bool,
    pub storages: BTreeMap<String, StorageTarget>,
    pub target_storage: String,
    #[serde(default)]
    pub versions: Vec<VersionSpec>,
    pub path: String,
    /// The cached original, carrying the signing key in its metadata
    #[serde(rename = "attachment")]
    pub original: UploadedFile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<CallbackContext>,
    /// Extra keys returned by the processing hook
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Assembly {
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
