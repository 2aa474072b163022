use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

use crate::error::LambdaError;
use crate::models::UploadedFile;

/// Where an attachment stands with respect to remote processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentState {
    /// In temporary storage, not yet handed to a remote function
    Uploaded,
    /// Dispatched; a live signing key awaits the matching callback
    Processing,
    /// Callback reconciled into the record
    Finalized,
}

impl Display for AttachmentState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AttachmentState::Uploaded => write!(f, "uploaded"),
            AttachmentState::Processing => write!(f, "processing"),
            AttachmentState::Finalized => write!(f, "finalized"),
        }
    }
}

/// Document held in a record's attachment-data field.
///
/// Either a single file descriptor or, once versions were produced, a mapping from
/// variant name (including `original`) to descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredAttachment {
    Single(UploadedFile),
    Versions(BTreeMap<String, UploadedFile>),
}

impl StoredAttachment {
    pub fn from_json(data: &str) -> Result<Self, LambdaError> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn to_json(&self) -> Result<String, LambdaError> {
        Ok(serde_json::to_string(self)?)
    }

    /// The file that carries the correlation signing key.
    pub fn primary(&self) -> Option<&UploadedFile> {
        match self {
            StoredAttachment::Single(file) => Some(file),
            StoredAttachment::Versions(versions) => versions.get("original"),
        }
    }

    pub fn signing_key(&self) -> Option<&str> {
        self.primary().and_then(UploadedFile::signing_key)
    }

    pub fn files(&self) -> Box<dyn Iterator<Item = &UploadedFile> + '_> {
        match self {
            StoredAttachment::Single(file) => Box::new(std::iter::once(file)),
            StoredAttachment::Versions(versions) => Box::new(versions.values()),
        }
    }

    /// Derive the processing state from persisted data.
    ///
    /// A live signing key means `Processing`, whatever storage the file sits in. Without
    /// one, a file in `cache_storage` is `Uploaded` and anything else has been finalized.
    pub fn state(&self, cache_storage: &str) -> AttachmentState {
        if self.signing_key().is_some() {
            return AttachmentState::Processing;
        }
        match self {
            StoredAttachment::Single(file) if file.storage == cache_storage => {
                AttachmentState::Uploaded
            }
            _ => AttachmentState::Finalized,
        }
    }
}
