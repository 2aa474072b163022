//! Parsing of the callback body reported by the remote function.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::LambdaError;
use crate::models::{CallbackContext, StoredAttachment, UploadedFile};

const CONTEXT_FIELD: &str = "context";
const VERSIONS_FIELD: &str = "versions";

/// Result of remote processing, with the correlation context already stripped.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackResult {
    /// The original was only relocated; a single descriptor came back
    Single(UploadedFile),
    /// Named variants, including `original`
    Versions(BTreeMap<String, UploadedFile>),
}

impl CallbackResult {
    /// Parse a raw callback body into its context and result.
    ///
    /// `versions` may be an object keyed by variant name or an array of single-entry
    /// objects, which are merged in order (later entries win). A missing or `null`
    /// `versions` means the body itself is the single result.
    pub fn parse(body: &[u8]) -> Result<(CallbackContext, CallbackResult), LambdaError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| LambdaError::InvalidCallback(format!("body is not JSON: {}", e)))?;
        let Value::Object(mut document) = value else {
            return Err(LambdaError::InvalidCallback(
                "body must be a JSON object".to_string(),
            ));
        };

        let context = document
            .remove(CONTEXT_FIELD)
            .ok_or_else(|| LambdaError::InvalidCallback("missing context".to_string()))?;
        let context: CallbackContext = serde_json::from_value(context)
            .map_err(|e| LambdaError::InvalidCallback(format!("invalid context: {}", e)))?;

        let result = match document.remove(VERSIONS_FIELD) {
            Some(Value::Null) | None => {
                let file: UploadedFile = serde_json::from_value(Value::Object(document))
                    .map_err(|e| LambdaError::InvalidCallback(format!("invalid result: {}", e)))?;
                CallbackResult::Single(file)
            }
            Some(versions) => CallbackResult::Versions(merge_versions(versions)?),
        };

        Ok((context, result))
    }

    /// Convert into the persisted document, erasing every signing key.
    pub fn into_stored(self) -> StoredAttachment {
        match self {
            CallbackResult::Single(mut file) => {
                file.erase_signing_key();
                StoredAttachment::Single(file)
            }
            CallbackResult::Versions(mut versions) => {
                for file in versions.values_mut() {
                    file.erase_signing_key();
                }
                StoredAttachment::Versions(versions)
            }
        }
    }
}

fn merge_versions(versions: Value) -> Result<BTreeMap<String, UploadedFile>, LambdaError> {
    let entries: Vec<Map<String, Value>> = match versions {
        Value::Object(map) => vec![map],
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map),
                _ => Err(LambdaError::InvalidCallback(
                    "versions entries must be objects".to_string(),
                )),
            })
            .collect::<Result<_, _>>()?,
        _ => {
            return Err(LambdaError::InvalidCallback(
                "versions must be an object or an array".to_string(),
            ))
        }
    };

    let mut merged = BTreeMap::new();
    for entry in entries {
        for (name, descriptor) in entry {
            let file: UploadedFile = serde_json::from_value(descriptor).map_err(|e| {
                LambdaError::InvalidCallback(format!("invalid version {}: {}", name, e))
            })?;
            merged.insert(name, file);
        }
    }
    Ok(merged)
}
