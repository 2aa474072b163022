//! Storage role configuration.

use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use attache_core::{LambdaError, StorageTarget, UploadContext, UploadedFile};
use serde_json::Value;
use thiserror::Error;

/// Temporary storage role
pub const CACHE: &str = "cache";
/// Permanent storage role
pub const STORE: &str = "store";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage :{0} is not configured")]
    UnknownRole(String),

    #[error("Invalid storage configuration: {0}")]
    ConfigError(String),
}

impl From<StorageError> for LambdaError {
    fn from(err: StorageError) -> Self {
        LambdaError::Configuration(err.to_string())
    }
}

/// Result type for storage configuration lookups
pub type StorageResult<T> = Result<T, StorageError>;

type UploadOptionsFn = dyn Fn(&UploadedFile, &UploadContext) -> Option<Value> + Send + Sync;

/// Upload options for one storage role: a fixed value or computed per file.
#[derive(Clone)]
pub enum UploadOptions {
    Static(Value),
    Dynamic(Arc<UploadOptionsFn>),
}

impl UploadOptions {
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&UploadedFile, &UploadContext) -> Option<Value> + Send + Sync + 'static,
    {
        UploadOptions::Dynamic(Arc::new(f))
    }

    pub fn resolve(&self, file: &UploadedFile, context: &UploadContext) -> Option<Value> {
        match self {
            UploadOptions::Static(value) => Some(value.clone()),
            UploadOptions::Dynamic(f) => f(file, context),
        }
    }
}

impl Debug for UploadOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UploadOptions::Static(value) => f.debug_tuple("Static").field(value).finish(),
            UploadOptions::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub prefix: Option<String>,
    pub upload_options: Option<UploadOptions>,
}

impl StorageConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: None,
            upload_options: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_upload_options(mut self, options: UploadOptions) -> Self {
        self.upload_options = Some(options);
        self
    }

    /// Location descriptor sent to the remote function, without upload options.
    pub fn target(&self) -> StorageTarget {
        StorageTarget {
            name: self.bucket.clone(),
            prefix: self.prefix.clone(),
            upload_options: None,
        }
    }
}

/// Role name → storage configuration.
#[derive(Debug, Clone, Default)]
pub struct Storages {
    roles: BTreeMap<String, StorageConfig>,
}

impl Storages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, role: impl Into<String>, config: StorageConfig) -> Self {
        self.insert(role, config);
        self
    }

    pub fn insert(&mut self, role: impl Into<String>, config: StorageConfig) {
        self.roles.insert(role.into(), config);
    }

    pub fn get(&self, role: &str) -> StorageResult<&StorageConfig> {
        self.roles
            .get(role)
            .ok_or_else(|| StorageError::UnknownRole(role.to_string()))
    }

    /// Ensure the roles every assembly relies on are present.
    pub fn validate(&self) -> StorageResult<()> {
        for role in [CACHE, STORE] {
            let config = self.get(role)?;
            if config.bucket.trim().is_empty() {
                return Err(StorageError::ConfigError(format!(
                    "bucket for :{} must not be empty",
                    role
                )));
            }
        }
        Ok(())
    }

    /// Storage targets for `roles`, in role-name order.
    pub fn targets<'a, I>(&self, roles: I) -> StorageResult<BTreeMap<String, StorageTarget>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        roles
            .into_iter()
            .map(|role| Ok((role.to_string(), self.get(role)?.target())))
            .collect()
    }
}
