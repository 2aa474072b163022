//! Assembly construction.
//!
//! The builder merges defaults (callback URL, storage roles, target storage) with the
//! overrides returned by the host's processing hook, generates the destination path
//! and tags the cached file with a fresh signing key.

use std::collections::BTreeSet;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use attache_core::{
    Assembly, LambdaError, LambdaSettings, UploadContext, UploadedFile, VersionSpec,
};
use attache_storage::{generate_location, Storages, CACHE, STORE};
use base64::{engine::general_purpose, Engine as _};
use rand::Rng;
use serde_json::{Map, Value};

/// Random bytes in a signing key (96 bits)
const SIGNING_KEY_BYTES: usize = 12;

// Payload keys owned by the builder; hook extras cannot shadow them.
const RESERVED_KEYS: &[&str] = &[
    "function",
    "callbackURL",
    "copy_original",
    "storages",
    "target_storage",
    "versions",
    "path",
    "attachment",
    "context",
];

/// What the host's processing hook decides for one cached file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingOverrides {
    pub function: Option<String>,
    pub versions: Vec<VersionSpec>,
    pub target_storage: Option<String>,
    pub copy_original: Option<bool>,
    pub callback_url: Option<String>,
    /// Additional payload keys forwarded to the function verbatim
    pub extra: Map<String, Value>,
}

impl ProcessingOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn function(mut self, name: impl Into<String>) -> Self {
        self.function = Some(name.into());
        self
    }

    pub fn version(mut self, spec: VersionSpec) -> Self {
        self.versions.push(spec);
        self
    }

    pub fn target_storage(mut self, role: impl Into<String>) -> Self {
        self.target_storage = Some(role.into());
        self
    }

    pub fn copy_original(mut self, copy: bool) -> Self {
        self.copy_original = Some(copy);
        self
    }

    pub fn callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

/// Host-supplied strategy deciding how a cached file gets processed.
pub trait ProcessingHook: Send + Sync {
    fn build_versions(
        &self,
        file: &UploadedFile,
        context: &UploadContext,
    ) -> Result<ProcessingOverrides, LambdaError>;
}

impl<F> ProcessingHook for F
where
    F: Fn(&UploadedFile, &UploadContext) -> Result<ProcessingOverrides, LambdaError> + Send + Sync,
{
    fn build_versions(
        &self,
        file: &UploadedFile,
        context: &UploadContext,
    ) -> Result<ProcessingOverrides, LambdaError> {
        self(file, context)
    }
}

/// Wrap a closure as a shared [`ProcessingHook`].
pub fn processing_hook<F>(f: F) -> Arc<dyn ProcessingHook>
where
    F: Fn(&UploadedFile, &UploadContext) -> Result<ProcessingOverrides, LambdaError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

#[derive(Clone)]
pub struct AssemblyBuilder {
    callback_url: String,
    storages: Storages,
    hook: Arc<dyn ProcessingHook>,
}

impl Debug for AssemblyBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AssemblyBuilder")
            .field("callback_url", &self.callback_url)
            .field("storages", &self.storages)
            .finish_non_exhaustive()
    }
}

impl AssemblyBuilder {
    pub fn new(
        settings: &LambdaSettings,
        storages: Storages,
        hook: Arc<dyn ProcessingHook>,
    ) -> Result<Self, LambdaError> {
        settings.validate()?;
        storages.validate()?;
        Ok(Self {
            callback_url: settings.callback_url.clone(),
            storages,
            hook,
        })
    }

    pub fn storages(&self) -> &Storages {
        &self.storages
    }

    /// Build the assembly for `cached_file`.
    ///
    /// On success the file's metadata carries a new signing key and the assembly's
    /// `attachment` is a copy of the tagged file. `context` is left unset; the
    /// dispatcher attaches the correlation context.
    pub fn build(
        &self,
        cached_file: &mut UploadedFile,
        context: &UploadContext,
    ) -> Result<Assembly, LambdaError> {
        let overrides = self.hook.build_versions(cached_file, context)?;

        let function = overrides
            .function
            .filter(|name| !name.trim().is_empty())
            .ok_or(LambdaError::NoFunction)?;
        let target_storage = overrides
            .target_storage
            .unwrap_or_else(|| STORE.to_string());

        let mut roles: BTreeSet<&str> = BTreeSet::from([CACHE, STORE, target_storage.as_str()]);
        roles.extend(overrides.versions.iter().map(|v| v.storage.as_str()));

        let mut storages = self.storages.targets(roles.iter().copied())?;
        for (role, target) in storages.iter_mut() {
            let config = self.storages.get(role)?;
            target.upload_options = config
                .upload_options
                .as_ref()
                .and_then(|options| options.resolve(cached_file, context));
        }

        let path = generate_location(cached_file, context);

        let mut extra = overrides.extra;
        extra.retain(|key, _| {
            let reserved = RESERVED_KEYS.contains(&key.as_str());
            if reserved {
                tracing::debug!(key = %key, "Ignoring reserved key returned by processing hook");
            }
            !reserved
        });

        cached_file.set_signing_key(generate_signing_key());

        Ok(Assembly {
            function,
            callback_url: overrides
                .callback_url
                .unwrap_or_else(|| self.callback_url.clone()),
            copy_original: overrides.copy_original.unwrap_or(true),
            storages,
            target_storage,
            versions: overrides.versions,
            path,
            original: cached_file.clone(),
            context: None,
            extra,
        })
    }
}

/// Fresh single-use signing key: 12 random bytes, base64-encoded.
pub fn generate_signing_key() -> String {
    let mut rng = rand::rng();
    let random_bytes: Vec<u8> = (0..SIGNING_KEY_BYTES).map(|_| rng.random()).collect();
    general_purpose::STANDARD.encode(random_bytes)
}
