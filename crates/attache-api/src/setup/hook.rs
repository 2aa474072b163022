//! Processing hook driven by `AppConfig`.

use attache_core::{LambdaError, UploadContext, UploadedFile, VersionSpec};
use attache_lambda::{ProcessingHook, ProcessingOverrides};

/// Sends every cached file to one function with a fixed version list.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredHook {
    function: Option<String>,
    versions: Vec<VersionSpec>,
}

impl ConfiguredHook {
    pub fn new(function: Option<String>, versions: Vec<VersionSpec>) -> Self {
        Self { function, versions }
    }
}

impl ProcessingHook for ConfiguredHook {
    fn build_versions(
        &self,
        file: &UploadedFile,
        context: &UploadContext,
    ) -> Result<ProcessingOverrides, LambdaError> {
        tracing::debug!(
            file = %file.id,
            record = %context.record,
            attachment = %context.name,
            versions = self.versions.len(),
            "Building processing overrides"
        );

        let mut overrides = ProcessingOverrides::new();
        if let Some(function) = &self.function {
            overrides = overrides.function(function.clone());
        }
        for version in &self.versions {
            overrides = overrides.version(version.clone());
        }
        Ok(overrides)
    }
}
