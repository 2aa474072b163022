//! Dispatcher: hands a cached file to the remote function.

use std::sync::Arc;

use attache_core::{DispatchData, LambdaError, StoredAttachment};
use attache_db::RecordRepository;

use crate::assembly::AssemblyBuilder;
use crate::attacher::Attacher;
use crate::provider::{ComputeProvider, InvocationOutcome};
use crate::registry::FunctionRegistry;

/// Produces at most one invocation per `dispatch` call.
///
/// The tagged cached file is persisted before the invocation goes out, so the signing
/// key is durable by the time a callback can arrive. If the provider refuses the
/// invocation the previous attachment data is written back. When that write fails the
/// key stays persisted and the returned `Persistence` error says so.
#[derive(Clone)]
pub struct Dispatcher {
    builder: AssemblyBuilder,
    registry: FunctionRegistry,
    provider: Arc<dyn ComputeProvider>,
    repository: Arc<dyn RecordRepository>,
}

impl Dispatcher {
    pub fn new(
        builder: AssemblyBuilder,
        registry: FunctionRegistry,
        provider: Arc<dyn ComputeProvider>,
        repository: Arc<dyn RecordRepository>,
    ) -> Self {
        Self {
            builder,
            registry,
            provider,
            repository,
        }
    }

    #[tracing::instrument(skip(self, data), fields(record = %data.record, attachment = %data.name, function))]
    pub async fn dispatch(&self, data: &DispatchData) -> Result<Attacher, LambdaError> {
        let mut cached_file = data.cached_file()?;
        let context = data.callback_context();
        let mut attacher = Attacher::load(self.repository.as_ref(), &context).await?;

        let mut assembly = self.builder.build(&mut cached_file, &data.upload_context())?;
        tracing::Span::current().record("function", assembly.function.as_str());

        if !self.registry.is_available(&assembly.function).await? {
            tracing::warn!("Function not available on provider");
            return Err(LambdaError::FunctionUnavailable(assembly.function));
        }

        assembly.context = Some(context);
        let payload = assembly.to_payload()?;

        let previous = attacher.file().cloned();
        attacher.set_cached(cached_file);
        attacher.save(self.repository.as_ref()).await?;

        let outcome = self
            .provider
            .invoke_async(&assembly.function, payload)
            .await;
        match outcome {
            Ok(InvocationOutcome::Accepted) => {
                tracing::info!(
                    versions = assembly.versions.len(),
                    path = %assembly.path,
                    "Dispatched attachment for remote processing"
                );
                Ok(attacher)
            }
            Ok(InvocationOutcome::RejectedSynchronously { code, message }) => {
                tracing::error!(code = %code, "Remote function rejected invocation");
                let error = LambdaError::RemoteInvocation { code, message };
                Err(self.restore(&mut attacher, previous, error).await)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to invoke remote function");
                Err(self.restore(&mut attacher, previous, e).await)
            }
        }
    }

    /// Write back `previous` and hand back the error to report.
    async fn restore(
        &self,
        attacher: &mut Attacher,
        previous: Option<StoredAttachment>,
        error: LambdaError,
    ) -> LambdaError {
        attacher.set_file(previous);
        match attacher.save(self.repository.as_ref()).await {
            Ok(()) => error,
            Err(restore_error) => {
                tracing::error!(
                    error = %restore_error,
                    "Failed to restore attachment data after failed invocation, signing key left in place"
                );
                LambdaError::Persistence(anyhow::Error::new(restore_error).context(format!(
                    "{}; previous attachment data could not be restored and the signing key is still persisted",
                    error
                )))
            }
        }
    }
}
