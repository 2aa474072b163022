//! Plugin facade wiring the handoff components together.

use std::sync::Arc;

use attache_core::{
    CallbackResult, DispatchData, FunctionDescriptor, LambdaError, LambdaSettings,
};
use attache_db::RecordRepository;
use attache_storage::Storages;
use http::HeaderMap;

use crate::assembly::{AssemblyBuilder, ProcessingHook};
use crate::attacher::Attacher;
use crate::dispatcher::Dispatcher;
use crate::provider::ComputeProvider;
use crate::reconciler::CallbackReconciler;
use crate::registry::FunctionRegistry;
use crate::signature::{CallbackAuth, SignatureVerifier};

#[derive(Clone)]
pub struct LambdaPlugin {
    settings: LambdaSettings,
    registry: FunctionRegistry,
    dispatcher: Dispatcher,
    verifier: SignatureVerifier,
    reconciler: CallbackReconciler,
}

impl LambdaPlugin {
    pub fn new(
        settings: LambdaSettings,
        storages: Storages,
        hook: Arc<dyn ProcessingHook>,
        provider: Arc<dyn ComputeProvider>,
        repository: Arc<dyn RecordRepository>,
    ) -> Result<Self, LambdaError> {
        let builder = AssemblyBuilder::new(&settings, storages, hook)?;
        let registry = FunctionRegistry::new(provider.clone());
        let dispatcher = Dispatcher::new(builder, registry.clone(), provider, repository.clone());
        let verifier = SignatureVerifier::new(settings.callback_url.clone(), repository.clone());
        let reconciler = CallbackReconciler::new(repository);

        tracing::info!(callback_url = %settings.callback_url, "Lambda plugin configured");

        Ok(Self {
            settings,
            registry,
            dispatcher,
            verifier,
            reconciler,
        })
    }

    /// Same as [`LambdaPlugin::new`] with an AWS Lambda client built from `settings`.
    #[cfg(feature = "aws")]
    pub async fn with_aws(
        settings: LambdaSettings,
        storages: Storages,
        hook: Arc<dyn ProcessingHook>,
        repository: Arc<dyn RecordRepository>,
    ) -> Result<Self, LambdaError> {
        settings.validate()?;
        let provider = crate::aws::AwsLambdaProvider::from_settings(&settings).await;
        Self::new(settings, storages, hook, Arc::new(provider), repository)
    }

    pub fn settings(&self) -> &LambdaSettings {
        &self.settings
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub async fn functions(&self, force: bool) -> Result<Vec<FunctionDescriptor>, LambdaError> {
        self.registry.list(force).await
    }

    pub async fn dispatch(&self, data: &DispatchData) -> Result<Attacher, LambdaError> {
        self.dispatcher.dispatch(data).await
    }

    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<CallbackAuth, LambdaError> {
        self.verifier.authenticate(headers, body).await
    }

    pub async fn reconcile(
        &self,
        attacher: &mut Attacher,
        result: CallbackResult,
    ) -> Result<(), LambdaError> {
        self.reconciler.reconcile(attacher, result).await
    }

    /// Authenticate and reconcile a callback in one go.
    ///
    /// Returns `Ok(None)` when the callback is rejected.
    pub async fn handle_callback(
        &self,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<Option<Attacher>, LambdaError> {
        match self.authenticate(headers, body).await? {
            CallbackAuth::Authorized {
                mut attacher,
                result,
            } => {
                self.reconcile(&mut attacher, result).await?;
                Ok(Some(attacher))
            }
            CallbackAuth::Rejected => Ok(None),
        }
    }
}
