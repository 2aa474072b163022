//! Function registry: memoized view of the provider's function list.

use std::sync::Arc;

use attache_core::{FunctionDescriptor, LambdaError};
use tokio::sync::RwLock;

use crate::provider::{ComputeProvider, ListFunctionsRequest};

/// Cached list of remote functions.
///
/// A non-empty list is fetched once and reused until `force` is passed. An empty
/// answer is not memoized, so the next call asks the provider again.
#[derive(Clone)]
pub struct FunctionRegistry {
    provider: Arc<dyn ComputeProvider>,
    cache: Arc<RwLock<Option<Vec<FunctionDescriptor>>>>,
}

impl FunctionRegistry {
    pub fn new(provider: Arc<dyn ComputeProvider>) -> Self {
        Self {
            provider,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn list(&self, force: bool) -> Result<Vec<FunctionDescriptor>, LambdaError> {
        self.list_with(&ListFunctionsRequest::default(), force).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_with(
        &self,
        request: &ListFunctionsRequest,
        force: bool,
    ) -> Result<Vec<FunctionDescriptor>, LambdaError> {
        if !force {
            let cache = self.cache.read().await;
            if let Some(functions) = cache.as_ref().filter(|f| !f.is_empty()) {
                return Ok(functions.clone());
            }
        }

        let functions = self.provider.list_functions(request).await?;
        tracing::debug!(count = functions.len(), "Fetched remote function list");

        *self.cache.write().await = Some(functions.clone());
        Ok(functions)
    }

    /// Whether `name` appears in the (possibly cached) function list.
    pub async fn is_available(&self, name: &str) -> Result<bool, LambdaError> {
        let functions = self.list(false).await?;
        Ok(functions.iter().any(|f| f.function_name == name))
    }
}
