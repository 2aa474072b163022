//! Remote compute provider abstraction.

use async_trait::async_trait;
use attache_core::{FunctionDescriptor, LambdaError};

/// Immediate answer of a fire-and-forget invocation.
///
/// Completion of the processing itself is never reported here; it only arrives
/// through the callback channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    Accepted,
    RejectedSynchronously { code: String, message: String },
}

/// Parameters of the function-listing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFunctionsRequest {
    pub master_region: Option<String>,
    pub function_version: String,
    pub marker: Option<String>,
    pub max_items: i32,
}

impl Default for ListFunctionsRequest {
    fn default() -> Self {
        Self {
            master_region: None,
            function_version: "ALL".to_string(),
            marker: None,
            max_items: 100,
        }
    }
}

/// Trait that every compute provider must implement
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    /// Invoke `function_name` asynchronously with a JSON payload.
    ///
    /// `Err` is reserved for transport failures; a request the provider refuses on
    /// the spot is `Ok(InvocationOutcome::RejectedSynchronously { .. })`.
    async fn invoke_async(
        &self,
        function_name: &str,
        payload: Vec<u8>,
    ) -> Result<InvocationOutcome, LambdaError>;

    /// List the functions known to the provider.
    async fn list_functions(
        &self,
        request: &ListFunctionsRequest,
    ) -> Result<Vec<FunctionDescriptor>, LambdaError>;
}
