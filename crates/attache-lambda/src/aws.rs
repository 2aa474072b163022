//! AWS Lambda compute provider.

use async_trait::async_trait;
use attache_core::{FunctionDescriptor, LambdaError, LambdaSettings};
use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_sdk_lambda::config::Credentials;
use aws_sdk_lambda::error::DisplayErrorContext;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::{FunctionVersion, InvocationType};
use aws_sdk_lambda::Client as LambdaClient;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::provider::{ComputeProvider, InvocationOutcome, ListFunctionsRequest};

/// `ComputeProvider` backed by the AWS Lambda API
#[derive(Clone)]
pub struct AwsLambdaProvider {
    client: LambdaClient,
}

impl Debug for AwsLambdaProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AwsLambdaProvider").finish()
    }
}

impl AwsLambdaProvider {
    pub fn new(client: LambdaClient) -> Self {
        Self { client }
    }

    /// Build a Lambda client from settings.
    ///
    /// Anything not set falls back to the default AWS provider chain.
    pub async fn from_settings(settings: &LambdaSettings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &settings.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some((access_key_id, secret_access_key, session_token)) =
            settings.static_credentials()
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key_id,
                secret_access_key,
                session_token.map(str::to_string),
                None,
                "attache-settings",
            ));
        }
        if let Some(profile) = &settings.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(endpoint) = &settings.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let Some(retry_limit) = settings.retry_limit {
            // retry_limit counts retries, max_attempts counts the first try as well
            loader = loader.retry_config(RetryConfig::standard().with_max_attempts(retry_limit + 1));
        }

        let config = loader.load().await;
        Self::new(LambdaClient::new(&config))
    }
}

#[async_trait]
impl ComputeProvider for AwsLambdaProvider {
    #[tracing::instrument(skip(self, payload), fields(function = %function_name, payload_len = payload.len()))]
    async fn invoke_async(
        &self,
        function_name: &str,
        payload: Vec<u8>,
    ) -> Result<InvocationOutcome, LambdaError> {
        let output = self
            .client
            .invoke()
            .function_name(function_name)
            .invocation_type(InvocationType::Event)
            .payload(Blob::new(payload))
            .send()
            .await
            .map_err(|e| LambdaError::Provider(DisplayErrorContext(&e).to_string()))?;

        if let Some(code) = output.function_error() {
            let message = output
                .payload()
                .map(|blob| String::from_utf8_lossy(blob.as_ref()).into_owned())
                .unwrap_or_default();
            return Ok(InvocationOutcome::RejectedSynchronously {
                code: code.to_string(),
                message,
            });
        }

        tracing::debug!(status = output.status_code(), "Lambda accepted invocation");
        Ok(InvocationOutcome::Accepted)
    }

    #[tracing::instrument(skip(self))]
    async fn list_functions(
        &self,
        request: &ListFunctionsRequest,
    ) -> Result<Vec<FunctionDescriptor>, LambdaError> {
        let output = self
            .client
            .list_functions()
            .set_master_region(request.master_region.clone())
            .function_version(FunctionVersion::from(request.function_version.as_str()))
            .set_marker(request.marker.clone())
            .max_items(request.max_items)
            .send()
            .await
            .map_err(|e| LambdaError::Provider(DisplayErrorContext(&e).to_string()))?;

        Ok(output
            .functions()
            .iter()
            .filter_map(|function| {
                Some(FunctionDescriptor {
                    function_name: function.function_name()?.to_string(),
                    function_arn: function.function_arn().map(str::to_string),
                    runtime: function.runtime().map(|r| r.as_str().to_string()),
                })
            })
            .collect())
    }
}
