//! Test helpers: an in-memory compute provider and signed callback fixtures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use attache_core::{FunctionDescriptor, LambdaError};
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue};
use serde_json::Value;

use crate::provider::{ComputeProvider, InvocationOutcome, ListFunctionsRequest};
use crate::sigv4::Signer;

pub const FIXTURE_ACCESS_KEY_ID: &str = "AKIAEXAMPLE";
pub const FIXTURE_AMZ_DATE: &str = "20200307T000000Z";
pub const FIXTURE_REGION: &str = "us-east-1";
pub const FIXTURE_SERVICE: &str = "handler";

/// One call to `invoke_async`
#[derive(Debug, Clone)]
pub struct RecordedInvocation {
    pub function_name: String,
    pub payload: Value,
}

/// Mock compute provider for testing
#[derive(Clone, Default)]
pub struct MockComputeProvider {
    functions: Arc<Mutex<Vec<FunctionDescriptor>>>,
    invocations: Arc<Mutex<Vec<RecordedInvocation>>>,
    rejection: Arc<Mutex<Option<(String, String)>>>,
    list_requests: Arc<Mutex<Vec<ListFunctionsRequest>>>,
    list_calls: Arc<AtomicUsize>,
}

impl MockComputeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_functions(self, names: &[&str]) -> Self {
        self.set_functions(names);
        self
    }

    /// Reject every invocation synchronously with `code` and `message`.
    pub fn rejecting(self, code: &str, message: &str) -> Self {
        *self.rejection.lock().unwrap() = Some((code.to_string(), message.to_string()));
        self
    }

    pub fn set_functions(&self, names: &[&str]) {
        *self.functions.lock().unwrap() =
            names.iter().map(|name| FunctionDescriptor::named(*name)).collect();
    }

    pub fn invocations(&self) -> Vec<RecordedInvocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn last_list_request(&self) -> Option<ListFunctionsRequest> {
        self.list_requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ComputeProvider for MockComputeProvider {
    async fn invoke_async(
        &self,
        function_name: &str,
        payload: Vec<u8>,
    ) -> Result<InvocationOutcome, LambdaError> {
        if let Some((code, message)) = self.rejection.lock().unwrap().clone() {
            return Ok(InvocationOutcome::RejectedSynchronously { code, message });
        }

        let payload: Value = serde_json::from_slice(&payload)?;
        self.invocations.lock().unwrap().push(RecordedInvocation {
            function_name: function_name.to_string(),
            payload,
        });
        Ok(InvocationOutcome::Accepted)
    }

    async fn list_functions(
        &self,
        request: &ListFunctionsRequest,
    ) -> Result<Vec<FunctionDescriptor>, LambdaError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.list_requests.lock().unwrap().push(request.clone());
        Ok(self.functions.lock().unwrap().clone())
    }
}

/// Headers the remote function would send with a callback signed by `signing_key`.
pub fn sign_callback(callback_url: &str, signing_key: &str, body: &[u8]) -> HeaderMap {
    let authorization = Signer::new(
        FIXTURE_ACCESS_KEY_ID,
        signing_key,
        FIXTURE_REGION,
        FIXTURE_SERVICE,
    )
    .sign("PUT", callback_url, FIXTURE_AMZ_DATE, body)
    .expect("fixture request should be signable");

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&authorization.to_header_value()).unwrap(),
    );
    headers.insert("x-amz-date", HeaderValue::from_static(FIXTURE_AMZ_DATE));
    headers
}

/// Flip the last hex digit of an Authorization header's signature.
pub fn flip_last_hex_digit(authorization: &str) -> String {
    let mut chars: Vec<char> = authorization.chars().collect();
    if let Some(last) = chars.last_mut() {
        *last = if *last == '0' { '1' } else { '0' };
    }
    chars.into_iter().collect()
}
