//! Attache Lambda
//!
//! Hands cached attachments to a remote serverless function and reconciles the
//! authenticated callback that reports completion.
//!
//! The flow, leaves first:
//!
//! - [`FunctionRegistry`] memoizes the provider's function list.
//! - [`AssemblyBuilder`] turns a cached file into a processing request and tags the
//!   file with a fresh signing key.
//! - [`Dispatcher`] checks availability, persists the tagged file and fires the
//!   invocation.
//! - [`SignatureVerifier`] recomputes the SigV4 signature of an inbound callback
//!   with the persisted signing key.
//! - [`CallbackReconciler`] writes the result into the record, erasing the key.

pub mod assembly;
pub mod attacher;
#[cfg(feature = "aws")]
pub mod aws;
pub mod dispatcher;
pub mod plugin;
pub mod provider;
pub mod reconciler;
pub mod registry;
pub mod signature;
pub mod sigv4;

// Test helpers (mock provider, signed callback fixtures)
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use assembly::{
    generate_signing_key, processing_hook, AssemblyBuilder, ProcessingHook, ProcessingOverrides,
};
pub use attacher::Attacher;
#[cfg(feature = "aws")]
pub use aws::AwsLambdaProvider;
pub use dispatcher::Dispatcher;
pub use plugin::LambdaPlugin;
pub use provider::{ComputeProvider, InvocationOutcome, ListFunctionsRequest};
pub use reconciler::CallbackReconciler;
pub use registry::FunctionRegistry;
pub use signature::{CallbackAuth, SignatureVerifier};
pub use sigv4::{AuthorizationHeader, CredentialScope, SignError, Signer};
