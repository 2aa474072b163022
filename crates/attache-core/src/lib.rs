//! Attache Core Library
//!
//! This crate provides the domain models, error types and configuration shared by
//! every component of the remote-processing handoff: the dispatcher, the callback
//! verifier and the reconciler.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{LambdaSettings, Requirement, SETTINGS};
pub use error::{ErrorMetadata, LambdaError, LogLevel};
pub use models::{
    Assembly, AttachmentState, CallbackContext, CallbackResult, DispatchData,
    FunctionDescriptor, Metadata, RecordRef, StorageTarget, StoredAttachment, UploadContext,
    UploadedFile, VersionSpec, SIGNING_KEY_FIELD,
};
