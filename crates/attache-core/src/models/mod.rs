//! Domain models for the remote-processing handoff.

pub mod assembly;
pub mod attachment;
pub mod callback;
pub mod context;
pub mod function;
pub mod uploaded_file;

pub use assembly::{Assembly, StorageTarget, VersionSpec};
pub use attachment::{AttachmentState, StoredAttachment};
pub use callback::CallbackResult;
pub use context::{CallbackContext, DispatchData, RecordRef, UploadContext};
pub use function::FunctionDescriptor;
pub use uploaded_file::{Metadata, UploadedFile, SIGNING_KEY_FIELD};
