//! Attache Storage Library
//!
//! Storage roles (`cache`, `store`, ...) as seen by the remote function: bucket name,
//! key prefix and per-role upload options. The object-storage client itself is owned
//! by the host; this crate only describes where files live and where they go.
//!
//! # Location format
//!
//! Destination paths are `{record_type}/{record_id}/{field}/{uid}{.ext}`, with the
//! record type snake-cased. Generation is centralized in the `keys` module.

pub mod keys;
pub mod storages;

// Re-export commonly used types
pub use keys::generate_location;
pub use storages::{StorageConfig, StorageError, Storages, UploadOptions, CACHE, STORE};
