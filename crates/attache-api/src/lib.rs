//! Attache API Library
//!
//! HTTP surface of the remote-processing handoff: the signed callback webhook,
//! the dispatch enqueue endpoint and the background dispatch queue.

pub mod config;
pub mod error;
pub mod handlers;
pub mod job_queue;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use config::AppConfig;
pub use error::{ApiError, ErrorResponse, HttpAppError};
pub use job_queue::DispatchQueue;
pub use state::AppState;
