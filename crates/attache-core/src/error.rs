//! Error types module
//!
//! All failures of the handoff protocol are unified under `LambdaError`. A signature
//! mismatch on an inbound callback is deliberately not part of this enum: the verifier
//! reports it as a sentinel outcome so the HTTP layer can answer without leaking detail.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like malformed callbacks
    Debug,
    /// Warning level - for precondition failures the caller can fix
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "REMOTE_INVOCATION_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether the background-job layer may retry the operation
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from HTTP clients
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum LambdaError {
    #[error("{0}")]
    Configuration(String),

    #[error("No Lambda function specified!")]
    NoFunction,

    #[error("Function {0} not available on Lambda!")]
    FunctionUnavailable(String),

    #[error("{code}: {message}")]
    RemoteInvocation { code: String, message: String },

    #[error("Compute provider error: {0}")]
    Provider(String),

    #[error("Record not found: {record_type} {record_id}")]
    RecordNotFound {
        record_type: String,
        record_id: String,
    },

    #[error("Record {record_type} {record_id} has no attachment data for {name}")]
    AttachmentMissing {
        record_type: String,
        record_id: String,
        name: String,
    },

    #[error("Invalid callback: {0}")]
    InvalidCallback(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Persistence error: {0}")]
    Persistence(#[source] anyhow::Error),
}

impl From<anyhow::Error> for LambdaError {
    fn from(err: anyhow::Error) -> Self {
        LambdaError::Persistence(err)
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, sensitive, log_level).
fn lambda_error_static_metadata(err: &LambdaError) -> (u16, &'static str, bool, bool, LogLevel) {
    match err {
        LambdaError::Configuration(_) => (500, "CONFIGURATION_ERROR", false, true, LogLevel::Error),
        LambdaError::NoFunction => (422, "NO_FUNCTION", false, false, LogLevel::Warn),
        LambdaError::FunctionUnavailable(_) => {
            (422, "FUNCTION_UNAVAILABLE", false, false, LogLevel::Warn)
        }
        LambdaError::RemoteInvocation { .. } => {
            (502, "REMOTE_INVOCATION_ERROR", true, true, LogLevel::Error)
        }
        LambdaError::Provider(_) => (502, "PROVIDER_ERROR", true, true, LogLevel::Error),
        LambdaError::RecordNotFound { .. } => (404, "RECORD_NOT_FOUND", false, false, LogLevel::Warn),
        LambdaError::AttachmentMissing { .. } => {
            (409, "ATTACHMENT_MISSING", false, false, LogLevel::Warn)
        }
        LambdaError::InvalidCallback(_) => (400, "INVALID_CALLBACK", false, false, LogLevel::Debug),
        LambdaError::Serialization(_) => (500, "SERIALIZATION_ERROR", false, true, LogLevel::Error),
        LambdaError::Persistence(_) => (500, "PERSISTENCE_ERROR", true, true, LogLevel::Error),
    }
}

impl ErrorMetadata for LambdaError {
    fn http_status_code(&self) -> u16 {
        lambda_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        lambda_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        lambda_error_static_metadata(self).2
    }

    fn is_sensitive(&self) -> bool {
        lambda_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        lambda_error_static_metadata(self).4
    }

    fn client_message(&self) -> String {
        match self {
            LambdaError::Configuration(_) => "Service misconfigured".to_string(),
            LambdaError::RemoteInvocation { .. } | LambdaError::Provider(_) => {
                "Remote processing is unavailable".to_string()
            }
            LambdaError::Serialization(_) | LambdaError::Persistence(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_match_plugin_wording() {
        assert_eq!(LambdaError::NoFunction.to_string(), "No Lambda function specified!");
        assert_eq!(
            LambdaError::FunctionUnavailable("Resize".to_string()).to_string(),
            "Function Resize not available on Lambda!"
        );
        let err = LambdaError::RemoteInvocation {
            code: "Unhandled".to_string(),
            message: "{\"errorMessage\":\"boom\"}".to_string(),
        };
        assert_eq!(err.to_string(), "Unhandled: {\"errorMessage\":\"boom\"}");
    }

    #[test]
    fn test_error_metadata_remote_invocation() {
        let err = LambdaError::RemoteInvocation {
            code: "Unhandled".to_string(),
            message: "boom".to_string(),
        };
        assert_eq!(err.http_status_code(), 502);
        assert_eq!(err.error_code(), "REMOTE_INVOCATION_ERROR");
        assert!(err.is_recoverable());
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Remote processing is unavailable");
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_error_metadata_record_not_found() {
        let err = LambdaError::RecordNotFound {
            record_type: "User".to_string(),
            record_id: "42".to_string(),
        };
        assert_eq!(err.http_status_code(), 404);
        assert!(!err.is_recoverable());
        assert!(!err.is_sensitive());
        assert!(err.client_message().contains("User 42"));
    }

    #[test]
    fn test_local_precondition_failures_are_not_recoverable() {
        assert!(!LambdaError::NoFunction.is_recoverable());
        assert!(!LambdaError::FunctionUnavailable("f".to_string()).is_recoverable());
        assert!(!LambdaError::Configuration("x".to_string()).is_recoverable());
    }

    #[test]
    fn test_persistence_from_anyhow() {
        let err: LambdaError = anyhow::anyhow!("connection reset").into();
        assert!(matches!(err, LambdaError::Persistence(_)));
        assert_eq!(err.client_message(), "Internal server error");
    }
}
