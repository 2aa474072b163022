//! Configuration module
//!
//! `LambdaSettings` holds the options recognised by the Lambda integration. Options
//! are split into required and optional ones; any name outside the table is rejected
//! outright. Settings are passed explicitly into each component constructor.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::LambdaError;

/// Whether an option must end up with a value after configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Required,
    Optional,
}

/// Every option recognised by the Lambda integration.
pub const SETTINGS: &[(&str, Requirement)] = &[
    ("access_key_id", Requirement::Optional),
    ("callback_url", Requirement::Required),
    ("convert_params", Requirement::Optional),
    ("endpoint", Requirement::Optional),
    ("log_formatter", Requirement::Optional),
    ("log_level", Requirement::Optional),
    ("logger", Requirement::Optional),
    ("profile", Requirement::Optional),
    ("region", Requirement::Optional),
    ("retry_limit", Requirement::Optional),
    ("secret_access_key", Requirement::Optional),
    ("session_token", Requirement::Optional),
    ("stub_responses", Requirement::Optional),
    ("validate_params", Requirement::Optional),
];

const ENV_PREFIX: &str = "LAMBDA_";

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LambdaSettings {
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// URL the remote function calls back when processing completes
    #[serde(default)]
    pub callback_url: String,
    #[serde(default)]
    pub convert_params: Option<bool>,
    /// Custom endpoint for Lambda-compatible providers (e.g. LocalStack)
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub log_formatter: Option<String>,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub logger: Option<String>,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub retry_limit: Option<u32>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(default)]
    pub stub_responses: Option<bool>,
    #[serde(default)]
    pub validate_params: Option<bool>,
}

// Credentials never reach logs.
impl Debug for LambdaSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("LambdaSettings")
            .field("access_key_id", &self.access_key_id)
            .field("callback_url", &self.callback_url)
            .field("endpoint", &self.endpoint)
            .field("profile", &self.profile)
            .field("region", &self.region)
            .field("retry_limit", &self.retry_limit)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

impl LambdaSettings {
    /// Build settings from an option map, rejecting unknown options.
    pub fn from_options(options: &Map<String, Value>) -> Result<Self, LambdaError> {
        Self::default().merge(options)
    }

    /// Apply `options` on top of the current settings.
    ///
    /// A `null` value keeps the previously configured value. After merging, every
    /// required option must be present.
    pub fn merge(&self, options: &Map<String, Value>) -> Result<Self, LambdaError> {
        for key in options.keys() {
            if !SETTINGS.iter().any(|(name, _)| name == key) {
                tracing::warn!(
                    option = %key,
                    "The :{} option is not supported by the Lambda plugin",
                    key
                );
                return Err(LambdaError::Configuration(format!(
                    "The :{} option is not supported by the Lambda plugin",
                    key
                )));
            }
        }

        let mut current = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in options {
            if !value.is_null() {
                current.insert(key.clone(), value.clone());
            }
        }

        let settings: LambdaSettings = serde_json::from_value(Value::Object(current))
            .map_err(|e| LambdaError::Configuration(format!("Invalid Lambda option: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from `LAMBDA_*` environment variables (and `.env`).
    pub fn from_env() -> Result<Self, LambdaError> {
        dotenvy::dotenv().ok();

        let settings: LambdaSettings = envy::prefixed(ENV_PREFIX)
            .from_env()
            .map_err(|e| LambdaError::Configuration(format!("Invalid Lambda environment: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), LambdaError> {
        for (name, requirement) in SETTINGS {
            if *requirement == Requirement::Required && !self.is_set(name) {
                return Err(LambdaError::Configuration(format!(
                    "The :{} option is required for Lambda plugin",
                    name
                )));
            }
        }
        Ok(())
    }

    fn is_set(&self, name: &str) -> bool {
        match name {
            "callback_url" => !self.callback_url.trim().is_empty(),
            // Optional options are never checked.
            _ => true,
        }
    }

    /// Static credentials, when both halves are configured.
    pub fn static_credentials(&self) -> Option<(&str, &str, Option<&str>)> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) => {
                Some((id.as_str(), secret.as_str(), self.session_token.as_deref()))
            }
            _ => None,
        }
    }
}
