//! Error types for atchat
//!
//! This module defines the crate-wide error enum, the typed request-level
//! failures surfaced by the request orchestrator, and the result alias used
//! throughout the application.

use std::time::Duration;
use thiserror::Error;

/// Main error type for atchat operations
///
/// Covers configuration loading, credential lookup, workspace search,
/// message-channel decoding and the single-slot request resource.
#[derive(Error, Debug)]
pub enum AtchatError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// No credential is stored under the configured secret name
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    /// Network-level failure talking to the completion endpoint
    #[error("Transport error: {0}")]
    Transport(String),

    /// The completion endpoint reported a structured error
    #[error("Endpoint error: {0}")]
    Endpoint(String),

    /// The completion endpoint returned a body we could not understand
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The completion request did not finish within the configured deadline
    #[error("Request timed out after {seconds}s")]
    Timeout {
        /// Deadline that elapsed
        seconds: u64,
    },

    /// An attachment could not be read
    #[error("Could not read file '{path}': {message}")]
    FileRead {
        /// Path that was attempted
        path: String,
        /// Underlying failure
        message: String,
    },

    /// A submit was attempted while another request is still pending
    #[error("A request is already in flight")]
    RequestInFlight,

    /// Workspace search failures
    #[error("Search error: {0}")]
    Search(String),

    /// Message-channel decoding failures
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Result type alias for atchat operations
///
/// Uses `anyhow::Error` so callers can attach context while still being
/// able to downcast to [`AtchatError`].
pub type Result<T> = anyhow::Result<T>;

/// Request-level failure of a single completion call
///
/// The `Display` form of every variant is the placeholder text shown to the
/// user in place of an assistant answer. Each failure class has its own
/// prefix so the transcript stays readable without a separate error path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// No credential stored; no request was attempted
    #[error("[API key not set]")]
    MissingCredential,

    /// Network-level failure
    #[error("[Request Error] {0}")]
    Transport(String),

    /// The endpoint answered with an `error` payload
    #[error("[Endpoint Error] {0}")]
    Endpoint(String),

    /// The body was not a JSON object
    #[error("[Error parsing response] {0}")]
    MalformedResponse(String),

    /// The request exceeded the configured deadline
    #[error("[Request timed out after {}s]", .0.as_secs())]
    Timeout(Duration),
}

impl RequestError {
    /// Short machine-friendly name of the failure class
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::Transport(_) => "transport_failure",
            Self::Endpoint(_) => "endpoint_error",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Timeout(_) => "timeout",
        }
    }
}

impl From<RequestError> for AtchatError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::MissingCredential => Self::MissingCredential("api key".to_string()),
            RequestError::Transport(msg) => Self::Transport(msg),
            RequestError::Endpoint(msg) => Self::Endpoint(msg),
            RequestError::MalformedResponse(msg) => Self::MalformedResponse(msg),
            RequestError::Timeout(d) => Self::Timeout {
                seconds: d.as_secs(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = AtchatError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_file_read_error_display() {
        let error = AtchatError::FileRead {
            path: "/work/src/a.rs".to_string(),
            message: "permission denied".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Could not read file '/work/src/a.rs': permission denied"
        );
    }

    #[test]
    fn test_timeout_error_display() {
        let error = AtchatError::Timeout { seconds: 30 };
        assert_eq!(error.to_string(), "Request timed out after 30s");
    }

    #[test]
    fn test_request_in_flight_display() {
        assert_eq!(
            AtchatError::RequestInFlight.to_string(),
            "A request is already in flight"
        );
    }

    #[test]
    fn test_request_error_placeholders_have_distinct_prefixes() {
        let rendered = [
            RequestError::MissingCredential.to_string(),
            RequestError::Transport("connection refused".into()).to_string(),
            RequestError::Endpoint("quota".into()).to_string(),
            RequestError::MalformedResponse("expected value".into()).to_string(),
            RequestError::Timeout(Duration::from_secs(5)).to_string(),
        ];

        assert_eq!(rendered[0], "[API key not set]");
        assert_eq!(rendered[1], "[Request Error] connection refused");
        assert_eq!(rendered[2], "[Endpoint Error] quota");
        assert_eq!(rendered[3], "[Error parsing response] expected value");
        assert_eq!(rendered[4], "[Request timed out after 5s]");

        let prefixes: std::collections::HashSet<_> = rendered
            .iter()
            .map(|s| s.split(']').next().unwrap_or_default().to_string())
            .collect();
        assert_eq!(prefixes.len(), rendered.len());
    }

    #[test]
    fn test_request_error_kind_names() {
        assert_eq!(RequestError::MissingCredential.kind(), "missing_credential");
        assert_eq!(
            RequestError::Timeout(Duration::from_secs(1)).kind(),
            "timeout"
        );
    }

    #[test]
    fn test_request_error_converts_to_crate_error() {
        let error: AtchatError = RequestError::Endpoint("quota".into()).into();
        assert!(matches!(error, AtchatError::Endpoint(ref m) if m == "quota"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: AtchatError = io_error.into();
        assert!(matches!(error, AtchatError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let error: AtchatError = json_error.into();
        assert!(matches!(error, AtchatError::Serialization(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: : yaml").unwrap_err();
        let error: AtchatError = yaml_error.into();
        assert!(matches!(error, AtchatError::Yaml(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AtchatError>();
        assert_send_sync::<RequestError>();
    }
}
