//! Error types for configuration sessions.
//!
//! All fallible operations in motionctl return [`PanelError`]. Local
//! validation failures are *not* errors in this sense: they are ordinary
//! values ([`Validation`](crate::Validation)) kept next to the pending edit
//! that produced them. `PanelError` covers the remote side: transport
//! failures, HTTP status failures, undecodable documents, authentication, and
//! the single-flight apply guard.
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use motionctl::PanelError;
//!
//! let error = PanelError::transport("connection refused");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use thiserror::Error;

/// Result type alias for motionctl operations.
pub type Result<T, E = PanelError> = std::result::Result<T, E>;

/// Main error type for motionctl operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PanelError {
    #[error("Request to the Motion daemon failed: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Motion daemon returned HTTP {status} for {endpoint}")]
    Http { status: u16, endpoint: String },

    #[error("Could not decode {context}: {details}")]
    Decode { context: String, details: String },

    #[error("Not authorized: {reason}")]
    Unauthorized { reason: String },

    #[error("Too many attempts, retry later")]
    RateLimited,

    #[error("Invalid scope '{input}'")]
    InvalidScope { input: String },

    #[error("Configuration error: {details}")]
    Config { details: String },

    #[error("Restart of scope {scope} failed: {reason}")]
    Restart { scope: String, reason: String },

    #[error("An apply is already in flight")]
    InFlight,
}

impl PanelError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            PanelError::Transport { .. } => true,
            PanelError::Http { status, .. } => *status >= 500,
            PanelError::RateLimited => true,
            PanelError::Restart { .. } => true,
            PanelError::InFlight => true,
            PanelError::Decode { .. } => false,
            PanelError::Unauthorized { .. } => false,
            PanelError::InvalidScope { .. } => false,
            PanelError::Config { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            PanelError::Transport { .. } => vec![
                "Check that the Motion daemon is running",
                "Verify the configured base URL and port",
                "Retry the request",
            ],
            PanelError::Http { .. } => vec![
                "Check the daemon log for the rejected request",
                "Verify the web control API is enabled",
            ],
            PanelError::Decode { .. } => vec![
                "Check that the daemon version matches this client",
                "Inspect the raw response body",
            ],
            PanelError::Unauthorized { .. } => vec![
                "Log in again to obtain a fresh session",
                "Check that the account has the admin role",
            ],
            PanelError::RateLimited => vec!["Wait before trying to log in again"],
            PanelError::InvalidScope { .. } => vec![
                "Use 'default', '0', 'camera:<id>' or a camera number",
            ],
            PanelError::Config { .. } => vec![
                "Check the configuration file syntax",
                "Verify the base URL is absolute",
            ],
            PanelError::Restart { .. } => vec![
                "Restart the camera manually from the daemon",
                "Check the daemon log for the restart failure",
            ],
            PanelError::InFlight => vec!["Wait for the current apply to finish"],
        }
    }

    /// Helper constructor for transport errors.
    pub fn transport(reason: impl Into<String>) -> Self {
        PanelError::Transport { reason: reason.into(), source: None }
    }

    /// Helper constructor for transport errors with source.
    pub fn transport_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        PanelError::Transport { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for HTTP status failures.
    pub fn http_status(status: u16, endpoint: impl Into<String>) -> Self {
        PanelError::Http { status, endpoint: endpoint.into() }
    }

    /// Helper constructor for decode errors.
    pub fn decode(context: impl Into<String>, details: impl Into<String>) -> Self {
        PanelError::Decode { context: context.into(), details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(details: impl Into<String>) -> Self {
        PanelError::Config { details: details.into() }
    }

    /// Helper constructor for restart failures.
    pub fn restart_failed(scope: impl Into<String>, reason: impl Into<String>) -> Self {
        PanelError::Restart { scope: scope.into(), reason: reason.into() }
    }
}

impl From<reqwest::Error> for PanelError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return PanelError::decode("response body", err.to_string());
        }
        if let Some(status) = err.status() {
            let endpoint = err.url().map(|u| u.path().to_string()).unwrap_or_default();
            return PanelError::http_status(status.as_u16(), endpoint);
        }
        PanelError::transport_with_source("HTTP request failed", Box::new(err))
    }
}

impl From<serde_json::Error> for PanelError {
    fn from(err: serde_json::Error) -> Self {
        PanelError::decode("JSON document", err.to_string())
    }
}

impl From<serde_yaml_ng::Error> for PanelError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        PanelError::config(err.to_string())
    }
}
