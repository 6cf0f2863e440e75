//! Error taxonomy for console operations
//!
//! Every fetch/save boundary converts failures into one of these kinds and
//! stores it in the state of the region that issued the request.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConsoleError>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConsoleError {
    /// The server rejected the session token
    #[error("Session expired or rejected by the server, please log in again")]
    AuthExpired,

    /// The server (or a local pre-check) rejected a create/update payload
    #[error("Validation error{}: {message}", .field.as_ref().map(|f| format!(" on '{}'", f)).unwrap_or_default())]
    Validation {
        field: Option<String>,
        message: String,
    },

    /// A view, record or related-record lookup came back empty
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// Network or HTTP failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with something we could not interpret
    #[error("Unexpected server response: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ConsoleError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            field: None,
            message: message.into(),
        }
    }

    pub fn field_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired)
    }

    /// Whether the affected region should offer a manual retry action.
    /// Nothing is ever retried automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::NotFound { .. })
    }

    /// Classify a reqwest failure
    pub fn from_reqwest(error: &reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            return Self::from_status(status.as_u16(), &error.to_string());
        }
        Self::Transport(error.to_string())
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => Self::AuthExpired,
            404 => Self::not_found(format!("HTTP 404: {}", body)),
            500..=599 => Self::Transport(format!("HTTP {}: {}", status, body)),
            _ => Self::Protocol(format!("HTTP {}: {}", status, body)),
        }
    }
}
