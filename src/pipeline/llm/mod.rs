//! Hosted model access: the raw API collaborator and the retrying client.

pub mod gemini;
pub mod retry;
pub mod types;

pub use gemini::*;
pub use retry::*;
pub use types::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a single model API request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelApiError {
    #[error("Rate limited by model API: {0}")]
    RateLimited(String),

    #[error("Model API server error (status {status}): {body}")]
    Server { status: u16, body: String },

    #[error("Model API request timed out: {0}")]
    Timeout(String),

    #[error("Model API rejected credentials: {0}")]
    Unauthorized(String),

    #[error("Model API rejected request (status {status}): {body}")]
    MalformedRequest { status: u16, body: String },

    #[error("Response blocked by content filter: {0}")]
    Blocked(String),

    #[error("Could not reach model API: {0}")]
    Transport(String),
}

impl ModelApiError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::RateLimited(_) => ErrorClass::RateLimit,
            Self::Server { .. } | Self::Transport(_) => ErrorClass::ServerError,
            Self::Timeout(_) => ErrorClass::Timeout,
            Self::Unauthorized(_) => ErrorClass::Auth,
            Self::MalformedRequest { .. } => ErrorClass::MalformedRequest,
            Self::Blocked(_) => ErrorClass::ContentBlocked,
        }
    }
}

/// Coarse failure category used by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    RateLimit,
    ServerError,
    Timeout,
    Auth,
    MalformedRequest,
    ContentBlocked,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::ServerError => "server_error",
            Self::Timeout => "timeout",
            Self::Auth => "auth",
            Self::MalformedRequest => "malformed_request",
            Self::ContentBlocked => "content_blocked",
        }
    }
}

impl std::str::FromStr for ErrorClass {
    type Err = crate::models::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rate_limit" => Ok(Self::RateLimit),
            "server_error" => Ok(Self::ServerError),
            "timeout" => Ok(Self::Timeout),
            "auth" => Ok(Self::Auth),
            "malformed_request" => Ok(Self::MalformedRequest),
            "content_blocked" => Ok(Self::ContentBlocked),
            _ => Err(crate::models::ParseEnumError {
                field: "ErrorClass".into(),
                value: s.into(),
            }),
        }
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
