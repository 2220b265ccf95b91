//! Error types for Ontoclaw

use crate::protocol::codes;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("authentication failed: {reason}")]
    AuthFailed { reason: String },

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("invalid selection for '{key}': {reason}")]
    InvalidSelection { key: String, reason: String },

    #[error("invalid callback: {0}")]
    InvalidCallback(String),

    #[error("invalid ui spec: {0}")]
    InvalidUiSpec(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// JSON-RPC error code reported for this error.
    pub fn code(&self) -> i32 {
        match self {
            Self::AuthFailed { .. } => codes::AUTH,
            Self::SessionNotFound(_) => codes::NOT_FOUND,
            Self::MethodNotFound(_) => codes::METHOD_NOT_FOUND,
            Self::InvalidSelection { .. } | Self::InvalidCallback(_) | Self::InvalidUiSpec(_) => {
                codes::INVALID_PARAMS
            }
            Self::Internal(_) => codes::INTERNAL,
        }
    }

    pub fn auth_failed(reason: impl Into<String>) -> Self {
        Self::AuthFailed {
            reason: reason.into(),
        }
    }

    pub fn invalid_selection(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSelection {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl From<Error> for (i32, String) {
    fn from(e: Error) -> Self {
        (e.code(), e.to_string())
    }
}
