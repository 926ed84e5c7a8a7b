//! Client error types.

use crate::config::ConfigError;
use crate::upload::UploadError;

/// Errors from compliance API calls.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The API returned a non-2xx status.
    #[error("compliance API {endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// The API refused because conflicting work is in progress (HTTP 409).
    #[error("conflict at {endpoint}: {body}")]
    Conflict { endpoint: String, body: String },
    /// The addressed session or resource does not exist (HTTP 404).
    #[error("not found: {endpoint}")]
    NotFound { endpoint: String },
    /// Response body could not be decoded.
    #[error("failed to decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
    /// The event stream failed mid-read.
    #[error("stream transport error: {0}")]
    Transport(String),
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Documents rejected before sending.
    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl ClientError {
    /// Map a non-success status to the matching variant.
    pub fn from_status(endpoint: impl Into<String>, status: u16, body: String) -> Self {
        let endpoint = endpoint.into();
        match status {
            404 => Self::NotFound { endpoint },
            409 => Self::Conflict { endpoint, body },
            _ => Self::Api {
                endpoint,
                status,
                body,
            },
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
