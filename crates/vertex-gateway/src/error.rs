//! Error types for the gateway
//!
//! `UpstreamError` classifies failures of a single predict call so the
//! executor can decide whether to retry. `GatewayError` is what the services
//! and HTTP handlers surface to callers.

use thiserror::Error;

/// Failure of one call to the upstream predict API
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized - check access token")]
    Unauthorized,

    #[error("Rate limited - too many requests")]
    RateLimited,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("HTTP error ({0}): {1}")]
    HttpError(u16, String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Model returned no predictions")]
    EmptyPrediction,
}

impl UpstreamError {
    /// Network failures without a response, 429 and 5xx are transient
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            UpstreamError::Timeout
                | UpstreamError::Connection(_)
                | UpstreamError::Network(_)
                | UpstreamError::RateLimited
                | UpstreamError::ServerError(_, _)
        )
    }

    /// Map an HTTP status and body to the matching variant
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => UpstreamError::Unauthorized,
            429 => UpstreamError::RateLimited,
            400 => UpstreamError::BadRequest(body),
            500..=599 => UpstreamError::ServerError(status, body),
            _ => UpstreamError::HttpError(status, body),
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Timeout
        } else if e.is_connect() {
            UpstreamError::Connection(e.to_string())
        } else if e.is_decode() {
            UpstreamError::ParseError(e.to_string())
        } else {
            UpstreamError::Network(e.to_string())
        }
    }
}

/// Errors surfaced by the gateway services
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Credentials or project are missing; a client-side problem
    #[error("Vertex AI is not configured: set VERTEX_AI_ACCESS_TOKEN and GOOGLE_CLOUD_PROJECT")]
    NotConfigured,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True for errors caused by the request rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GatewayError::NotConfigured
                | GatewayError::Validation(_)
                | GatewayError::Forbidden(_)
                | GatewayError::NotFound(_)
        )
    }
}
