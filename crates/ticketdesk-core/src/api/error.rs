//! Typed failures of help desk backend calls.
//!
//! Every non-success status is mapped once, in `from_status`. The response
//! hook only looks at 401; everything else reaches the caller unchanged.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// 403: signed in, but the role may not do this (e.g. a regular user
    /// opening the support queue)
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// 401 that survived renewal, or came from an auth endpoint
    #[error("Not signed in or session expired")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Too many requests - wait before retrying")]
    RateLimited,

    /// 5xx
    #[error("Help desk server error: {0}")]
    ServerError(String),

    /// Unreachable backend, timeout, or a body that could not be read
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Unexpected status or a body that does not match the contract
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Request body could not be serialized
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Longest response body, in bytes, kept inside an error
const MAX_ERROR_BODY_BYTES: usize = 500;

impl ApiError {
    /// Cut `body` at a char boundary at or below the limit
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_BYTES {
            return body.to_string();
        }
        let end = (0..=MAX_ERROR_BODY_BYTES)
            .rev()
            .find(|&end| body.is_char_boundary(end))
            .unwrap_or(0);
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Error for a non-success `status` with its response `body`
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let body = Self::truncate_body(body);
        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
            StatusCode::FORBIDDEN => ApiError::AccessDenied(body),
            StatusCode::NOT_FOUND => ApiError::NotFound(body),
            StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited,
            status if status.is_server_error() => ApiError::ServerError(body),
            status => ApiError::InvalidResponse(format!("Status {}: {}", status, body)),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    /// Message shown to the user when a login attempt fails.
    ///
    /// Rejections stay generic so the form does not reveal whether the login
    /// name exists.
    pub fn login_message(&self) -> &'static str {
        match self {
            ApiError::NetworkError(e) if e.is_timeout() => "Connection timed out. Please try again.",
            ApiError::NetworkError(_) => {
                "Unable to connect to server. Check your internet connection."
            }
            ApiError::RateLimited => "Too many attempts. Please wait and try again.",
            ApiError::ServerError(_) => "The server is unavailable. Please try again later.",
            _ => "Invalid login or password",
        }
    }
}
