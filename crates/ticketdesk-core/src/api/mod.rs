//! REST API client module for the help desk backend.
//!
//! This module provides the `ApiClient` for talking to the backend and the
//! request/response hooks around it. Protected calls carry the access
//! credential as a bearer token; a 401 triggers one single-flight renewal
//! through the refresh cookie and one replay of the failed call.

mod auth_endpoints;
pub mod client;
pub mod error;
pub mod interceptor;
pub mod request;
mod tickets;

pub use client::ApiClient;
pub use error::ApiError;
pub use request::{ApiRequest, ApiResponse};
