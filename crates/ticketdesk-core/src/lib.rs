//! ticketdesk-core - session and credential management for the help desk client.
//!
//! The crate keeps a short-lived access credential in a two-tier store,
//! attaches it to protected calls, renews it through the backend's refresh
//! cookie when a call comes back 401 and replays the call once. Renewal is
//! single-flight: concurrent failures share one refresh request.
//!
//! `SessionManager` is the entry point for a UI: it runs the startup check and
//! handles login and logout. `ApiClient` performs authenticated calls.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

#[cfg(test)]
mod test_support;

pub use api::{ApiClient, ApiError, ApiRequest, ApiResponse};
pub use auth::{
    AccessCredential, CredentialStore, LoginRequest, PersistenceTier, RenewalCoordinator,
    RenewalOutcome, Route, SessionManager, SessionState, View,
};
pub use config::Config;
