//! Authentication module for managing the access credential and the session.
//!
//! This module provides:
//! - `CredentialStore`: Two-tier (ephemeral/durable) home of the access credential
//! - `RenewalCoordinator`: Single-flight renewal of an expired credential
//! - `SessionManager`: Startup check, login and logout for the surrounding UI
//! - `View`/`Route`: Which screen a session may see
//!
//! The refresh credential never passes through here; the backend keeps it in
//! a cookie.

pub mod credentials;
pub mod guard;
pub mod renewal;
pub mod session;
pub mod slots;
pub mod token;

pub use credentials::CredentialStore;
pub use guard::{Route, View};
pub use renewal::{RenewalCoordinator, RenewalOutcome};
pub use session::{BootstrapPhase, LoginRequest, SessionManager, SessionState};
pub use slots::{FileSlot, KeyringSlot, MemorySlot, TokenSlot};
pub use token::{AccessCredential, PersistenceTier};
