//! Shared fixtures for unit tests.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use wiremock::{Match, MockServer, Request};

use crate::api::ApiClient;
use crate::auth::{AccessCredential, CredentialStore, MemorySlot, TokenSlot};

/// Memory slot that stays inspectable after being boxed into a store
#[derive(Clone, Default)]
pub struct SharedSlot(Arc<MemorySlot>);

impl SharedSlot {
    pub fn is_empty(&self) -> bool {
        matches!(self.0.load(), Ok(None))
    }
}

impl TokenSlot for SharedSlot {
    fn load(&self) -> Result<Option<String>> {
        self.0.load()
    }

    fn save(&self, token: &str) -> Result<()> {
        self.0.save(token)
    }

    fn remove(&self) -> Result<()> {
        self.0.remove()
    }
}

pub struct Tiers {
    pub ephemeral: SharedSlot,
    pub durable: SharedSlot,
}

pub fn store_with_tiers() -> (Arc<CredentialStore>, Tiers) {
    let tiers = Tiers {
        ephemeral: SharedSlot::default(),
        durable: SharedSlot::default(),
    };
    let store = CredentialStore::new(
        Box::new(tiers.ephemeral.clone()),
        Box::new(tiers.durable.clone()),
    );
    (Arc::new(store), tiers)
}

pub fn client_for(server: &MockServer, store: Arc<CredentialStore>) -> ApiClient {
    ApiClient::new(server.uri(), Duration::from_secs(5), store).unwrap()
}

pub fn credential(token: &str) -> AccessCredential {
    AccessCredential::new(token).unwrap()
}

pub fn user_json(id: i64, role: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": "Anna Petrova",
        "role": role,
        "username": "apetrova",
    })
}

/// Matches requests that carry no `Authorization` header
pub struct NoAuthorization;

impl Match for NoAuthorization {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}
