use std::fmt;

/// Short-lived bearer token issued by the backend.
///
/// The token is opaque to the client: its expiry is only discovered when the
/// backend answers 401. `Debug` output is redacted so tokens never reach logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessCredential(String);

impl AccessCredential {
    /// Wrap a raw token. Blank tokens are rejected.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessCredential(<redacted>)")
    }
}

/// Where the access credential lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistenceTier {
    /// Gone when the process ends
    #[default]
    Ephemeral,
    /// Survives restarts
    Durable,
}

impl PersistenceTier {
    /// Tier for a login's "remember me" choice
    pub fn from_remember(remember: bool) -> Self {
        if remember {
            PersistenceTier::Durable
        } else {
            PersistenceTier::Ephemeral
        }
    }

    pub fn other(self) -> Self {
        match self {
            PersistenceTier::Ephemeral => PersistenceTier::Durable,
            PersistenceTier::Durable => PersistenceTier::Ephemeral,
        }
    }
}
