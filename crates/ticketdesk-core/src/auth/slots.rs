//! Storage backends for a single access-credential string.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use keyring::credential::{CredentialBuilder, CredentialPersistence};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Keychain service name
const SERVICE_NAME: &str = "ticketdesk";

/// Keychain account holding the access token
const KEYRING_ACCOUNT: &str = "access_token";

/// Credential file name in the state directory
pub const CREDENTIAL_FILE: &str = "credential.json";

/// A key-value slot holding at most one token.
pub trait TokenSlot: Send + Sync {
    /// Load the stored token. Malformed data loads as `None`.
    fn load(&self) -> Result<Option<String>>;

    fn save(&self, token: &str) -> Result<()>;

    /// Remove the token. Removing an empty slot is not an error.
    fn remove(&self) -> Result<()>;
}

/// Token held in process memory.
#[derive(Default)]
pub struct MemorySlot {
    token: Mutex<Option<String>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenSlot for MemorySlot {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.token.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredCredential {
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(rename = "savedAt")]
    saved_at: DateTime<Utc>,
}

/// Token persisted as JSON in a file.
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Slot at the standard file name inside `state_dir`
    pub fn in_dir(state_dir: &Path) -> Self {
        Self::new(state_dir.join(CREDENTIAL_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenSlot for FileSlot {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read credential file {}", self.path.display()))?;

        match serde_json::from_str::<StoredCredential>(&contents) {
            Ok(stored) if !stored.access_token.trim().is_empty() => Ok(Some(stored.access_token)),
            Ok(_) => {
                warn!(path = %self.path.display(), "Credential file holds an empty token");
                Ok(None)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring malformed credential file");
                Ok(None)
            }
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let stored = StoredCredential {
            access_token: token.to_string(),
            saved_at: Utc::now(),
        };
        let contents =
            serde_json::to_string_pretty(&stored).context("Failed to serialize credential")?;

        // Owner-only permissions
        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .with_context(|| format!("Failed to open {} for writing", self.path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&self.path, contents)
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        Ok(())
    }

    fn remove(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).with_context(|| {
                format!("Failed to remove credential file {}", self.path.display())
            })?;
        }
        Ok(())
    }
}

/// Token stored in the OS keychain.
pub struct KeyringSlot {
    account: String,
}

impl KeyringSlot {
    /// Slot in the platform keychain.
    ///
    /// Fails when keyring has no persistent backend for this platform; its
    /// fallback mock store forgets the token as soon as the entry is dropped.
    pub fn open() -> Result<Self> {
        if !is_persistent(keyring::default::default_credential_builder().as_ref()) {
            bail!(
                "No persistent keychain is available on this platform; \
                 set \"durable_store\": \"file\" in the config"
            );
        }
        Ok(Self {
            account: KEYRING_ACCOUNT.to_string(),
        })
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.account).context("Failed to create keyring entry")
    }
}

/// Whether credentials built by `builder` survive a restart
fn is_persistent(builder: &CredentialBuilder) -> bool {
    matches!(builder.persistence(), CredentialPersistence::UntilDelete)
}

impl TokenSlot for KeyringSlot {
    fn load(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(token) if !token.trim().is_empty() => Ok(Some(token)),
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(None),
            Err(keyring::Error::BadEncoding(_)) => {
                warn!("Ignoring undecodable keychain credential");
                Ok(None)
            }
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        self.entry()?
            .set_password(token)
            .context("Failed to store token in keychain")
    }

    fn remove(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}
