use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use tracing::{debug, warn};

use crate::config::{Config, DurableStore};

use super::slots::{FileSlot, KeyringSlot, MemorySlot, TokenSlot};
use super::token::{AccessCredential, PersistenceTier};

/// Two-tier home of the access credential.
///
/// At most one tier holds a credential: every `write` clears the other tier.
/// Storage is local, so none of the operations fail from the caller's point
/// of view. Slot errors are logged and a slot that cannot be read counts as
/// empty.
///
/// The store also counts session generations. `write` (a new sign-in) and
/// `clear` start a new generation. A renewal remembers the generation it
/// started in and only touches the store if that generation is still current,
/// so a renewal settling after logout cannot bring the credential back.
pub struct CredentialStore {
    ephemeral: Box<dyn TokenSlot>,
    durable: Box<dyn TokenSlot>,
    // Current generation; held across tier switches so readers never see a
    // half-done write
    generation: Mutex<u64>,
}

impl CredentialStore {
    pub fn new(ephemeral: Box<dyn TokenSlot>, durable: Box<dyn TokenSlot>) -> Self {
        Self {
            ephemeral,
            durable,
            generation: Mutex::new(0),
        }
    }

    /// Both tiers in memory
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemorySlot::new()), Box::new(MemorySlot::new()))
    }

    /// In-memory ephemeral tier plus the configured durable backend
    pub fn from_config(config: &Config) -> Result<Self> {
        let durable: Box<dyn TokenSlot> = match config.durable_store {
            DurableStore::File => Box::new(FileSlot::in_dir(&config.state_dir()?)),
            DurableStore::Keyring => Box::new(KeyringSlot::open()?),
        };
        Ok(Self::new(Box::new(MemorySlot::new()), durable))
    }

    /// Store `credential` in `tier`, clear the other tier and start a new
    /// generation
    pub fn write(&self, credential: &AccessCredential, tier: PersistenceTier) {
        let mut generation = self.lock();
        *generation += 1;
        self.store(credential, tier);
    }

    /// Store a renewed credential, unless the session moved on since
    /// `generation`. Returns whether the credential was stored.
    pub fn write_if_current(
        &self,
        credential: &AccessCredential,
        tier: PersistenceTier,
        generation: u64,
    ) -> bool {
        let current = self.lock();
        if *current != generation {
            debug!(generation, current = *current, "Discarding credential from an older session");
            return false;
        }
        self.store(credential, tier);
        true
    }

    /// Credential from whichever tier holds one
    pub fn read(&self) -> Option<AccessCredential> {
        let _generation = self.lock();
        self.load(PersistenceTier::Durable)
            .or_else(|| self.load(PersistenceTier::Ephemeral))
    }

    /// Remove the credential from both tiers and start a new generation
    pub fn clear(&self) {
        let mut generation = self.lock();
        *generation += 1;
        self.remove_all();
    }

    /// Clear after a failed renewal, unless the session moved on since
    /// `generation`. Returns whether the store was cleared.
    pub fn clear_if_current(&self, generation: u64) -> bool {
        let mut current = self.lock();
        if *current != generation {
            return false;
        }
        *current += 1;
        self.remove_all();
        true
    }

    /// Tier currently holding the credential; `Ephemeral` when both are empty
    pub fn current_tier(&self) -> PersistenceTier {
        let _generation = self.lock();
        self.tier_unlocked()
    }

    pub fn generation(&self) -> u64 {
        *self.lock()
    }

    /// Tier and generation read together, as a renewal needs them
    pub fn renewal_target(&self) -> (PersistenceTier, u64) {
        let generation = self.lock();
        (self.tier_unlocked(), *generation)
    }

    fn store(&self, credential: &AccessCredential, tier: PersistenceTier) {
        if let Err(e) = self.slot(tier).save(credential.as_str()) {
            warn!(?tier, error = %e, "Failed to store access credential");
        }
        if let Err(e) = self.slot(tier.other()).remove() {
            warn!(tier = ?tier.other(), error = %e, "Failed to clear access credential");
        }
        debug!(?tier, "Access credential stored");
    }

    fn remove_all(&self) {
        for tier in [PersistenceTier::Ephemeral, PersistenceTier::Durable] {
            if let Err(e) = self.slot(tier).remove() {
                warn!(?tier, error = %e, "Failed to clear access credential");
            }
        }
        debug!("Access credential cleared");
    }

    fn tier_unlocked(&self) -> PersistenceTier {
        if self.load(PersistenceTier::Durable).is_some() {
            PersistenceTier::Durable
        } else {
            PersistenceTier::Ephemeral
        }
    }

    fn load(&self, tier: PersistenceTier) -> Option<AccessCredential> {
        match self.slot(tier).load() {
            Ok(token) => token.and_then(AccessCredential::new),
            Err(e) => {
                warn!(?tier, error = %e, "Treating unreadable credential slot as empty");
                None
            }
        }
    }

    fn slot(&self, tier: PersistenceTier) -> &dyn TokenSlot {
        match tier {
            PersistenceTier::Ephemeral => self.ephemeral.as_ref(),
            PersistenceTier::Durable => self.durable.as_ref(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, u64> {
        self.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
