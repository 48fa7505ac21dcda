//! Master password gate
//!
//! The master password derives the key for [`crate::cipher`]. Its bcrypt
//! hash is stored durably; the plaintext is cached in the same store after
//! the first successful verification so later invocations skip the prompt.

mod file;
mod keyring_store;
mod memory;

pub use file::{FileStore, MASTER_FILE_NAME};
pub use keyring_store::KeyringStore;
pub use memory::MemoryStore;

use std::sync::Arc;

use zeroize::Zeroizing;

use crate::error::{MasterKeyError, StoreError};
use crate::traits::{PasswordStore, Prompter};

/// Keyring service name
pub const SERVICE_NAME: &str = "sshw";
/// Keyring account holding the cached secret
pub const USER_NAME: &str = "master";
/// Suffix distinguishing the hash slot from the secret slot
pub const HASH_SUFFIX: &str = "_hash";

const ENTER_PROMPT: &str = "Enter master password: ";
const NEW_PROMPT: &str = "Enter new master password: ";

/// Pick the backing store for this host
///
/// The OS keyring is used when it already holds a secret; otherwise the
/// file store under the home directory.
pub fn select_store() -> Result<Arc<dyn PasswordStore>, StoreError> {
    let keyring = KeyringStore::new();
    match keyring.get() {
        Ok(_) => {
            tracing::debug!("Using keyring password store");
            Ok(Arc::new(keyring))
        }
        Err(e) => {
            tracing::debug!("Keyring unavailable ({}), using file store", e);
            Ok(Arc::new(FileStore::new()?))
        }
    }
}

/// Verifies, caches and rotates the master password
pub struct MasterPasswordGate {
    store: Arc<dyn PasswordStore>,
    prompter: Arc<dyn Prompter>,
    cost: u32,
}

impl MasterPasswordGate {
    pub fn new(store: Arc<dyn PasswordStore>, prompter: Arc<dyn Prompter>) -> Self {
        Self {
            store,
            prompter,
            cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Override the bcrypt cost factor
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    /// Return the master password, prompting if it is not cached
    ///
    /// A cached secret is returned as is. A prompted secret is checked
    /// against the stored hash and cached only when it matches.
    pub fn get_master_password(&self) -> Result<Zeroizing<Vec<u8>>, MasterKeyError> {
        match self.store.get() {
            Ok(secret) => {
                tracing::debug!("Master password served from {} cache", self.store.name());
                return Ok(secret);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        let entered = self.prompt(ENTER_PROMPT)?;
        self.verify(&entered)?;
        self.store.set(entered.as_bytes())?;
        Ok(Zeroizing::new(entered.as_bytes().to_vec()))
    }

    /// Set the master password for the first time
    pub fn set_master_password(&self) -> Result<(), MasterKeyError> {
        if self.store.get().is_ok() || self.store.get_hash().is_ok() {
            return Err(MasterKeyError::AlreadySet);
        }

        let secret = self.prompt(NEW_PROMPT)?;
        let hash = bcrypt::hash(secret.as_str(), self.cost)?;
        self.store.set_hash(&hash)?;
        self.store.set(secret.as_bytes())?;
        tracing::info!("Master password set in {} store", self.store.name());
        Ok(())
    }

    /// Replace the stored hash after verifying the current password
    ///
    /// The cached plaintext keeps the old value until
    /// [`invalidate_cache`](Self::invalidate_cache) is called.
    pub fn change_master_password(&self) -> Result<(), MasterKeyError> {
        self.get_master_password()?;

        let secret = self.prompt(NEW_PROMPT)?;
        let hash = bcrypt::hash(secret.as_str(), self.cost)?;
        self.store.set_hash(&hash)?;
        tracing::info!("Master password hash updated");
        Ok(())
    }

    /// Verify the current password, then delete both slots
    pub fn remove_master_password(&self) -> Result<(), MasterKeyError> {
        self.get_master_password()?;
        self.store.delete()?;
        tracing::info!("Master password removed from {} store", self.store.name());
        Ok(())
    }

    /// Drop the cached plaintext so the next access prompts again
    pub fn invalidate_cache(&self) -> Result<(), MasterKeyError> {
        self.store.clear_cached()?;
        Ok(())
    }

    fn prompt(&self, prompt: &str) -> Result<Zeroizing<String>, MasterKeyError> {
        self.prompter
            .read_secret(prompt)
            .map_err(MasterKeyError::Prompt)
    }

    fn verify(&self, entered: &str) -> Result<(), MasterKeyError> {
        let hash = match self.store.get_hash() {
            Ok(hash) => hash,
            Err(e) if e.is_not_found() => return Err(MasterKeyError::NotSet),
            Err(e) => return Err(e.into()),
        };
        if bcrypt::verify(entered, &hash)? {
            Ok(())
        } else {
            Err(MasterKeyError::InvalidPassword)
        }
    }
}

impl std::fmt::Debug for MasterPasswordGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterPasswordGate")
            .field("store", &self.store.name())
            .field("cost", &self.cost)
            .finish()
    }
}
