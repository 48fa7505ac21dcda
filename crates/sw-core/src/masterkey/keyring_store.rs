//! OS credential manager backend

use zeroize::Zeroizing;

use crate::error::StoreError;
use crate::traits::PasswordStore;

use super::{HASH_SUFFIX, SERVICE_NAME, USER_NAME};

/// Stores the master secret in the platform keyring
///
/// The secret lives under `sshw/master`, its hash under `sshw/master_hash`.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
    username: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
            username: USER_NAME.to_string(),
        }
    }

    fn entry(&self, account: &str) -> Result<keyring::Entry, StoreError> {
        keyring::Entry::new(&self.service, account).map_err(map_keyring_error)
    }

    fn hash_account(&self) -> String {
        format!("{}{}", self.username, HASH_SUFFIX)
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

fn map_keyring_error(err: keyring::Error) -> StoreError {
    match err {
        keyring::Error::NoEntry => StoreError::NotFound,
        other => StoreError::Backend(other.to_string()),
    }
}

fn ignore_missing(result: Result<(), StoreError>) -> Result<(), StoreError> {
    match result {
        Err(StoreError::NotFound) => Ok(()),
        other => other,
    }
}

impl PasswordStore for KeyringStore {
    fn name(&self) -> &'static str {
        "keyring"
    }

    fn get(&self) -> Result<Zeroizing<Vec<u8>>, StoreError> {
        let secret = self
            .entry(&self.username)?
            .get_password()
            .map_err(map_keyring_error)?;
        Ok(Zeroizing::new(secret.into_bytes()))
    }

    fn set(&self, secret: &[u8]) -> Result<(), StoreError> {
        let secret = std::str::from_utf8(secret)
            .map_err(|_| StoreError::Backend("keyring secrets must be UTF-8".into()))?;
        self.entry(&self.username)?
            .set_password(secret)
            .map_err(map_keyring_error)
    }

    fn get_hash(&self) -> Result<String, StoreError> {
        self.entry(&self.hash_account())?
            .get_password()
            .map_err(map_keyring_error)
    }

    fn set_hash(&self, hash: &str) -> Result<(), StoreError> {
        self.entry(&self.hash_account())?
            .set_password(hash)
            .map_err(map_keyring_error)
    }

    fn clear_cached(&self) -> Result<(), StoreError> {
        ignore_missing(
            self.entry(&self.username)?
                .delete_password()
                .map_err(map_keyring_error),
        )
    }

    fn delete(&self) -> Result<(), StoreError> {
        self.clear_cached()?;
        ignore_missing(
            self.entry(&self.hash_account())?
                .delete_password()
                .map_err(map_keyring_error),
        )
    }
}
