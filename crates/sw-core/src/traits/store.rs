//! Password store trait

use zeroize::Zeroizing;

use crate::error::StoreError;

/// Storage for the master secret and its verification hash
///
/// Both slots live under one logical entry. Every method reports an empty
/// slot as [`StoreError::NotFound`] so callers can tell "never set" apart
/// from a broken backend.
pub trait PasswordStore: Send + Sync {
    /// Short backend name for log messages
    fn name(&self) -> &'static str;

    /// Cached plaintext secret
    fn get(&self) -> Result<Zeroizing<Vec<u8>>, StoreError>;

    /// Cache the plaintext secret
    fn set(&self, secret: &[u8]) -> Result<(), StoreError>;

    /// Stored bcrypt hash of the secret
    fn get_hash(&self) -> Result<String, StoreError>;

    /// Replace the stored hash
    fn set_hash(&self, hash: &str) -> Result<(), StoreError>;

    /// Drop the cached plaintext, keeping the hash
    ///
    /// Succeeds when nothing is cached.
    fn clear_cached(&self) -> Result<(), StoreError>;

    /// Remove both the cached secret and the hash
    ///
    /// Succeeds when either slot is already empty.
    fn delete(&self) -> Result<(), StoreError>;
}
