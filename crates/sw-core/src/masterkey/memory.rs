//! In-process password store

use std::sync::Mutex;

use zeroize::Zeroizing;

use crate::error::StoreError;
use crate::traits::PasswordStore;

#[derive(Debug, Default)]
struct Slots {
    secret: Option<Zeroizing<Vec<u8>>>,
    hash: Option<String>,
}

/// Keeps both slots in memory; nothing survives the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<Slots>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_slots<T>(&self, f: impl FnOnce(&mut Slots) -> T) -> Result<T, StoreError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| StoreError::Backend("memory store poisoned".into()))?;
        Ok(f(&mut slots))
    }
}

impl PasswordStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self) -> Result<Zeroizing<Vec<u8>>, StoreError> {
        self.with_slots(|s| s.secret.clone())?
            .ok_or(StoreError::NotFound)
    }

    fn set(&self, secret: &[u8]) -> Result<(), StoreError> {
        self.with_slots(|s| s.secret = Some(Zeroizing::new(secret.to_vec())))
    }

    fn get_hash(&self) -> Result<String, StoreError> {
        self.with_slots(|s| s.hash.clone())?
            .ok_or(StoreError::NotFound)
    }

    fn set_hash(&self, hash: &str) -> Result<(), StoreError> {
        self.with_slots(|s| s.hash = Some(hash.to_string()))
    }

    fn clear_cached(&self) -> Result<(), StoreError> {
        self.with_slots(|s| s.secret = None)
    }

    fn delete(&self) -> Result<(), StoreError> {
        self.with_slots(|s| *s = Slots::default())
    }
}
