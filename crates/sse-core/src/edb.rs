//! Encrypted database contract and in-memory implementation
//!
//! The on-disk store is an external collaborator; the search cores only
//! require this ordered-map contract over fixed-width tokens and payloads.
//! `MemoryEdb` is the reference implementation used by the tests and by
//! deployments that keep the encrypted index resident.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::tokens::{IndexValue, UpdateToken};
use crate::{Error, Result};

/// Contract over the encrypted key-value store.
///
/// `get` calls may run concurrently; `get_and_remove` is the linearizable
/// pair that destructive searches rely on, so an implementation must make
/// it atomic per key.
pub trait EncryptedDb<T: IndexValue>: Send + Sync {
    fn get(&self, token: &UpdateToken) -> Result<Option<T>>;

    /// Store `value` under `token`, overwriting any previous value.
    fn put(&self, token: UpdateToken, value: T) -> Result<()>;

    /// Remove the entry for `token`. Idempotent.
    fn remove(&self, token: &UpdateToken) -> Result<()>;

    /// Atomic get-then-remove of a single key.
    fn get_and_remove(&self, token: &UpdateToken) -> Result<Option<T>>;

    /// Durability boundary.
    fn flush(&self) -> Result<()>;
}

/// In-memory encrypted database
pub struct MemoryEdb<T> {
    entries: RwLock<HashMap<UpdateToken, T>>,
}

impl<T> MemoryEdb<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, token: &UpdateToken) -> bool {
        self.entries
            .read()
            .map(|m| m.contains_key(token))
            .unwrap_or(false)
    }
}

impl<T> Default for MemoryEdb<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> Error {
    Error::Store("encrypted database lock poisoned".to_string())
}

impl<T: IndexValue> EncryptedDb<T> for MemoryEdb<T> {
    fn get(&self, token: &UpdateToken) -> Result<Option<T>> {
        Ok(self.entries.read().map_err(|_| poisoned())?.get(token).copied())
    }

    fn put(&self, token: UpdateToken, value: T) -> Result<()> {
        self.entries.write().map_err(|_| poisoned())?.insert(token, value);
        Ok(())
    }

    fn remove(&self, token: &UpdateToken) -> Result<()> {
        self.entries.write().map_err(|_| poisoned())?.remove(token);
        Ok(())
    }

    fn get_and_remove(&self, token: &UpdateToken) -> Result<Option<T>> {
        Ok(self.entries.write().map_err(|_| poisoned())?.remove(token))
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
