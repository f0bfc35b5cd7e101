//! In-memory store used by tests and ephemeral sessions.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::{KeyValueStore, StoreError, StoreResult};

/// Process-local [`KeyValueStore`] backed by a mutexed map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> StoreResult<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Lock("memory store mutex poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.lock()?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.lock()?.contains_key(key))
    }
}
