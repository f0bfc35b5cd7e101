//! Local key-value storage primitives for signerkit.
//!
//! The core crate persists named credential records through the
//! [`KeyValueStore`] trait. Two implementations are provided:
//!
//! * [`MemoryStore`] — process-local map, intended for tests and ephemeral
//!   sessions.
//! * [`FileStore`] — one file per key under a root directory, with atomic
//!   single-key writes (temp file + rename).
//!
//! The store deliberately offers no transactions beyond the atomic
//! single-key set: keys are caller-chosen names and collisions are
//! explicit.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;

/// Error returned by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying filesystem failure.
    #[error("io_error: {0}")]
    Io(#[from] std::io::Error),
    /// The in-process lock guarding the store was poisoned.
    #[error("lock_error: {0}")]
    Lock(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A flat, machine-local mapping from caller-chosen names to byte blobs.
///
/// Implementations must make `set` atomic per key; readers never observe a
/// partially written value.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value bound to `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Binds `value` to `key`, replacing any previous binding atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Reports whether `key` is bound.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}
