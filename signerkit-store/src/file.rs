//! File-backed store with atomic single-key writes.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::{KeyValueStore, StoreResult};

/// [`KeyValueStore`] persisting each key as one file under a root directory.
///
/// Keys are hex-encoded into file names so arbitrary caller-chosen names are
/// safe on every filesystem. Writes go to a temp file first and are renamed
/// into place, so a concurrent reader sees either the old value or the new
/// one, never a torn write.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `root`. The directory is created lazily on
    /// the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(hex::encode(key.as_bytes()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(self.entry_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        fs::create_dir_all(&self.root)?;
        let target = self.entry_path(key);
        let tmp = target.with_extension("tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &target)?;
        Ok(())
    }
}
