//! Named wallet records over a pluggable key-value backend.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use signerkit_store::KeyValueStore;

use crate::account::{Account, KeyType};
use crate::error::SignerError;

/// A persisted wallet credential, serialized as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    /// Derived ledger address.
    pub address: String,
    /// Hex-encoded public key.
    pub public_key: String,
    /// Hex-encoded platform credential id.
    pub credential_id: String,
    /// Scheme the record was created under.
    pub key_type: KeyType,
}

impl CredentialRecord {
    /// Materializes the record as a provider [`Account`].
    #[must_use]
    pub fn to_account(&self) -> Account {
        Account {
            address: self.address.clone(),
            public_key: self.public_key.clone(),
            key_type: self.key_type,
            group: None,
            credential_id: Some(self.credential_id.clone()),
        }
    }
}

/// Write-once wallet records addressed by user-chosen name.
///
/// A record, once created, is never overwritten or deleted; losing a
/// `WebAuthn` credential binding would orphan the funds it controls.
#[derive(Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct WalletStore {
    kv: Arc<dyn KeyValueStore>,
}

impl WalletStore {
    /// Wraps a key-value backend.
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Persists a new record under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::AlreadyExists`] if a record is already bound
    /// to `name`, [`SignerError::Serialization`] or
    /// [`SignerError::Store`] on backend failures.
    pub fn create(&self, name: &str, record: &CredentialRecord) -> Result<(), SignerError> {
        if self.exists(name)? {
            return Err(SignerError::AlreadyExists(name.to_string()));
        }
        let bytes = serde_json::to_vec(record)
            .map_err(|err| SignerError::Serialization(err.to_string()))?;
        self.kv.set(&record_key(name), &bytes)?;
        Ok(())
    }

    /// Loads the record bound to `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::NotFound`] if no record is bound to `name`.
    pub fn load(&self, name: &str) -> Result<CredentialRecord, SignerError> {
        let bytes = self
            .kv
            .get(&record_key(name))?
            .ok_or_else(|| SignerError::NotFound(name.to_string()))?;
        serde_json::from_slice(&bytes)
            .map_err(|err| SignerError::Serialization(err.to_string()))
    }

    /// Whether a record is bound to `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::Store`] on backend failures.
    pub fn exists(&self, name: &str) -> Result<bool, SignerError> {
        Ok(self.kv.contains(&record_key(name))?)
    }

    /// Returns the address of the wallet bound to `name` without opening a
    /// signer for it.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::NotFound`] if no record is bound to `name`.
    pub fn wallet_address(&self, name: &str) -> Result<String, SignerError> {
        Ok(self.load(name)?.address)
    }
}

fn record_key(name: &str) -> String {
    format!("wallet:{name}")
}

#[cfg(test)]
mod tests {
    use signerkit_store::MemoryStore;

    use super::*;

    fn record() -> CredentialRecord {
        CredentialRecord {
            address: "addr".to_string(),
            public_key: "02ab".to_string(),
            credential_id: "cafe".to_string(),
            key_type: KeyType::GrouplessWebauthn,
        }
    }

    fn store() -> WalletStore {
        WalletStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_create_then_load_round_trips() {
        let store = store();
        store.create("main", &record()).unwrap();
        assert_eq!(store.load("main").unwrap(), record());
        assert_eq!(store.wallet_address("main").unwrap(), "addr");
        assert!(store.exists("main").unwrap());
    }

    #[test]
    fn test_create_never_overwrites() {
        let store = store();
        store.create("main", &record()).unwrap();
        let err = store.create("main", &record()).unwrap_err();
        assert!(matches!(err, SignerError::AlreadyExists(name) if name == "main"));
    }

    #[test]
    fn test_load_missing_record_fails() {
        let err = store().load("missing").unwrap_err();
        assert!(matches!(err, SignerError::NotFound(name) if name == "missing"));
    }

    #[test]
    fn test_record_uses_camel_case_wire_names() {
        let json = serde_json::to_value(record()).unwrap();
        assert!(json.get("publicKey").is_some());
        assert!(json.get("credentialId").is_some());
        assert_eq!(json["keyType"], "gl-webauthn");
    }
}
