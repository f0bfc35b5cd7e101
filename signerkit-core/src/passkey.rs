//! Provider backed by a platform `WebAuthn` credential.
//!
//! Signing runs an assertion ceremony over the transaction id, canonicalizes
//! the DER signature and packs the ceremony metadata into 64-byte chunks,
//! with the signature chunk last. Submission therefore always takes the
//! signature-list path, whatever the transaction kind.

use std::sync::Arc;

use async_trait::async_trait;

use crate::account::{Account, KeyType};
use crate::address::{contract_id_from_address, derive_address};
use crate::error::SignerError;
use crate::flow::{self, SignatureSet, TxSigner};
use crate::node::{BuildPlan, NodeClient};
use crate::params::{
    DeployContractTxParams, DeployContractTxResult, ExecuteScriptTxParams, ExecuteScriptTxResult,
    TransferTxParams, TransferTxResult, UnsignedTxParams, UnsignedTxResult,
};
use crate::provider::{ensure_selected, SignerProvider};
use crate::signature::canonicalize_der_signature;
use crate::store::{CredentialRecord, WalletStore};
use crate::webauthn::{
    encode_assertion_payload, parse_attestation_object, CredentialCreationRequest,
    PlatformAuthenticator,
};

/// Registration challenge length. The registration challenge is not
/// replayed on chain, it only has to be fresh.
const CREATION_CHALLENGE_LEN: usize = 16;

/// [`SignerProvider`] over a stored `WebAuthn` credential.
pub struct PasskeySigner {
    account: Account,
    credential_id: Vec<u8>,
    node: NodeClient,
    authenticator: Arc<dyn PlatformAuthenticator>,
}

impl PasskeySigner {
    /// Opens a signer over an existing credential record.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::Codec`] if the record was not created under
    /// the `WebAuthn` scheme or its credential id is not hex.
    pub fn new(
        record: &CredentialRecord,
        node: NodeClient,
        authenticator: Arc<dyn PlatformAuthenticator>,
    ) -> Result<Self, SignerError> {
        if record.key_type != KeyType::GrouplessWebauthn {
            return Err(SignerError::Codec(format!(
                "record key type {} cannot drive a webauthn signer",
                record.key_type
            )));
        }
        let credential_id = hex::decode(&record.credential_id)
            .map_err(|err| SignerError::Codec(format!("invalid credential id hex: {err}")))?;
        Ok(Self {
            account: record.to_account(),
            credential_id,
            node,
            authenticator,
        })
    }

    /// Loads the record bound to `name` and opens a signer over it.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::NotFound`] if no record is bound to `name`,
    /// plus the failure modes of [`Self::new`].
    pub fn load(
        store: &WalletStore,
        name: &str,
        node: NodeClient,
        authenticator: Arc<dyn PlatformAuthenticator>,
    ) -> Result<Self, SignerError> {
        let record = store.load(name)?;
        Self::new(&record, node, authenticator)
    }

    /// Registers a new credential and persists its record under `name`.
    ///
    /// Runs a creation ceremony over a fresh random challenge, extracts
    /// the attested public key, derives the groupless address and writes
    /// the record. Nothing is written if any step fails.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::AlreadyExists`] if `name` is taken (checked
    /// before the ceremony starts), [`SignerError::Ceremony`] if the
    /// ceremony fails, and [`SignerError::Codec`] if the attestation is
    /// malformed.
    pub async fn create_wallet(
        store: &WalletStore,
        authenticator: &dyn PlatformAuthenticator,
        rp_name: &str,
        name: &str,
    ) -> Result<CredentialRecord, SignerError> {
        if store.exists(name)? {
            return Err(SignerError::AlreadyExists(name.to_string()));
        }

        let challenge: [u8; CREATION_CHALLENGE_LEN] = rand::random();
        let attestation = authenticator
            .create_credential(&CredentialCreationRequest {
                rp_name: rp_name.to_string(),
                user_name: name.to_string(),
                challenge: challenge.to_vec(),
            })
            .await?;
        let credential = parse_attestation_object(&attestation)?;

        let record = CredentialRecord {
            address: derive_address(&credential.public_key, KeyType::GrouplessWebauthn)?,
            public_key: hex::encode(credential.public_key),
            credential_id: hex::encode(&credential.credential_id),
            key_type: KeyType::GrouplessWebauthn,
        };
        store.create(name, &record)?;
        tracing::info!(wallet = name, address = %record.address, "registered webauthn wallet");
        Ok(record)
    }

    fn check_selected(&self, signer_address: &str) -> Result<(), SignerError> {
        ensure_selected(&self.account, signer_address)
    }

    async fn submit(&self, plan: &BuildPlan) -> Result<(String, SignatureSet), SignerError> {
        flow::submit_plan(&self.node, self, plan).await
    }
}

#[async_trait]
impl TxSigner for PasskeySigner {
    async fn sign_tx_id(&self, tx_id: &str) -> Result<SignatureSet, SignerError> {
        let challenge = hex::decode(tx_id)
            .map_err(|err| SignerError::Codec(format!("invalid tx id hex: {err}")))?;
        let assertion = self
            .authenticator
            .get_assertion(&challenge, &self.credential_id)
            .await?;

        let signature = canonicalize_der_signature(&assertion.signature)?;
        let mut chunks = encode_assertion_payload(
            &assertion.authenticator_data,
            &assertion.client_data_json,
        )?;
        chunks.push(signature);
        Ok(SignatureSet::Chunked(chunks.iter().map(hex::encode).collect()))
    }
}

#[async_trait]
impl SignerProvider for PasskeySigner {
    fn selected_account(&self) -> &Account {
        &self.account
    }

    async fn sign_and_submit_transfer_tx(
        &self,
        params: &TransferTxParams,
    ) -> Result<TransferTxResult, SignerError> {
        self.check_selected(&params.signer_address)?;
        let request = params.to_request(&self.account.public_key, self.account.key_type);
        let plan = self.node.build_transfer(&request).await?;
        let unsigned_tx = plan.primary.unsigned_tx.clone();
        let (tx_id, signature) = self.submit(&plan).await?;
        Ok(TransferTxResult {
            tx_id,
            unsigned_tx,
            signature,
        })
    }

    async fn sign_and_submit_deploy_contract_tx(
        &self,
        params: &DeployContractTxParams,
    ) -> Result<DeployContractTxResult, SignerError> {
        self.check_selected(&params.signer_address)?;
        let request =
            params.to_request(&self.account.public_key, self.account.key_type, params.group);
        let plan = self.node.build_deploy_contract(&request).await?;

        let contract_address = plan.primary.contract_address.clone().ok_or_else(|| {
            SignerError::Serialization("deploy build response has no contract address".to_string())
        })?;
        let contract_id = contract_id_from_address(&contract_address)?;
        let unsigned_tx = plan.primary.unsigned_tx.clone();
        let (tx_id, signature) = self.submit(&plan).await?;
        Ok(DeployContractTxResult {
            tx_id,
            unsigned_tx,
            signature,
            contract_address,
            contract_id,
        })
    }

    async fn sign_and_submit_execute_script_tx(
        &self,
        params: &ExecuteScriptTxParams,
    ) -> Result<ExecuteScriptTxResult, SignerError> {
        self.check_selected(&params.signer_address)?;
        let request =
            params.to_request(&self.account.public_key, self.account.key_type, params.group);
        let plan = self.node.build_execute_script(&request).await?;
        let unsigned_tx = plan.primary.unsigned_tx.clone();
        let (tx_id, signature) = self.submit(&plan).await?;
        Ok(ExecuteScriptTxResult {
            tx_id,
            unsigned_tx,
            signature,
        })
    }

    async fn sign_and_submit_unsigned_tx(
        &self,
        params: &UnsignedTxParams,
    ) -> Result<UnsignedTxResult, SignerError> {
        self.check_selected(&params.signer_address)?;
        let tx = self.node.decode_unsigned_tx(&params.unsigned_tx).await?;
        let (tx_id, signature) = flow::sign_and_submit_tx(&self.node, self, &tx).await?;
        Ok(UnsignedTxResult {
            tx_id,
            unsigned_tx: tx.unsigned_tx,
            signature,
        })
    }

    async fn sign_unsigned_tx(
        &self,
        params: &UnsignedTxParams,
    ) -> Result<UnsignedTxResult, SignerError> {
        self.check_selected(&params.signer_address)?;
        let tx = self.node.decode_unsigned_tx(&params.unsigned_tx).await?;
        let signature = self.sign_tx_id(&tx.tx_id).await?;
        Ok(UnsignedTxResult {
            tx_id: tx.tx_id,
            unsigned_tx: tx.unsigned_tx,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use signerkit_store::MemoryStore;

    use super::*;
    use crate::webauthn::Assertion;

    struct NoCeremony;

    #[async_trait]
    impl PlatformAuthenticator for NoCeremony {
        async fn create_credential(
            &self,
            _request: &CredentialCreationRequest,
        ) -> Result<Vec<u8>, SignerError> {
            Err(SignerError::Ceremony("unexpected ceremony".to_string()))
        }

        async fn get_assertion(
            &self,
            _challenge: &[u8],
            _credential_id: &[u8],
        ) -> Result<Assertion, SignerError> {
            Err(SignerError::Ceremony("unexpected ceremony".to_string()))
        }
    }

    fn record() -> CredentialRecord {
        CredentialRecord {
            address: "addr".to_string(),
            public_key: "02ab".to_string(),
            credential_id: "cafe".to_string(),
            key_type: KeyType::GrouplessWebauthn,
        }
    }

    #[test]
    fn test_new_rejects_non_webauthn_records() {
        let mut record = record();
        record.key_type = KeyType::Default;
        assert!(matches!(
            PasskeySigner::new(
                &record,
                NodeClient::new("http://localhost:12973"),
                Arc::new(NoCeremony)
            ),
            Err(SignerError::Codec(_))
        ));
    }

    #[test]
    fn test_new_rejects_malformed_credential_id() {
        let mut record = record();
        record.credential_id = "not-hex".to_string();
        assert!(matches!(
            PasskeySigner::new(
                &record,
                NodeClient::new("http://localhost:12973"),
                Arc::new(NoCeremony)
            ),
            Err(SignerError::Codec(_))
        ));
    }

    #[tokio::test]
    async fn test_create_wallet_checks_the_name_before_any_ceremony() {
        let store = WalletStore::new(Arc::new(MemoryStore::new()));
        store.create("main", &record()).unwrap();

        // NoCeremony would fail loudly; the name check must come first
        let err = PasskeySigner::create_wallet(&store, &NoCeremony, "Example RP", "main")
            .await
            .unwrap_err();
        assert!(matches!(err, SignerError::AlreadyExists(name) if name == "main"));
    }
}
