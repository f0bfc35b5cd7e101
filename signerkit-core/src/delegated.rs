//! Provider backed by externally linked wallets.
//!
//! Signature production is delegated to the linked wallet service through
//! the [`MessageSigner`] callback; the provider only derives addresses,
//! drives transaction builds and submits results. The wallet address
//! reported by the service is the base58 encoding of the raw 32-byte
//! public key, from which the ledger-native account is derived locally.

use std::sync::Arc;

use async_trait::async_trait;

use crate::account::{Account, KeyType};
use crate::address::{contract_id_from_address, derive_address, group_of};
use crate::error::SignerError;
use crate::flow::{self, SignatureSet, TxSigner};
use crate::node::{BuildPlan, NodeClient};
use crate::params::{
    DeployContractTxParams, DeployContractTxResult, ExecuteScriptTxParams, ExecuteScriptTxResult,
    TransferTxParams, TransferTxResult, UnsignedTxParams, UnsignedTxResult,
};
use crate::provider::{ensure_selected, SignerProvider};

/// Raw public key length expected behind a linked wallet address.
const LINKED_KEY_LEN: usize = 32;

/// Message signing callback into an external wallet service.
///
/// The service holds the private key; the provider never sees it.
#[async_trait]
pub trait MessageSigner: Send + Sync {
    /// Base58-encoded raw public key identifying the linked wallet.
    fn wallet_address(&self) -> String;

    /// Signs `message` with the wallet's key and returns the raw
    /// signature bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the wallet service refuses or fails to sign.
    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, SignerError>;
}

struct LinkedAccount {
    account: Account,
    wallet: Arc<dyn MessageSigner>,
}

#[async_trait]
impl TxSigner for LinkedAccount {
    async fn sign_tx_id(&self, tx_id: &str) -> Result<SignatureSet, SignerError> {
        let message = hex::decode(tx_id)
            .map_err(|err| SignerError::Codec(format!("invalid tx id hex: {err}")))?;
        let signature = self.wallet.sign_message(&message).await?;
        Ok(SignatureSet::Single(hex::encode(signature)))
    }
}

/// [`SignerProvider`] over one or more externally linked wallets.
///
/// The first linked wallet is the selected account. The other wallets are
/// still listed by [`Self::accounts`], but only the selected account may
/// sign; any other `signer_address` fails
/// [`SignerError::InvalidSelection`].
pub struct DelegatedSigner {
    accounts: Vec<LinkedAccount>,
    node: NodeClient,
}

impl DelegatedSigner {
    /// Derives one ledger account per linked wallet.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::NoLinkedWallets`] if `wallets` is empty,
    /// [`SignerError::Unsupported`] for [`KeyType::GrouplessWebauthn`]
    /// (those keys live in a platform credential, not a wallet service),
    /// and [`SignerError::Codec`] if a wallet address does not decode to a
    /// raw public key.
    pub fn new(
        node: NodeClient,
        wallets: Vec<Arc<dyn MessageSigner>>,
        key_type: KeyType,
    ) -> Result<Self, SignerError> {
        if key_type == KeyType::GrouplessWebauthn {
            return Err(SignerError::Unsupported(
                "webauthn accounts require a platform credential provider",
            ));
        }
        if wallets.is_empty() {
            return Err(SignerError::NoLinkedWallets);
        }

        let accounts = wallets
            .into_iter()
            .map(|wallet| {
                let account = derive_account(&wallet.wallet_address(), key_type)?;
                Ok(LinkedAccount { account, wallet })
            })
            .collect::<Result<Vec<_>, SignerError>>()?;
        tracing::debug!(
            accounts = accounts.len(),
            key_type = %key_type,
            selected = %accounts[0].account.address,
            "delegated signer ready"
        );
        Ok(Self { accounts, node })
    }

    /// All derived accounts, selected first.
    #[must_use]
    pub fn accounts(&self) -> Vec<Account> {
        self.accounts
            .iter()
            .map(|linked| linked.account.clone())
            .collect()
    }

    fn selected_linked(&self, signer_address: &str) -> Result<&LinkedAccount, SignerError> {
        let selected = &self.accounts[0];
        ensure_selected(&selected.account, signer_address)?;
        Ok(selected)
    }

    async fn submit(
        &self,
        linked: &LinkedAccount,
        plan: &BuildPlan,
    ) -> Result<(String, SignatureSet), SignerError> {
        flow::submit_plan(&self.node, linked, plan).await
    }
}

fn derive_account(wallet_address: &str, key_type: KeyType) -> Result<Account, SignerError> {
    let public_key = bs58::decode(wallet_address)
        .into_vec()
        .map_err(|err| SignerError::Codec(format!("invalid wallet address: {err}")))?;
    if public_key.len() != LINKED_KEY_LEN {
        return Err(SignerError::Codec(format!(
            "wallet address decodes to {} bytes, expected {LINKED_KEY_LEN}",
            public_key.len()
        )));
    }

    // Groupless ed25519 accounts still live in a shard; the build
    // endpoints want it spelled out just like for legacy accounts.
    let group = match key_type {
        KeyType::Default | KeyType::GrouplessEd25519 => Some(group_of(&public_key)?),
        KeyType::GrouplessWebauthn => None,
    };
    Ok(Account {
        address: derive_address(&public_key, key_type)?,
        public_key: hex::encode(&public_key),
        key_type,
        group,
        credential_id: None,
    })
}

#[async_trait]
impl SignerProvider for DelegatedSigner {
    fn selected_account(&self) -> &Account {
        &self.accounts[0].account
    }

    async fn sign_and_submit_transfer_tx(
        &self,
        params: &TransferTxParams,
    ) -> Result<TransferTxResult, SignerError> {
        let linked = self.selected_linked(&params.signer_address)?;
        let request = params.to_request(&linked.account.public_key, linked.account.key_type);
        let plan = self.node.build_transfer(&request).await?;
        let unsigned_tx = plan.primary.unsigned_tx.clone();
        let (tx_id, signature) = self.submit(linked, &plan).await?;
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
        let linked = self.selected_linked(&params.signer_address)?;
        let group = params.group.or(linked.account.group);
        let request =
            params.to_request(&linked.account.public_key, linked.account.key_type, group);
        let plan = self.node.build_deploy_contract(&request).await?;

        let contract_address = plan.primary.contract_address.clone().ok_or_else(|| {
            SignerError::Serialization("deploy build response has no contract address".to_string())
        })?;
        let contract_id = contract_id_from_address(&contract_address)?;
        let unsigned_tx = plan.primary.unsigned_tx.clone();
        let (tx_id, signature) = self.submit(linked, &plan).await?;
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
        let linked = self.selected_linked(&params.signer_address)?;
        let group = params.group.or(linked.account.group);
        let request =
            params.to_request(&linked.account.public_key, linked.account.key_type, group);
        let plan = self.node.build_execute_script(&request).await?;
        let unsigned_tx = plan.primary.unsigned_tx.clone();
        let (tx_id, signature) = self.submit(linked, &plan).await?;
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
        let linked = self.selected_linked(&params.signer_address)?;
        let tx = self.node.decode_unsigned_tx(&params.unsigned_tx).await?;
        let (tx_id, signature) = flow::sign_and_submit_tx(&self.node, linked, &tx).await?;
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
        let linked = self.selected_linked(&params.signer_address)?;
        let tx = self.node.decode_unsigned_tx(&params.unsigned_tx).await?;
        let signature = linked.sign_tx_id(&tx.tx_id).await?;
        Ok(UnsignedTxResult {
            tx_id: tx.tx_id,
            unsigned_tx: tx.unsigned_tx,
            signature,
        })
    }
}
