//! Common contract implemented by every signer provider.

use async_trait::async_trait;

use crate::account::Account;
use crate::error::SignerError;
use crate::params::{
    ChainedTxParams, DeployContractTxParams, DeployContractTxResult, ExecuteScriptTxParams,
    ExecuteScriptTxResult, MessageParams, MessageResult, TransferTxParams, TransferTxResult,
    UnsignedTxParams, UnsignedTxResult,
};

/// A transaction signer bound to exactly one selected account.
///
/// Every signing operation validates that `params.signer_address` matches
/// the selected account before doing any work. Operations that submit do
/// so through the shared flow: funding transactions first, in order, then
/// the primary.
#[async_trait]
pub trait SignerProvider: Send + Sync {
    /// The provider's selected account.
    fn selected_account(&self) -> &Account;

    /// Builds, signs and submits a transfer.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::InvalidSelection`] on an address mismatch,
    /// or any build, signing or submission failure.
    async fn sign_and_submit_transfer_tx(
        &self,
        params: &TransferTxParams,
    ) -> Result<TransferTxResult, SignerError>;

    /// Builds, signs and submits a contract deployment.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::sign_and_submit_transfer_tx`].
    async fn sign_and_submit_deploy_contract_tx(
        &self,
        params: &DeployContractTxParams,
    ) -> Result<DeployContractTxResult, SignerError>;

    /// Builds, signs and submits a script execution.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::sign_and_submit_transfer_tx`].
    async fn sign_and_submit_execute_script_tx(
        &self,
        params: &ExecuteScriptTxParams,
    ) -> Result<ExecuteScriptTxResult, SignerError>;

    /// Signs and submits a caller-built unsigned transaction.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::sign_and_submit_transfer_tx`].
    async fn sign_and_submit_unsigned_tx(
        &self,
        params: &UnsignedTxParams,
    ) -> Result<UnsignedTxResult, SignerError>;

    /// Signs a caller-built unsigned transaction without submitting it.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::InvalidSelection`] on an address mismatch,
    /// or any decode or signing failure.
    async fn sign_unsigned_tx(
        &self,
        params: &UnsignedTxParams,
    ) -> Result<UnsignedTxResult, SignerError>;

    /// Cross-group chained operations are not offered by any provider.
    ///
    /// # Errors
    ///
    /// Always returns [`SignerError::Unsupported`].
    async fn sign_and_submit_chained_txs(
        &self,
        _params: &[ChainedTxParams],
    ) -> Result<Vec<UnsignedTxResult>, SignerError> {
        Err(SignerError::Unsupported("chained transactions"))
    }

    /// Standalone message signing is not offered by any provider.
    ///
    /// # Errors
    ///
    /// Always returns [`SignerError::Unsupported`].
    async fn sign_message(&self, _params: &MessageParams) -> Result<MessageResult, SignerError> {
        Err(SignerError::Unsupported("standalone message signing"))
    }
}

/// Rejects any `signer_address` other than the selected account's.
pub(crate) fn ensure_selected(account: &Account, signer_address: &str) -> Result<(), SignerError> {
    if account.address == signer_address {
        Ok(())
    } else {
        Err(SignerError::InvalidSelection(format!(
            "{signer_address} is not the selected account {}",
            account.address
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::KeyType;

    fn account() -> Account {
        Account {
            address: "selected".to_string(),
            public_key: "02ab".to_string(),
            key_type: KeyType::Default,
            group: Some(1),
            credential_id: None,
        }
    }

    #[test]
    fn test_selection_check_requires_exact_match() {
        let account = account();
        assert!(ensure_selected(&account, "selected").is_ok());
        assert!(matches!(
            ensure_selected(&account, "other"),
            Err(SignerError::InvalidSelection(_))
        ));
        assert!(matches!(
            ensure_selected(&account, "Selected"),
            Err(SignerError::InvalidSelection(_))
        ));
    }
}
