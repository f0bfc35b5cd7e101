//! Typed parameters and results for provider operations.
//!
//! Amounts are `u128` at the API surface and converted to decimal strings
//! at the wire boundary, since the node rejects JSON numbers above 2^53.

use crate::account::KeyType;
use crate::flow::SignatureSet;
use crate::node::{
    ApiDestination, ApiToken, BuildDeployContractRequest, BuildExecuteScriptRequest,
    BuildTransferRequest,
};

/// A token id and amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Hex-encoded token id.
    pub id: String,
    /// Token amount in base units.
    pub amount: u128,
}

impl Token {
    fn to_api(&self) -> ApiToken {
        ApiToken {
            id: self.id.clone(),
            amount: self.amount.to_string(),
        }
    }
}

/// One transfer output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Recipient address.
    pub address: String,
    /// Base-currency amount in base units.
    pub amount: u128,
    /// Token amounts riding on this output.
    pub tokens: Vec<Token>,
}

impl Destination {
    fn to_api(&self) -> ApiDestination {
        ApiDestination {
            address: self.address.clone(),
            amount: self.amount.to_string(),
            tokens: tokens_to_api(&self.tokens),
        }
    }
}

/// Parameters of a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTxParams {
    /// Sender address; must match the provider's selected account.
    pub signer_address: String,
    /// Transfer outputs.
    pub destinations: Vec<Destination>,
}

impl TransferTxParams {
    pub(crate) fn to_request(&self, public_key: &str, key_type: KeyType) -> BuildTransferRequest {
        BuildTransferRequest {
            signer_address: self.signer_address.clone(),
            signer_public_key: public_key.to_string(),
            signer_key_type: key_type,
            destinations: self.destinations.iter().map(Destination::to_api).collect(),
        }
    }
}

/// Parameters of a contract deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployContractTxParams {
    /// Deployer address; must match the provider's selected account.
    pub signer_address: String,
    /// Hex-encoded contract bytecode.
    pub bytecode: String,
    /// Base-currency endowment for the new contract.
    pub initial_amount: Option<u128>,
    /// Token endowment for the new contract.
    pub initial_tokens: Vec<Token>,
    /// Amount of a new token to issue at deployment.
    pub issue_token_amount: Option<u128>,
    /// Recipient of the issued token supply.
    pub issue_token_to: Option<String>,
    /// Gas price override.
    pub gas_price: Option<u128>,
    /// Target shard group for the contract.
    pub group: Option<u8>,
}

impl DeployContractTxParams {
    pub(crate) fn to_request(
        &self,
        public_key: &str,
        key_type: KeyType,
        group: Option<u8>,
    ) -> BuildDeployContractRequest {
        BuildDeployContractRequest {
            signer_address: self.signer_address.clone(),
            signer_public_key: public_key.to_string(),
            signer_key_type: key_type,
            bytecode: self.bytecode.clone(),
            initial_amount: self.initial_amount.map(|amount| amount.to_string()),
            initial_token_amounts: tokens_to_api(&self.initial_tokens),
            issue_token_amount: self.issue_token_amount.map(|amount| amount.to_string()),
            issue_token_to: self.issue_token_to.clone(),
            gas_price: self.gas_price.map(|price| price.to_string()),
            group,
        }
    }
}

/// Parameters of a script execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteScriptTxParams {
    /// Caller address; must match the provider's selected account.
    pub signer_address: String,
    /// Hex-encoded script bytecode.
    pub bytecode: String,
    /// Base-currency amount attached to the call.
    pub amount: Option<u128>,
    /// Token amounts attached to the call.
    pub tokens: Vec<Token>,
    /// Gas price override.
    pub gas_price: Option<u128>,
    /// Multiplier applied to the node's gas estimate.
    pub gas_estimation_multiplier: Option<f64>,
    /// Shard group to execute in.
    pub group: Option<u8>,
}

impl ExecuteScriptTxParams {
    pub(crate) fn to_request(
        &self,
        public_key: &str,
        key_type: KeyType,
        group: Option<u8>,
    ) -> BuildExecuteScriptRequest {
        BuildExecuteScriptRequest {
            signer_address: self.signer_address.clone(),
            signer_public_key: public_key.to_string(),
            signer_key_type: key_type,
            bytecode: self.bytecode.clone(),
            amount: self.amount.map(|amount| amount.to_string()),
            tokens: tokens_to_api(&self.tokens),
            gas_price: self.gas_price.map(|price| price.to_string()),
            gas_estimation_multiplier: self.gas_estimation_multiplier,
            group,
        }
    }
}

/// Parameters for signing a caller-built unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTxParams {
    /// Signer address; must match the provider's selected account.
    pub signer_address: String,
    /// Serialized unsigned transaction, hex-encoded.
    pub unsigned_tx: String,
}

/// One step of a cross-group chained operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainedTxParams {
    /// A transfer step.
    Transfer(TransferTxParams),
    /// A contract deployment step.
    DeployContract(DeployContractTxParams),
    /// A script execution step.
    ExecuteScript(ExecuteScriptTxParams),
}

/// Parameters for signing a standalone message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageParams {
    /// Signer address; must match the provider's selected account.
    pub signer_address: String,
    /// Message to sign.
    pub message: String,
}

/// Result of a submitted transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTxResult {
    /// Node-acknowledged transaction id.
    pub tx_id: String,
    /// Serialized unsigned transaction, hex-encoded.
    pub unsigned_tx: String,
    /// Signature material that was submitted.
    pub signature: SignatureSet,
}

/// Result of a submitted contract deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployContractTxResult {
    /// Node-acknowledged transaction id.
    pub tx_id: String,
    /// Serialized unsigned transaction, hex-encoded.
    pub unsigned_tx: String,
    /// Signature material that was submitted.
    pub signature: SignatureSet,
    /// Address of the deployed contract.
    pub contract_address: String,
    /// Contract id: the hex-encoded address payload behind the contract
    /// tag.
    pub contract_id: String,
}

/// Result of a submitted script execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteScriptTxResult {
    /// Node-acknowledged transaction id.
    pub tx_id: String,
    /// Serialized unsigned transaction, hex-encoded.
    pub unsigned_tx: String,
    /// Signature material that was submitted.
    pub signature: SignatureSet,
}

/// Result of signing (and possibly submitting) an unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTxResult {
    /// Transaction id recovered from the unsigned transaction.
    pub tx_id: String,
    /// The unsigned transaction that was signed.
    pub unsigned_tx: String,
    /// Signature material.
    pub signature: SignatureSet,
}

/// Result of signing a standalone message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageResult {
    /// Hex-encoded signature.
    pub signature: String,
}

fn tokens_to_api(tokens: &[Token]) -> Option<Vec<ApiToken>> {
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.iter().map(Token::to_api).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amounts_cross_the_wire_as_decimal_strings() {
        let params = TransferTxParams {
            signer_address: "addr".to_string(),
            destinations: vec![Destination {
                address: "dest".to_string(),
                amount: u128::MAX,
                tokens: vec![Token {
                    id: "feed".to_string(),
                    amount: 42,
                }],
            }],
        };
        let request = params.to_request("02ab", KeyType::Default);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json["destinations"][0]["amount"],
            "340282366920938463463374607431768211455"
        );
        assert_eq!(json["destinations"][0]["tokens"][0]["amount"], "42");
    }

    #[test]
    fn test_absent_options_are_omitted_from_the_wire() {
        let params = DeployContractTxParams {
            signer_address: "addr".to_string(),
            bytecode: "0102".to_string(),
            initial_amount: None,
            initial_tokens: Vec::new(),
            issue_token_amount: None,
            issue_token_to: None,
            gas_price: None,
            group: None,
        };
        let request = params.to_request("02ab", KeyType::GrouplessWebauthn, None);
        let json = serde_json::to_value(&request).unwrap();
        let object = json.as_object().unwrap();
        assert!(!object.contains_key("initialAmount"));
        assert!(!object.contains_key("initialTokenAmounts"));
        assert!(!object.contains_key("group"));
        assert_eq!(object["signerKeyType"], "gl-webauthn");
    }
}
