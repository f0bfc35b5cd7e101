//! Ledger node REST client and the wire types of its build/submit API.
//!
//! Amounts cross the wire as decimal strings; the node rejects JSON
//! numbers above 2^53. Build endpoints return a list of prerequisite
//! funding transactions plus the primary transaction; [`BuildPlan`]
//! enforces that exactly one primary came back.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::account::KeyType;
use crate::error::SignerError;
use crate::request::Request;

/// Maximum number of response body characters carried into an error.
const ERROR_SNIPPET_LEN: usize = 200;

/// One transfer output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDestination {
    /// Recipient address.
    pub address: String,
    /// Base-currency amount, decimal string.
    pub amount: String,
    /// Token amounts riding on this output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<ApiToken>>,
}

/// A token id and amount pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiToken {
    /// Hex-encoded token id.
    pub id: String,
    /// Token amount, decimal string.
    pub amount: String,
}

/// Body of `POST /transactions/build-transfer`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildTransferRequest {
    /// Sender address.
    pub signer_address: String,
    /// Hex-encoded sender public key.
    pub signer_public_key: String,
    /// Sender key scheme.
    pub signer_key_type: KeyType,
    /// Transfer outputs.
    pub destinations: Vec<ApiDestination>,
}

/// Body of `POST /contracts/build-deploy`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDeployContractRequest {
    /// Deployer address.
    pub signer_address: String,
    /// Hex-encoded deployer public key.
    pub signer_public_key: String,
    /// Deployer key scheme.
    pub signer_key_type: KeyType,
    /// Hex-encoded contract bytecode.
    pub bytecode: String,
    /// Base-currency endowment for the new contract, decimal string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_amount: Option<String>,
    /// Token endowment for the new contract.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_token_amounts: Option<Vec<ApiToken>>,
    /// Amount of a new token to issue at deployment, decimal string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_token_amount: Option<String>,
    /// Recipient of the issued token supply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_token_to: Option<String>,
    /// Gas price override, decimal string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    /// Target shard group for the contract.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<u8>,
}

/// Body of `POST /contracts/build-execute`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildExecuteScriptRequest {
    /// Caller address.
    pub signer_address: String,
    /// Hex-encoded caller public key.
    pub signer_public_key: String,
    /// Caller key scheme.
    pub signer_key_type: KeyType,
    /// Hex-encoded script bytecode.
    pub bytecode: String,
    /// Base-currency amount attached to the call, decimal string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    /// Token amounts attached to the call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<ApiToken>>,
    /// Gas price override, decimal string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    /// Multiplier applied to the node's gas estimate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_estimation_multiplier: Option<f64>,
    /// Shard group to execute in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<u8>,
}

/// One transaction produced by a build endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltTx {
    /// Transaction id, hex-encoded; this is what gets signed.
    pub tx_id: String,
    /// Serialized unsigned transaction, hex-encoded.
    pub unsigned_tx: String,
    /// Address of the deployed contract, on deploy builds only.
    #[serde(default)]
    pub contract_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildTxResponse {
    #[serde(default)]
    funding_txs: Vec<BuiltTx>,
    txs: Vec<BuiltTx>,
}

/// A validated build result: prerequisite funding transactions in
/// submission order, then exactly one primary transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    /// Transactions to sign and submit before the primary, in order.
    pub funding_txs: Vec<BuiltTx>,
    /// The transaction the caller asked for.
    pub primary: BuiltTx,
}

impl TryFrom<BuildTxResponse> for BuildPlan {
    type Error = SignerError;

    fn try_from(mut response: BuildTxResponse) -> Result<Self, SignerError> {
        match response.txs.len() {
            0 => Err(SignerError::InsufficientFunds),
            1 => Ok(Self {
                funding_txs: response.funding_txs,
                primary: response.txs.remove(0),
            }),
            n => Err(SignerError::TooManyBuildResults(n)),
        }
    }
}

/// Acknowledgement of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedTx {
    /// Transaction id as recorded by the node.
    pub tx_id: String,
}

/// Balance of a single address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressBalance {
    /// Spendable base-currency balance, decimal string.
    pub balance: String,
    /// Token balances held by the address.
    #[serde(default)]
    pub token_balances: Vec<ApiToken>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DecodeUnsignedTxRequest<'a> {
    unsigned_tx: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DecodeUnsignedTxResponse {
    unsigned_tx: DecodedUnsignedTx,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DecodedUnsignedTx {
    tx_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitTxRequest<'a> {
    unsigned_tx: &'a str,
    signature: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitMultisigTxRequest<'a> {
    unsigned_tx: &'a str,
    signatures: &'a [String],
}

/// REST client for one ledger node.
#[derive(Debug, Clone)]
pub struct NodeClient {
    base_url: String,
    request: Request,
}

impl NodeClient {
    /// Creates a client for the node at `base_url`.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            request: Request::new(),
        }
    }

    /// Builds a transfer transaction.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::InsufficientFunds`] if the node produced no
    /// primary transaction, [`SignerError::TooManyBuildResults`] if it
    /// produced several, [`SignerError::Node`] on rejection.
    pub async fn build_transfer(
        &self,
        request: &BuildTransferRequest,
    ) -> Result<BuildPlan, SignerError> {
        self.build("/transactions/build-transfer", request).await
    }

    /// Builds a contract deployment transaction.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::build_transfer`].
    pub async fn build_deploy_contract(
        &self,
        request: &BuildDeployContractRequest,
    ) -> Result<BuildPlan, SignerError> {
        self.build("/contracts/build-deploy", request).await
    }

    /// Builds a script execution transaction.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::build_transfer`].
    pub async fn build_execute_script(
        &self,
        request: &BuildExecuteScriptRequest,
    ) -> Result<BuildPlan, SignerError> {
        self.build("/contracts/build-execute", request).await
    }

    /// Recovers the transaction id of a caller-provided unsigned
    /// transaction by having the node decode it.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::Node`] if the node rejects the bytes.
    pub async fn decode_unsigned_tx(&self, unsigned_tx: &str) -> Result<BuiltTx, SignerError> {
        let response: DecodeUnsignedTxResponse = self
            .post_json(
                "/transactions/decode-unsigned",
                &DecodeUnsignedTxRequest { unsigned_tx },
            )
            .await?;
        Ok(BuiltTx {
            tx_id: response.unsigned_tx.tx_id,
            unsigned_tx: unsigned_tx.to_string(),
            contract_address: None,
        })
    }

    /// Submits a transaction carrying a single scalar signature.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::Node`] if the node rejects the submission.
    pub async fn submit_tx(
        &self,
        unsigned_tx: &str,
        signature: &str,
    ) -> Result<SubmittedTx, SignerError> {
        self.post_json(
            "/transactions/submit",
            &SubmitTxRequest {
                unsigned_tx,
                signature,
            },
        )
        .await
    }

    /// Submits a transaction carrying an ordered signature list, used for
    /// chunked `WebAuthn` payloads.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::Node`] if the node rejects the submission.
    pub async fn submit_multisig_tx(
        &self,
        unsigned_tx: &str,
        signatures: &[String],
    ) -> Result<SubmittedTx, SignerError> {
        self.post_json(
            "/multisig/submit",
            &SubmitMultisigTxRequest {
                unsigned_tx,
                signatures,
            },
        )
        .await
    }

    /// Fetches the balance of `address`.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::Node`] if the node rejects the request.
    pub async fn balance(&self, address: &str) -> Result<AddressBalance, SignerError> {
        let url = format!("{}/addresses/{address}/balance", self.base_url);
        let response = self.request.get(&url).await?;
        parse_response(&url, response).await
    }

    async fn build<T>(&self, path: &str, request: &T) -> Result<BuildPlan, SignerError>
    where
        T: Serialize + Sync,
    {
        let response: BuildTxResponse = self.post_json(path, request).await?;
        tracing::debug!(
            path,
            funding_txs = response.funding_txs.len(),
            txs = response.txs.len(),
            "build response"
        );
        response.try_into()
    }

    async fn post_json<T, R>(&self, path: &str, body: &T) -> Result<R, SignerError>
    where
        T: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        let response = self.request.post(&url, body).await?;
        parse_response(&url, response).await
    }
}

async fn parse_response<R: DeserializeOwned>(
    url: &str,
    response: reqwest::Response,
) -> Result<R, SignerError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(SignerError::Node {
            status: status.as_u16(),
            message: snippet(&body),
        });
    }
    serde_json::from_str(&body).map_err(|err| {
        SignerError::Serialization(format!(
            "unexpected response from {url}: {err}: {}",
            snippet(&body)
        ))
    })
}

fn snippet(body: &str) -> String {
    body.chars().take(ERROR_SNIPPET_LEN).collect()
}
