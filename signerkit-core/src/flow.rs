//! Sign-and-submit flow shared by every provider.
//!
//! A build plan is consumed strictly in order: each funding transaction is
//! signed and submitted before the next, and the primary goes last. Any
//! failure aborts the remainder; already-submitted funding transactions
//! stay on the ledger, so callers must treat a mid-plan failure as a
//! partially applied operation.

use async_trait::async_trait;

use crate::error::SignerError;
use crate::node::{BuildPlan, BuiltTx, NodeClient};

/// Signature material produced for one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureSet {
    /// A single hex-encoded scalar signature, submitted on the plain path.
    Single(String),
    /// Ordered hex-encoded 64-byte chunks with the signature chunk last,
    /// submitted on the signature-list path.
    Chunked(Vec<String>),
}

/// Produces signature material over a transaction id.
#[async_trait]
pub trait TxSigner: Send + Sync {
    /// Signs the hex-encoded transaction id `tx_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if signature production fails; the enclosing flow
    /// aborts without submitting the transaction.
    async fn sign_tx_id(&self, tx_id: &str) -> Result<SignatureSet, SignerError>;
}

/// Signs one transaction and submits it on the path matching its
/// signature shape. Returns the node-acknowledged transaction id and the
/// signature material that was submitted.
pub(crate) async fn sign_and_submit_tx(
    node: &NodeClient,
    signer: &dyn TxSigner,
    tx: &BuiltTx,
) -> Result<(String, SignatureSet), SignerError> {
    let signature = signer.sign_tx_id(&tx.tx_id).await?;
    let submitted = match &signature {
        SignatureSet::Single(scalar) => node.submit_tx(&tx.unsigned_tx, scalar).await?,
        SignatureSet::Chunked(chunks) => {
            node.submit_multisig_tx(&tx.unsigned_tx, chunks).await?
        }
    };
    Ok((submitted.tx_id, signature))
}

/// Consumes a build plan: funding transactions first, in list order, then
/// the primary. Returns the primary's acknowledged transaction id and
/// signature material.
pub(crate) async fn submit_plan(
    node: &NodeClient,
    signer: &dyn TxSigner,
    plan: &BuildPlan,
) -> Result<(String, SignatureSet), SignerError> {
    for (index, funding) in plan.funding_txs.iter().enumerate() {
        tracing::debug!(index, tx_id = %funding.tx_id, "submitting funding transaction");
        sign_and_submit_tx(node, signer, funding).await?;
    }
    sign_and_submit_tx(node, signer, &plan.primary).await
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    struct RecordingSigner {
        signed: Mutex<Vec<String>>,
    }

    impl RecordingSigner {
        fn new() -> Self {
            Self {
                signed: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TxSigner for RecordingSigner {
        async fn sign_tx_id(&self, tx_id: &str) -> Result<SignatureSet, SignerError> {
            self.signed.lock().unwrap().push(tx_id.to_string());
            Ok(SignatureSet::Single(format!("sig-{tx_id}")))
        }
    }

    fn tx(id: &str) -> BuiltTx {
        BuiltTx {
            tx_id: id.to_string(),
            unsigned_tx: format!("raw-{id}"),
            contract_address: None,
        }
    }

    async fn submit_mock(
        server: &mut mockito::Server,
        id: &str,
        status: usize,
        hits: usize,
    ) -> mockito::Mock {
        server
            .mock("POST", "/transactions/submit")
            .match_body(Matcher::PartialJson(json!({
                "unsignedTx": format!("raw-{id}"),
                "signature": format!("sig-{id}"),
            })))
            .with_status(status)
            .with_body(json!({ "txId": id }).to_string())
            .expect(hits)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_funding_txs_are_submitted_in_order_before_primary() {
        let mut server = mockito::Server::new_async().await;
        let f1 = submit_mock(&mut server, "f1", 200, 1).await;
        let f2 = submit_mock(&mut server, "f2", 200, 1).await;
        let primary = submit_mock(&mut server, "p", 200, 1).await;

        let node = NodeClient::new(&server.url());
        let signer = RecordingSigner::new();
        let plan = BuildPlan {
            funding_txs: vec![tx("f1"), tx("f2")],
            primary: tx("p"),
        };

        let (tx_id, signature) = submit_plan(&node, &signer, &plan).await.unwrap();
        assert_eq!(tx_id, "p");
        assert_eq!(signature, SignatureSet::Single("sig-p".to_string()));
        assert_eq!(*signer.signed.lock().unwrap(), vec!["f1", "f2", "p"]);
        f1.assert_async().await;
        f2.assert_async().await;
        primary.assert_async().await;
    }

    #[tokio::test]
    async fn test_funding_failure_aborts_before_primary() {
        let mut server = mockito::Server::new_async().await;
        submit_mock(&mut server, "f1", 500, 1).await;
        let primary = submit_mock(&mut server, "p", 200, 0).await;

        let node = NodeClient::new(&server.url());
        let signer = RecordingSigner::new();
        let plan = BuildPlan {
            funding_txs: vec![tx("f1")],
            primary: tx("p"),
        };

        let err = submit_plan(&node, &signer, &plan).await.unwrap_err();
        assert!(matches!(err, SignerError::Node { status: 500, .. }));
        // the primary is never signed or submitted after a funding failure
        assert_eq!(*signer.signed.lock().unwrap(), vec!["f1"]);
        primary.assert_async().await;
    }

    #[tokio::test]
    async fn test_chunked_signatures_use_the_multisig_path() {
        struct ChunkedSigner;

        #[async_trait]
        impl TxSigner for ChunkedSigner {
            async fn sign_tx_id(&self, _tx_id: &str) -> Result<SignatureSet, SignerError> {
                Ok(SignatureSet::Chunked(vec![
                    "aa".to_string(),
                    "bb".to_string(),
                ]))
            }
        }

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/multisig/submit")
            .match_body(Matcher::Json(json!({
                "unsignedTx": "raw-p",
                "signatures": ["aa", "bb"],
            })))
            .with_status(200)
            .with_body(json!({ "txId": "p" }).to_string())
            .create_async()
            .await;

        let node = NodeClient::new(&server.url());
        let (tx_id, _) = sign_and_submit_tx(&node, &ChunkedSigner, &tx("p"))
            .await
            .unwrap();
        assert_eq!(tx_id, "p");
        mock.assert_async().await;
    }
}
