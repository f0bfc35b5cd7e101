use thiserror::Error;

/// Error outputs from signerkit.
///
/// Every failure is terminal for the enclosing signing call and is
/// propagated to the caller verbatim; the core never retries. Recovery
/// (re-funding, re-running a ceremony) is a caller policy decision.
#[derive(Debug, Error)]
pub enum SignerError {
    /// Malformed address or key bytes; the caller must fix its input.
    #[error("codec_error: {0}")]
    Codec(String),
    /// Malformed DER signature from the platform authenticator.
    #[error("signature_format_error: {0}")]
    SignatureFormat(String),
    /// No wallet record is bound to the requested name.
    #[error("wallet_not_found: {0}")]
    NotFound(String),
    /// A wallet record is already bound to the requested name; records are
    /// never overwritten.
    #[error("wallet_already_exists: {0}")]
    AlreadyExists(String),
    /// The requested address does not match the provider's selected account.
    #[error("invalid_selection: {0}")]
    InvalidSelection(String),
    /// The provider was constructed without any linked wallets.
    #[error("no_linked_wallets")]
    NoLinkedWallets,
    /// The operation is a deliberate non-goal and will never succeed.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
    /// The ledger node produced no primary transaction for the build
    /// request.
    #[error("insufficient_funds")]
    InsufficientFunds,
    /// The ledger node produced more primary transactions than a single
    /// signing flow can handle.
    #[error("too_many_build_results: {0}")]
    TooManyBuildResults(usize),
    /// The platform credential ceremony failed or was cancelled.
    #[error("ceremony_failed: {0}")]
    Ceremony(String),
    /// The ledger node rejected a request.
    #[error("node_error: status {status}: {message}")]
    Node {
        /// HTTP status returned by the node.
        status: u16,
        /// Response body, truncated.
        message: String,
    },
    /// Unexpected error serializing or parsing wire data.
    #[error("serialization_error: {0}")]
    Serialization(String),
    /// Network-level HTTP failure.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// Local key-value store failure.
    #[error(transparent)]
    Store(#[from] signerkit_store::StoreError),
}
