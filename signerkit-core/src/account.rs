use serde::{Deserialize, Serialize};

/// Address derivation rule and signing strategy tag for an account.
///
/// The string forms are the wire tags the ledger node expects in build
/// requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    /// Legacy group-bound scheme: checksummed address with a `:group`
    /// suffix.
    #[serde(rename = "default")]
    Default,
    /// Groupless account backed by an ed25519 key held in an external
    /// wallet.
    #[serde(rename = "gl-ed25519")]
    GrouplessEd25519,
    /// Groupless account backed by a platform `WebAuthn` credential
    /// (P-256).
    #[serde(rename = "gl-webauthn")]
    GrouplessWebauthn,
}

impl KeyType {
    /// Returns the wire tag for this key type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::GrouplessEd25519 => "gl-ed25519",
            Self::GrouplessWebauthn => "gl-webauthn",
        }
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A signing identity as seen by a provider.
///
/// Exactly one account is selected per provider instance; address lookups
/// must match it exactly or fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Ledger-native encoded address.
    pub address: String,
    /// Raw or compressed public key, hex-encoded.
    pub public_key: String,
    /// Scheme determining address derivation and signing strategy.
    pub key_type: KeyType,
    /// Shard group, derived from the public key. Present for delegated
    /// accounts ([`KeyType::Default`] and [`KeyType::GrouplessEd25519`]);
    /// `None` for platform `WebAuthn` accounts, which are not pinned to a
    /// shard.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<u8>,
    /// Opaque handle into the platform credential store, hex-encoded.
    /// Present only for [`KeyType::GrouplessWebauthn`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_id: Option<String>,
}
