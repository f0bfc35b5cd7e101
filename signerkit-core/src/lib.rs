//! Transaction signer providers for a grouped UTXO/account ledger.
//!
//! Two providers implement the same [`SignerProvider`] contract:
//!
//! * [`DelegatedSigner`] — signature production is delegated to an
//!   externally linked wallet through its [`MessageSigner`] callback; the
//!   returned bytes are submitted as a single scalar signature.
//! * [`PasskeySigner`] — signatures come from a platform `WebAuthn`
//!   credential. The DER signature from the assertion ceremony is
//!   canonicalized to low-s form and the ceremony metadata is packed into
//!   fixed 64-byte chunks so an on-chain verifier can replay the assertion
//!   check; submission always uses the multisig signature-list path.
//!
//! Both providers drive the same flow per signing call: request a build
//! plan from the ledger node, sign and submit any funding transactions in
//! strict list order, then sign and submit the primary transaction.
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

mod account;
pub use account::*;

mod address;
pub use address::*;

mod delegated;
pub use delegated::*;

mod error;
pub use error::*;

mod flow;
pub use flow::*;

mod node;
pub use node::*;

mod params;
pub use params::*;

mod passkey;
pub use passkey::*;

mod provider;
pub use provider::*;

mod signature;
pub use signature::*;

mod store;
pub use store::*;

mod webauthn;
pub use webauthn::*;

// private modules
mod request;
