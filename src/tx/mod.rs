//! Cosmos transaction envelopes: construction, signing and verification.

mod builder;
pub mod proto;
pub mod verify;

pub use builder::{
    DEFAULT_GAS_LIMIT, DEFAULT_UNORDERED_WINDOW, Envelope, Sequencing, SignedEnvelope,
};
pub use verify::{VerifiedTx, verify_signed_by, verify_transaction, verify_transaction_base64};
