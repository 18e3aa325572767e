//! Signing identity: the primary EVM key and the delegated agent key.
//!
//! The primary key proves ownership off-chain (EIP-191 personal messages,
//! e.g. when delegating trading rights to an agent). The agent key signs
//! ledger transactions with the chain's native secp256k1 scheme: SHA-256 over
//! the sign-doc bytes, RFC 6979 deterministic nonces, low-S, `r || s`.

use std::fmt;
use std::str::FromStr as _;

use alloy::primitives::{Signature as PersonalSignature, hex};
use alloy::signers::SignerSync as _;
use alloy::signers::local::PrivateKeySigner;
use k256::ecdsa::signature::{Signer as _, Verifier as _};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use ripemd::Ripemd160;
use secrecy::{ExposeSecret as _, SecretSlice, SecretString};
use sha2::{Digest as _, Sha256};

use crate::Result;
use crate::address::encode_bech32;
use crate::error::{Error, Kind};
use crate::types::Address;

/// Protobuf type URL of a secp256k1 public key inside a signer info.
pub const SECP256K1_PUBKEY_TYPE_URL: &str = "/cosmos.crypto.secp256k1.PubKey";

const PRIVATE_KEY_HEX_LEN: usize = 64;
const SIGNATURE_LEN: usize = 64;

fn decode_private_key(hex_key: &str, label: &str) -> Result<Vec<u8>> {
    let trimmed = hex_key.trim().trim_start_matches("0x");
    if trimmed.len() != PRIVATE_KEY_HEX_LEN {
        return Err(Error::message(
            Kind::InvalidKey,
            format!(
                "invalid {label} private key length: expected {PRIVATE_KEY_HEX_LEN} characters, got {}",
                trimmed.len()
            ),
        ));
    }
    hex::decode(trimmed).map_err(|e| Error::with_source(Kind::InvalidKey, e))
}

/// Compressed SEC1 public key → `ripemd160(sha256(pk))`, the 20-byte account hash.
fn account_hash(compressed_public_key: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(compressed_public_key);
    Ripemd160::digest(sha).into()
}

/// Derives the bech32 ledger address for a raw 32-byte secp256k1 scalar.
pub fn derive_address(private_key: &[u8], hrp: &str) -> Result<String> {
    let key =
        SigningKey::from_slice(private_key).map_err(|e| Error::with_source(Kind::InvalidKey, e))?;
    let public = key.verifying_key().to_encoded_point(true);
    encode_bech32(hrp, &account_hash(public.as_bytes()))
}

/// Signs `sign_bytes` with a raw 32-byte secp256k1 scalar.
pub fn sign_envelope(sign_bytes: &[u8], private_key: &[u8]) -> Result<Vec<u8>> {
    let key =
        SigningKey::from_slice(private_key).map_err(|e| Error::with_source(Kind::Signing, e))?;
    let signature: Signature = key
        .try_sign(sign_bytes)
        .map_err(|e| Error::with_source(Kind::Signing, e))?;
    let signature = signature.normalize_s().unwrap_or(signature);
    Ok(signature.to_bytes().to_vec())
}

/// Verifies a 64-byte `r || s` signature over `sign_bytes` with a compressed public key.
pub fn verify_envelope_signature(
    sign_bytes: &[u8],
    signature: &[u8],
    compressed_public_key: &[u8],
) -> Result<()> {
    if signature.len() != SIGNATURE_LEN {
        return Err(Error::message(
            Kind::Signing,
            format!(
                "invalid signature length: expected {SIGNATURE_LEN} bytes, got {}",
                signature.len()
            ),
        ));
    }
    let key = VerifyingKey::from_sec1_bytes(compressed_public_key)
        .map_err(|e| Error::with_source(Kind::InvalidKey, e))?;
    let signature =
        Signature::from_slice(signature).map_err(|e| Error::with_source(Kind::Signing, e))?;
    key.verify(sign_bytes, &signature)
        .map_err(|e| Error::with_source(Kind::Signing, e))
}

/// Bech32 address that a compressed public key controls.
pub fn address_of_public_key(compressed_public_key: &[u8], hrp: &str) -> Result<String> {
    VerifyingKey::from_sec1_bytes(compressed_public_key)
        .map_err(|e| Error::with_source(Kind::InvalidKey, e))?;
    encode_bech32(hrp, &account_hash(compressed_public_key))
}

/// Agent key used for on-chain transaction signing.
///
/// Only the secret bytes are stored; a fresh [`SigningKey`] is created for
/// each signature and dropped (and zeroized) right after.
pub struct AgentKey {
    secret: SecretSlice<u8>,
    public_key: Vec<u8>,
    address: String,
}

impl fmt::Debug for AgentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentKey")
            .field("secret", &"<redacted>")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Clone for AgentKey {
    fn clone(&self) -> Self {
        Self {
            secret: SecretSlice::from(self.secret.expose_secret().to_vec()),
            public_key: self.public_key.clone(),
            address: self.address.clone(),
        }
    }
}

impl AgentKey {
    pub fn from_hex(private_key_hex: &str, hrp: &str) -> Result<Self> {
        Self::from_bytes(decode_private_key(private_key_hex, "agent")?, hrp)
    }

    pub fn from_bytes(private_key: Vec<u8>, hrp: &str) -> Result<Self> {
        let key = SigningKey::from_slice(&private_key)
            .map_err(|e| Error::with_source(Kind::InvalidKey, e))?;
        let public_key = key.verifying_key().to_encoded_point(true).as_bytes().to_vec();
        let address = encode_bech32(hrp, &account_hash(&public_key))?;

        Ok(Self {
            secret: SecretSlice::from(private_key),
            public_key,
            address,
        })
    }

    /// Bech32 ledger address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// 33-byte compressed SEC1 public key.
    #[must_use]
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn sign(&self, sign_bytes: &[u8]) -> Result<Vec<u8>> {
        sign_envelope(sign_bytes, self.secret.expose_secret())
    }

    pub fn verify(&self, sign_bytes: &[u8], signature: &[u8]) -> Result<()> {
        verify_envelope_signature(sign_bytes, signature, &self.public_key)
    }
}

/// Both keys of one trading identity.
#[derive(Clone, Debug)]
pub struct Identity {
    primary: PrivateKeySigner,
    agent: AgentKey,
}

impl Identity {
    pub fn new(primary_key: &SecretString, agent_key: &SecretString, hrp: &str) -> Result<Self> {
        let primary_bytes = decode_private_key(primary_key.expose_secret(), "primary")?;
        let primary = PrivateKeySigner::from_slice(&primary_bytes)
            .map_err(|e| Error::with_source(Kind::InvalidKey, e))?;
        let agent = AgentKey::from_hex(agent_key.expose_secret(), hrp)?;

        Ok(Self { primary, agent })
    }

    /// EIP-55 address of the primary key.
    #[must_use]
    pub fn primary_address(&self) -> Address {
        self.primary.address()
    }

    #[must_use]
    pub fn agent_address(&self) -> &str {
        self.agent.address()
    }

    #[must_use]
    pub fn agent(&self) -> &AgentKey {
        &self.agent
    }

    /// EIP-191 personal signature by the primary key, `0x`-prefixed hex (65 bytes, `v` = 27/28).
    pub fn sign_personal_message(&self, message: &str) -> Result<String> {
        sign_personal_message(message, &self.primary)
    }
}

pub fn sign_personal_message(message: &str, signer: &PrivateKeySigner) -> Result<String> {
    let signature = signer
        .sign_message_sync(message.as_bytes())
        .map_err(|e| Error::with_source(Kind::Signing, e))?;
    Ok(hex::encode_prefixed(signature.as_bytes()))
}

/// Checks that `signature_hex` is `address`'s personal signature over `message`.
///
/// Accepts both `v` = 0/1 and `v` = 27/28 encodings.
#[must_use]
pub fn verify_personal_signature(address: Address, message: &str, signature_hex: &str) -> bool {
    let Ok(mut bytes) = hex::decode(signature_hex.trim_start_matches("0x")) else {
        return false;
    };
    if bytes.len() != 65 {
        return false;
    }
    match bytes[64] {
        0 | 1 => {}
        27 | 28 => bytes[64] -= 27,
        _ => return false,
    }
    let Ok(signature) = PersonalSignature::try_from(bytes.as_slice()) else {
        return false;
    };
    signature
        .recover_address_from_msg(message.as_bytes())
        .is_ok_and(|recovered| recovered == address)
}

/// Parses a hex EVM address, for callers holding string configuration.
pub fn parse_address(value: &str) -> Result<Address> {
    Address::from_str(value).map_err(|e| Error::validation(format!("invalid address: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const AGENT: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const PRIMARY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    // Hardhat account #0
    const PRIMARY_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn identity() -> Identity {
        Identity::new(&SecretString::from(PRIMARY), &SecretString::from(AGENT), "antx")
            .expect("valid keys")
    }

    #[test]
    fn derive_address_is_deterministic() {
        let bytes = hex::decode(AGENT.trim_start_matches("0x")).expect("hex");

        let first = derive_address(&bytes, "antx").expect("valid key");
        let second = derive_address(&bytes, "antx").expect("valid key");

        assert_eq!(first, second);
        assert!(first.starts_with("antx1"), "unexpected address {first}");
        assert_eq!(first, identity().agent_address());
    }

    #[test]
    fn zero_scalar_is_invalid_key_material() {
        let err = derive_address(&[0_u8; 32], "antx").unwrap_err();

        assert_eq!(err.kind(), Kind::InvalidKey);
    }

    #[test]
    fn short_hex_key_is_rejected() {
        let err = AgentKey::from_hex("0x1234", "antx").unwrap_err();

        assert_eq!(err.kind(), Kind::InvalidKey);
    }

    #[test]
    fn envelope_signature_is_deterministic_and_verifies() {
        let agent = identity().agent().clone();
        let payload = b"sign doc bytes";

        let first = agent.sign(payload).expect("signs");
        let second = agent.sign(payload).expect("signs");

        assert_eq!(first, second);
        assert_eq!(first.len(), SIGNATURE_LEN);
        agent.verify(payload, &first).expect("own signature verifies");
        assert!(agent.verify(b"other bytes", &first).is_err(), "tampered payload");
    }

    #[test]
    fn signature_fails_against_another_key() {
        let agent = identity().agent().clone();
        let other = AgentKey::from_hex(PRIMARY, "antx").expect("valid key");
        let payload = b"sign doc bytes";

        let signature = agent.sign(payload).expect("signs");

        assert!(other.verify(payload, &signature).is_err(), "foreign key");
        assert_ne!(
            address_of_public_key(other.public_key(), "antx").expect("valid key"),
            agent.address()
        );
    }

    #[test]
    fn personal_message_round_trips_through_recovery() {
        let identity = identity();
        let message = "Action:BindAgent\nAgentAddress:antx1xyz";

        let signature = identity.sign_personal_message(message).expect("signs");

        assert_eq!(identity.primary_address(), parse_address(PRIMARY_ADDRESS).expect("addr"));
        assert!(verify_personal_signature(identity.primary_address(), message, &signature));
        assert!(!verify_personal_signature(Address::ZERO, message, &signature));
        assert!(!verify_personal_signature(
            identity.primary_address(),
            "different message",
            &signature
        ));
    }

    #[test]
    fn unknown_recovery_byte_is_rejected() {
        let identity = identity();
        let message = "Action:BindAgent\nAgentAddress:antx1xyz";
        let signature = identity.sign_personal_message(message).expect("signs");
        let mut bytes = hex::decode(signature.trim_start_matches("0x")).expect("hex");

        bytes[64] = 5;
        assert!(!verify_personal_signature(
            identity.primary_address(),
            message,
            &hex::encode_prefixed(&bytes)
        ));

        bytes[64] = 29;
        assert!(!verify_personal_signature(
            identity.primary_address(),
            message,
            &hex::encode_prefixed(&bytes)
        ));
    }

    #[test]
    fn zero_one_recovery_byte_is_accepted() {
        let identity = identity();
        let message = "Action:BindAgent\nAgentAddress:antx1xyz";
        let signature = identity.sign_personal_message(message).expect("signs");
        let mut bytes = hex::decode(signature.trim_start_matches("0x")).expect("hex");
        if bytes[64] >= 27 {
            bytes[64] -= 27;
        }

        assert!(verify_personal_signature(
            identity.primary_address(),
            message,
            &hex::encode(&bytes)
        ));
    }

    #[test]
    fn debug_output_redacts_secret() {
        let rendered = format!("{:?}", identity().agent());

        assert!(rendered.contains("<redacted>"), "{rendered}");
        assert!(!rendered.contains("4c0883a6"), "{rendered}");
    }
}
