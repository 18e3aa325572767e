//! Offline verification of raw signed transactions.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use prost::Message as _;
use prost_types::Any;

use crate::Result;
use crate::error::{Error, Kind};
use crate::signer::{SECP256K1_PUBKEY_TYPE_URL, address_of_public_key, verify_envelope_signature};
use crate::tx::proto::{AuthInfo, Secp256k1PubKey, SignDoc, TxBody, TxRaw};

/// One signer of a transaction whose signature checked out.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VerifiedSigner {
    pub address: String,
    pub sequence: u64,
}

/// Decoded content of a transaction whose every signature verified.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub struct VerifiedTx {
    pub messages: Vec<Any>,
    pub unordered: bool,
    pub signers: Vec<VerifiedSigner>,
}

/// Verifies every signature of a protobuf encoded `TxRaw` for `chain_id` and
/// `account_number`, returning the signer addresses under prefix `hrp`.
pub fn verify_transaction(
    tx_bytes: &[u8],
    chain_id: &str,
    account_number: u64,
    hrp: &str,
) -> Result<VerifiedTx> {
    let raw = TxRaw::decode(tx_bytes)?;
    let body = TxBody::decode(raw.body_bytes.as_slice())?;
    let auth_info = AuthInfo::decode(raw.auth_info_bytes.as_slice())?;

    if auth_info.signer_infos.len() != raw.signatures.len() {
        return Err(Error::message(
            Kind::Signing,
            format!(
                "{} signer infos but {} signatures",
                auth_info.signer_infos.len(),
                raw.signatures.len()
            ),
        ));
    }

    let sign_bytes = SignDoc {
        body_bytes: raw.body_bytes,
        auth_info_bytes: raw.auth_info_bytes,
        chain_id: chain_id.to_owned(),
        account_number,
    }
    .encode_to_vec();

    let mut signers = Vec::with_capacity(raw.signatures.len());
    for (index, (info, signature)) in auth_info
        .signer_infos
        .iter()
        .zip(&raw.signatures)
        .enumerate()
    {
        let public_key = info
            .public_key
            .as_ref()
            .ok_or_else(|| Error::message(Kind::Signing, format!("signer {index} has no public key")))?;
        if public_key.type_url != SECP256K1_PUBKEY_TYPE_URL {
            return Err(Error::message(
                Kind::Signing,
                format!(
                    "signer {index} uses unsupported key type {}",
                    public_key.type_url
                ),
            ));
        }
        let key = Secp256k1PubKey::decode(public_key.value.as_slice())?;

        verify_envelope_signature(&sign_bytes, signature, &key.key)
            .map_err(|e| e.into_kind(Kind::Signing))?;
        signers.push(VerifiedSigner {
            address: address_of_public_key(&key.key, hrp)?,
            sequence: info.sequence,
        });
    }

    Ok(VerifiedTx {
        messages: body.messages,
        unordered: body.unordered,
        signers,
    })
}

/// [`verify_transaction`] for the base64 form submitted to the gateway.
pub fn verify_transaction_base64(
    raw_tx: &str,
    chain_id: &str,
    account_number: u64,
    hrp: &str,
) -> Result<VerifiedTx> {
    let bytes = STANDARD
        .decode(raw_tx)
        .map_err(|e| Error::with_source(Kind::Encoding, e))?;
    verify_transaction(&bytes, chain_id, account_number, hrp)
}

/// Verifies the transaction and that its single signer is `expected_address`.
pub fn verify_signed_by(
    tx_bytes: &[u8],
    chain_id: &str,
    account_number: u64,
    expected_address: &str,
) -> Result<VerifiedTx> {
    let (hrp, _) = crate::address::decode_bech32(expected_address)?;
    let verified = verify_transaction(tx_bytes, chain_id, account_number, &hrp)?;

    match verified.signers.as_slice() {
        [signer] if signer.address == expected_address => Ok(verified),
        [signer] => Err(Error::message(
            Kind::Signing,
            format!(
                "transaction signed by {}, expected {expected_address}",
                signer.address
            ),
        )),
        signers => Err(Error::message(
            Kind::Signing,
            format!("expected exactly one signer, found {}", signers.len()),
        )),
    }
}
