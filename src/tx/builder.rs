use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, TimeDelta, Utc};
use prost::Message as _;
use prost_types::{Any, Timestamp};

use crate::Result;
use crate::error::{Error, Kind};
use crate::signer::{AgentKey, SECP256K1_PUBKEY_TYPE_URL};
use crate::tx::proto::{
    AuthInfo, Fee, ModeInfo, SIGN_MODE_DIRECT, Secp256k1PubKey, SignDoc, SignerInfo, TxBody, TxRaw,
};

pub const DEFAULT_GAS_LIMIT: u64 = 200_000;
/// Validity window of an unordered envelope, measured from construction.
pub const DEFAULT_UNORDERED_WINDOW: Duration = Duration::from_secs(10);

/// How the ledger orders an envelope against others from the same signer.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Sequencing {
    /// Must carry the signer's current ledger sequence.
    Ordered { sequence: u64 },
    /// Replay protected by expiry instead of sequence.
    Unordered { expires_at: DateTime<Utc> },
}

impl Sequencing {
    /// Unordered sequencing expiring `window` after `now`.
    pub fn unordered_at(now: DateTime<Utc>, window: Duration) -> Result<Self> {
        let window = TimeDelta::from_std(window).map_err(|e| Error::with_source(Kind::Build, e))?;
        let expires_at = now
            .checked_add_signed(window)
            .ok_or_else(|| Error::message(Kind::Build, "unordered expiry overflows"))?;
        Ok(Self::Unordered { expires_at })
    }
}

fn to_timestamp(at: DateTime<Utc>) -> Result<Timestamp> {
    let nanos = i32::try_from(at.timestamp_subsec_nanos())
        .map_err(|e| Error::with_source(Kind::Build, e))?;
    Ok(Timestamp {
        seconds: at.timestamp(),
        nanos,
    })
}

/// An unsigned transaction: body plus signer/fee information.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    body: TxBody,
    auth_info: AuthInfo,
}

impl Envelope {
    /// Wraps `messages` for a single signer identified by its compressed
    /// public key. The fee is always empty.
    pub fn new(
        messages: Vec<Any>,
        sequencing: Sequencing,
        signer_public_key: &[u8],
        gas_limit: u64,
    ) -> Result<Self> {
        if messages.is_empty() {
            return Err(Error::message(
                Kind::Build,
                "an envelope needs at least one instruction",
            ));
        }

        let mut body = TxBody {
            messages,
            ..TxBody::default()
        };
        let sequence = match sequencing {
            Sequencing::Ordered { sequence } => sequence,
            Sequencing::Unordered { expires_at } => {
                body.unordered = true;
                body.timeout_timestamp = Some(to_timestamp(expires_at)?);
                0
            }
        };

        let public_key = Any {
            type_url: SECP256K1_PUBKEY_TYPE_URL.to_owned(),
            value: Secp256k1PubKey {
                key: signer_public_key.to_vec(),
            }
            .encode_to_vec(),
        };
        let auth_info = AuthInfo {
            signer_infos: vec![SignerInfo {
                public_key: Some(public_key),
                mode_info: Some(ModeInfo::single(SIGN_MODE_DIRECT)),
                sequence,
            }],
            fee: Some(Fee {
                amount: Vec::new(),
                gas_limit,
                ..Fee::default()
            }),
        };

        Ok(Self { body, auth_info })
    }

    #[must_use]
    pub fn body(&self) -> &TxBody {
        &self.body
    }

    #[must_use]
    pub fn auth_info(&self) -> &AuthInfo {
        &self.auth_info
    }

    /// Sequence the signer info carries; `0` for unordered envelopes.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.auth_info
            .signer_infos
            .first()
            .map_or(0, |info| info.sequence)
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let timestamp = self.body.timeout_timestamp.as_ref()?;
        let nanos = u32::try_from(timestamp.nanos).ok()?;
        DateTime::from_timestamp(timestamp.seconds, nanos)
    }

    /// SIGN_MODE_DIRECT sign document binding this envelope to a chain and
    /// an account.
    #[must_use]
    pub fn sign_doc(&self, chain_id: &str, account_number: u64) -> SignDoc {
        SignDoc {
            body_bytes: self.body.encode_to_vec(),
            auth_info_bytes: self.auth_info.encode_to_vec(),
            chain_id: chain_id.to_owned(),
            account_number,
        }
    }

    /// Signs the envelope once with `key`, consuming it.
    pub fn sign(self, chain_id: &str, account_number: u64, key: &AgentKey) -> Result<SignedEnvelope> {
        let doc = self.sign_doc(chain_id, account_number);
        let signature = key.sign(&doc.encode_to_vec())?;

        Ok(SignedEnvelope {
            raw: TxRaw {
                body_bytes: doc.body_bytes,
                auth_info_bytes: doc.auth_info_bytes,
                signatures: vec![signature],
            },
        })
    }
}

/// A signed, ready to submit transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct SignedEnvelope {
    raw: TxRaw,
}

impl SignedEnvelope {
    #[must_use]
    pub fn raw(&self) -> &TxRaw {
        &self.raw
    }

    /// Protobuf encoded `TxRaw`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.raw.encode_to_vec()
    }

    /// Standard base64 of [`Self::to_bytes`], the form the gateway accepts.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use prost::Message as _;

    use super::*;
    use crate::tx::proto::mode_info;

    const AGENT_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn instruction() -> Any {
        Any {
            type_url: "/antx.chain.order.MsgCancelAllOrder".to_owned(),
            value: vec![0x0a, 0x01, 0x61],
        }
    }

    fn agent() -> AgentKey {
        AgentKey::from_hex(AGENT_KEY, "antx").expect("valid key")
    }

    #[test]
    fn ordered_envelope_carries_sequence() {
        let key = agent();
        let envelope = Envelope::new(
            vec![instruction()],
            Sequencing::Ordered { sequence: 7 },
            key.public_key(),
            DEFAULT_GAS_LIMIT,
        )
        .expect("envelope");

        assert_eq!(envelope.sequence(), 7);
        assert!(!envelope.body().unordered, "ordered must not set unordered");
        assert_eq!(envelope.expires_at(), None);

        let info = &envelope.auth_info().signer_infos[0];
        assert_eq!(
            info.mode_info.as_ref().and_then(|m| m.sum.clone()),
            Some(mode_info::Sum::Single(mode_info::Single {
                mode: SIGN_MODE_DIRECT
            }))
        );
        let fee = envelope.auth_info().fee.as_ref().expect("fee");
        assert_eq!(fee.gas_limit, DEFAULT_GAS_LIMIT);
        assert!(fee.amount.is_empty(), "fee must be zero");
    }

    #[test]
    fn unordered_envelope_expires_after_window() {
        let now = Utc
            .timestamp_millis_opt(1_717_000_000_123)
            .single()
            .expect("valid instant");
        let sequencing = Sequencing::unordered_at(now, DEFAULT_UNORDERED_WINDOW).expect("sequencing");
        let envelope = Envelope::new(
            vec![instruction()],
            sequencing,
            agent().public_key(),
            DEFAULT_GAS_LIMIT,
        )
        .expect("envelope");

        assert!(envelope.body().unordered, "unordered flag");
        assert_eq!(envelope.sequence(), 0);
        let expires_at = envelope.expires_at().expect("expiry");
        assert_eq!(expires_at.timestamp_millis(), 1_717_000_010_123);
    }

    #[test]
    fn empty_instruction_list_is_rejected() {
        let err = Envelope::new(
            Vec::new(),
            Sequencing::Ordered { sequence: 0 },
            agent().public_key(),
            DEFAULT_GAS_LIMIT,
        )
        .unwrap_err();

        assert_eq!(err.kind(), Kind::Build);
    }

    #[test]
    fn signed_envelope_decodes_back() {
        let key = agent();
        let envelope = Envelope::new(
            vec![instruction()],
            Sequencing::Ordered { sequence: 3 },
            key.public_key(),
            DEFAULT_GAS_LIMIT,
        )
        .expect("envelope");
        let doc = envelope.sign_doc("antx-test", 42);

        let signed = envelope.sign("antx-test", 42, &key).expect("signed");
        let raw = TxRaw::decode(signed.to_bytes().as_slice()).expect("decodable");

        assert_eq!(raw.body_bytes, doc.body_bytes);
        assert_eq!(raw.signatures.len(), 1);
        key.verify(&doc.encode_to_vec(), &raw.signatures[0])
            .expect("signature verifies");
    }
}
