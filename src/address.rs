//! Conversions between the two address formats an identity is known by:
//! the ledger-native bech32 form and the 20-byte hex form used by EVM tooling.

use std::str::FromStr as _;

use bech32::{Bech32, Hrp};

use crate::Result;
use crate::error::{Error, Kind};
use crate::types::Address;

const ADDRESS_LEN: usize = 20;

/// Encodes a 20-byte account hash as bech32 under `hrp`.
pub fn encode_bech32(hrp: &str, payload: &[u8]) -> Result<String> {
    let hrp = Hrp::parse(hrp)
        .map_err(|e| Error::validation(format!("invalid bech32 prefix `{hrp}`: {e}")))?;
    bech32::encode::<Bech32>(hrp, payload)
        .map_err(|e| Error::with_source(Kind::Encoding, e))
}

/// Decodes any bech32 address, returning its prefix and payload bytes.
pub fn decode_bech32(address: &str) -> Result<(String, Vec<u8>)> {
    let (hrp, payload) = bech32::decode(address)
        .map_err(|e| Error::validation(format!("invalid bech32 address `{address}`: {e}")))?;
    Ok((hrp.to_string(), payload))
}

fn raw_bytes(address: &str) -> Result<Vec<u8>> {
    if address.is_empty() {
        return Err(Error::validation("address can't be empty"));
    }
    if address.starts_with("0x") || address.starts_with("0X") {
        let parsed = Address::from_str(address)
            .map_err(|e| Error::validation(format!("invalid hex address `{address}`: {e}")))?;
        return Ok(parsed.to_vec());
    }
    decode_bech32(address).map(|(_, payload)| payload)
}

/// Converts a hex or bech32 address into a bech32 address with prefix `hrp`.
pub fn to_bech32(address: &str, hrp: &str) -> Result<String> {
    encode_bech32(hrp, &raw_bytes(address)?)
}

/// Converts a hex or bech32 address into an EIP-55 checksummed hex address.
pub fn to_hex(address: &str) -> Result<Address> {
    let bytes = raw_bytes(address)?;
    if bytes.len() != ADDRESS_LEN {
        return Err(Error::validation(format!(
            "address `{address}` decodes to {} bytes, expected {}",
            bytes.len(),
            ADDRESS_LEN
        )));
    }
    Ok(Address::from_slice(&bytes))
}
