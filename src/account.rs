//! Server-tracked account counters.

use serde::Deserialize;

use crate::Result;
use crate::error::{Error, Kind};
use crate::gateway::{ADDRESS_INFO_PATH, Gateway};

/// Ledger account counters of one address.
///
/// `account_number` never changes once the account exists. `sequence` is
/// advanced by the ledger for every ordered transaction and must be read
/// fresh before each one.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AccountState {
    pub account_number: u64,
    pub sequence: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddressInfo {
    #[serde(default = "exists_by_default")]
    exist: bool,
    #[serde(default)]
    account_number: String,
    #[serde(default)]
    sequence: String,
}

const fn exists_by_default() -> bool {
    true
}

fn parse_counter(field: &str, value: &str) -> Result<u64> {
    value.trim().parse::<u64>().map_err(|e| {
        Error::message(
            Kind::Transport,
            format!("gateway returned unparsable {field} `{value}`: {e}"),
        )
    })
}

/// Fetches the account number and the current sequence of `address`.
pub async fn fetch_account_state(gateway: &Gateway, address: &str) -> Result<AccountState> {
    let info: AddressInfo = gateway
        .get(ADDRESS_INFO_PATH, &[("address", address)])
        .await?;

    if !info.exist {
        return Err(Error::message(
            Kind::AccountNotFound,
            format!("address {address} does not exist on the ledger"),
        ));
    }

    let state = AccountState {
        account_number: parse_counter("accountNumber", &info.account_number)?,
        sequence: parse_counter("sequence", &info.sequence)?,
    };

    #[cfg(feature = "tracing")]
    tracing::debug!(
        %address,
        account_number = state.account_number,
        sequence = state.sequence,
        "fetched account state"
    );

    Ok(state)
}
