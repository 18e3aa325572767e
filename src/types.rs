//! Shared value types used across the HTTP, signing and realtime surfaces.

use std::fmt;

pub use alloy::primitives::Address;
pub use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Cosmos chain identifier, e.g. `antx-devnet`.
pub type ChainId = String;

/// Opaque identifier the gateway returns for an accepted transaction.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHandle(String);

impl TxHandle {
    #[must_use]
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Price source referenced by kline channels and trigger orders.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum PriceType {
    #[strum(serialize = "PRICE_TYPE_LAST")]
    #[serde(rename = "PRICE_TYPE_LAST")]
    Last = 1,
    #[strum(serialize = "PRICE_TYPE_ASK_BEST")]
    #[serde(rename = "PRICE_TYPE_ASK_BEST")]
    AskBest = 2,
    #[strum(serialize = "PRICE_TYPE_BID_BEST")]
    #[serde(rename = "PRICE_TYPE_BID_BEST")]
    BidBest = 3,
    #[strum(serialize = "PRICE_TYPE_MARK")]
    #[serde(rename = "PRICE_TYPE_MARK")]
    Mark = 4,
    #[strum(serialize = "PRICE_TYPE_ORACLE")]
    #[serde(rename = "PRICE_TYPE_ORACLE")]
    Oracle = 5,
}

/// Candle interval.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum KlineType {
    #[strum(serialize = "MINUTE_1")]
    #[serde(rename = "MINUTE_1")]
    Minute1,
    #[strum(serialize = "MINUTE_5")]
    #[serde(rename = "MINUTE_5")]
    Minute5,
    #[strum(serialize = "MINUTE_15")]
    #[serde(rename = "MINUTE_15")]
    Minute15,
    #[strum(serialize = "MINUTE_30")]
    #[serde(rename = "MINUTE_30")]
    Minute30,
    #[strum(serialize = "HOUR_1")]
    #[serde(rename = "HOUR_1")]
    Hour1,
    #[strum(serialize = "HOUR_2")]
    #[serde(rename = "HOUR_2")]
    Hour2,
    #[strum(serialize = "HOUR_4")]
    #[serde(rename = "HOUR_4")]
    Hour4,
    #[strum(serialize = "HOUR_6")]
    #[serde(rename = "HOUR_6")]
    Hour6,
    #[strum(serialize = "HOUR_8")]
    #[serde(rename = "HOUR_8")]
    Hour8,
    #[strum(serialize = "HOUR_12")]
    #[serde(rename = "HOUR_12")]
    Hour12,
    #[strum(serialize = "DAY_1")]
    #[serde(rename = "DAY_1")]
    Day1,
    #[strum(serialize = "WEEK_1")]
    #[serde(rename = "WEEK_1")]
    Week1,
    #[strum(serialize = "MONTH_1")]
    #[serde(rename = "MONTH_1")]
    Month1,
}

#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Display)]
pub enum MarginMode {
    #[default]
    Unspecified = 0,
    Cross = 1,
    Isolated = 2,
}

#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Display)]
pub enum TimeInForce {
    Unspecified = 0,
    #[default]
    #[strum(serialize = "GTC")]
    Gtc = 1,
    #[strum(serialize = "FOK")]
    Fok = 2,
    #[strum(serialize = "IOC")]
    Ioc = 3,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn kline_type_uses_wire_names() {
        assert_eq!(KlineType::Minute1.to_string(), "MINUTE_1");
        assert_eq!(KlineType::Month1.to_string(), "MONTH_1");
        assert_eq!(
            KlineType::from_str("HOUR_4").expect("known interval"),
            KlineType::Hour4
        );
    }

    #[test]
    fn price_type_uses_wire_names() {
        assert_eq!(PriceType::Last.to_string(), "PRICE_TYPE_LAST");
        assert_eq!(
            serde_json::to_string(&PriceType::Mark).expect("serializable"),
            "\"PRICE_TYPE_MARK\""
        );
    }
}
