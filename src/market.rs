//! Market data records shared by the gateway queries and the realtime
//! channel parsers.
//!
//! Numeric values travel as decimal strings; fields the venue may leave blank
//! (e.g. funding data on spot markets) decode to `None`.

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, NoneAsEmptyString, PickFirst, serde_as};

use crate::TimestampMillis;
use crate::types::{Decimal, KlineType, PriceType};

/// Rolling 24h statistics for one exchange, pushed on `ticker.<exchangeId>`.
#[serde_as]
#[non_exhaustive]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Ticker {
    pub exchange_id: String,
    #[serde_as(as = "NoneAsEmptyString")]
    pub last_price: Option<Decimal>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub mark_price: Option<Decimal>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub index_price: Option<Decimal>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub oracle_price: Option<Decimal>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub price_change: Option<Decimal>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub price_change_percent: Option<Decimal>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub high: Option<Decimal>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub low: Option<Decimal>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub open: Option<Decimal>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub close: Option<Decimal>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub size: Option<Decimal>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub value: Option<Decimal>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub open_interest: Option<Decimal>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub funding_rate: Option<Decimal>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub funding_time: Option<TimestampMillis>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub next_funding_time: Option<TimestampMillis>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub start_time: Option<TimestampMillis>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub end_time: Option<TimestampMillis>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub high_time: Option<TimestampMillis>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub low_time: Option<TimestampMillis>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub trades: Option<u64>,
}

/// One candle. Pushed on `kline.<priceType>.<exchangeId>.<klineType>` and
/// returned in pages by [`Gateway::kline`](crate::gateway::Gateway::kline).
#[serde_as]
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kline {
    #[serde(default)]
    pub kline_id: String,
    pub exchange_id: String,
    pub kline_type: KlineType,
    pub price_type: PriceType,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub kline_time: TimestampMillis,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub trades: u64,
    pub size: Decimal,
    pub value: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub open: Decimal,
    pub close: Decimal,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub maker_buy_size: Option<Decimal>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub maker_buy_value: Option<Decimal>,
}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Decimal,
    pub size: Decimal,
}

/// Order book snapshot, pushed on `depth.<exchangeId>`.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Depth {
    pub exchange_id: String,
    #[serde(default)]
    pub bids: Vec<BookLevel>,
    #[serde(default)]
    pub asks: Vec<BookLevel>,
    #[serde(default)]
    pub updated_time: TimestampMillis,
}

/// Public fill, pushed on `trade.<exchangeId>`.
#[serde_as]
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub exchange_id: String,
    pub price: Decimal,
    pub size: Decimal,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub value: Option<Decimal>,
    pub is_buy: bool,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub time: TimestampMillis,
}

/// Pushed on `fundingRate.<exchangeId>`.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingRate {
    pub exchange_id: String,
    pub funding_rate: Decimal,
    pub oracle_price: Decimal,
    pub index_price: Decimal,
    pub funding_time: TimestampMillis,
    #[serde(default)]
    pub is_settlement: bool,
    #[serde(default)]
    pub updated_time: TimestampMillis,
}

/// Pushed on `price.<priceType>.<exchangeId>`.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    pub exchange_id: String,
    pub price: Decimal,
    pub price_time: TimestampMillis,
    #[serde(default)]
    pub created_time: TimestampMillis,
}

/// Settlement asset listed on the venue.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coin {
    pub id: String,
    pub symbol: String,
    pub step_size_scale: i32,
    #[serde(default)]
    pub asset_chain_id: String,
    #[serde(default)]
    pub asset_contract_address: String,
}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskTier {
    pub max_leverage: u32,
    pub maintenance_margin_ratio_ppm: u32,
    pub position_value_upper_bound: Decimal,
}

/// Perpetual-only trading parameters of an [`Exchange`].
#[non_exhaustive]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Perpetual {
    pub support_margin_mode_list: Vec<u32>,
    pub risk_tier_list: Vec<RiskTier>,
    pub liquidate_fee_rate_ppm: u32,
    pub default_leverage: u32,
    pub enable_order_create: bool,
    pub enable_order_fill: bool,
    pub enable_position_open: bool,
    pub funding_interest_rate_ppm: u32,
    pub funding_impact_margin_notional: String,
    pub funding_rate_abs_max_ppm: u32,
    pub funding_rate_interval_minutes: u32,
}

/// Tradable market. Spot ids live in `[100001, 109999]`, perpetual ids in
/// `[200001, 209999]`.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    pub id: String,
    pub symbol: String,
    pub base_coin_id: String,
    pub quote_coin_id: String,
    pub step_size_scale: i32,
    pub tick_size_scale: i32,
    #[serde(default)]
    pub order_price_max_ratio_ppm: u32,
    #[serde(default)]
    pub order_price_min_ratio_ppm: u32,
    #[serde(default)]
    pub order_size_max: String,
    #[serde(default)]
    pub perpetual: Perpetual,
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    #[test]
    fn ticker_blank_fields_decode_to_none() {
        let ticker: Ticker = serde_json::from_value(json!({
            "exchangeId": "100001",
            "lastPrice": "64250.5",
            "fundingRate": "",
            "fundingTime": "",
            "trades": "1834"
        }))
        .expect("valid ticker");

        assert_eq!(ticker.exchange_id, "100001");
        assert_eq!(ticker.last_price, Some(dec!(64250.5)));
        assert_eq!(ticker.funding_rate, None);
        assert_eq!(ticker.funding_time, None);
        assert_eq!(ticker.trades, Some(1834));
    }

    #[test]
    fn kline_accepts_numeric_or_string_times() {
        let kline: Kline = serde_json::from_value(json!({
            "klineId": "9",
            "exchangeId": "200001",
            "klineType": "MINUTE_1",
            "priceType": "PRICE_TYPE_LAST",
            "klineTime": 1_717_000_000_000_i64,
            "trades": "12",
            "size": "1.5",
            "value": "96375",
            "high": "64300",
            "low": "64200",
            "open": "64210",
            "close": "64250"
        }))
        .expect("valid kline");

        assert_eq!(kline.kline_type, KlineType::Minute1);
        assert_eq!(kline.kline_time, 1_717_000_000_000);
        assert_eq!(kline.trades, 12);
        assert_eq!(kline.maker_buy_size, None);
    }
}
