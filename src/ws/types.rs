//! Realtime wire frames and typed payload parsers.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;
use crate::error::{Error, Kind};
use crate::market::{Depth, FundingRate, Kline, Price, Ticker, Trade};

#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMethod {
    Subscribe,
    Unsubscribe,
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct ChannelRef<'a> {
    pub(crate) channel: &'a str,
}

/// Outbound `{"method": .., "subscription": {"channel": ..}}` frame.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct ControlFrame<'a> {
    pub(crate) method: ControlMethod,
    pub(crate) subscription: ChannelRef<'a>,
}

impl<'a> ControlFrame<'a> {
    pub(crate) fn new(method: ControlMethod, channel: &'a str) -> Self {
        Self {
            method,
            subscription: ChannelRef { channel },
        }
    }
}

/// Inbound `{channel, event, data: [..]}` frame.
#[non_exhaustive]
#[derive(Clone, Debug, Deserialize)]
pub struct DataFrame<T> {
    pub channel: String,
    #[serde(default)]
    pub event: String,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Unwraps a data frame and decodes its first element as `T`.
pub fn parse_first<T: DeserializeOwned>(frame: &[u8]) -> Result<T> {
    let outer: DataFrame<Value> =
        serde_json::from_slice(frame).map_err(|e| Error::with_source(Kind::MalformedFrame, e))?;
    let first = outer.data.into_iter().next().ok_or_else(|| {
        Error::message(
            Kind::EmptyPayload,
            format!("frame on {} carried no data", outer.channel),
        )
    })?;
    serde_json::from_value(first).map_err(|e| Error::with_source(Kind::MalformedFrame, e))
}

pub fn parse_ticker_data(frame: &[u8]) -> Result<Ticker> {
    parse_first(frame)
}

pub fn parse_kline_data(frame: &[u8]) -> Result<Kline> {
    parse_first(frame)
}

pub fn parse_depth_data(frame: &[u8]) -> Result<Depth> {
    parse_first(frame)
}

pub fn parse_trade_data(frame: &[u8]) -> Result<Trade> {
    parse_first(frame)
}

pub fn parse_funding_rate_data(frame: &[u8]) -> Result<FundingRate> {
    parse_first(frame)
}

pub fn parse_price_data(frame: &[u8]) -> Result<Price> {
    parse_first(frame)
}
