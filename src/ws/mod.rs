//! Realtime market data over the `/api/v1/ws` endpoint.
//!
//! A [`WsClient`] owns one connection and one reader task. Inbound frames are
//! routed by their `channel` field into bounded per-subscription queues; a full
//! queue loses the newest frame instead of stalling the reader.

pub mod channel;
mod client;
mod connection;
mod demux;
mod types;

pub use client::{WsClient, WsOptions};
pub use connection::{ConnectionState, ErrorCallback, FrameCallback, normalize_url, origin_of};
pub use demux::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_FIRST_FRAME_TIMEOUT, Demultiplexer, Frame, RouteOutcome,
    Subscription,
};
pub use types::{
    ControlMethod, DataFrame, parse_depth_data, parse_first, parse_funding_rate_data,
    parse_kline_data, parse_price_data, parse_ticker_data, parse_trade_data,
};
