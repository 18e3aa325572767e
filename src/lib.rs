#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod account;
pub mod address;
pub mod error;
pub mod gateway;
pub mod market;
pub mod signer;
pub mod trading;
pub mod tx;
pub mod types;
#[cfg(feature = "ws")]
pub mod ws;

use std::result::Result as StdResult;

use crate::error::Error;

pub type Result<T> = StdResult<T, Error>;

/// Milliseconds since the Unix epoch, as used by every gateway timestamp.
pub type TimestampMillis = i64;

/// Gateway path prefix shared by every HTTP endpoint.
pub const BASE_API_PATH: &str = "/api/v1";
/// Realtime endpoint path, relative to the websocket host.
pub const WEBSOCKET_PATH: &str = "/api/v1/ws";

/// Sent on every HTTP and websocket handshake. Not a secret: upstream edge
/// filtering rejects requests that lack it.
pub(crate) const APP_TOKEN_HEADER: &str = "X-App-Token";
pub(crate) const APP_TOKEN: &str = "ANTECH-APP-SECRET-KEY-001";
pub(crate) const USER_AGENT: &str = "Mozilla/5.0 (Mobile; FlutterApp/1.0)";

/// Default bech32 prefix for agent (ledger-native) addresses.
pub const DEFAULT_ACCOUNT_HRP: &str = "antx";
