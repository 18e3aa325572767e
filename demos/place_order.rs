//! Places one limit buy through the gateway and cancels it by client id.
//!
//! # Environment Variables
//!
//! - `ANTX_GATEWAY`: gateway base URL, e.g. `https://api.antx.exchange`
//! - `ANTX_CHAIN_ID`: ledger chain id
//! - `ANTX_PRIMARY_KEY`: hex EVM key that owns the account
//! - `ANTX_AGENT_KEY`: hex agent key bound to it
//!
//! # Usage
//!
//! ```bash
//! cargo run --example place_order --features tracing
//! ```

use std::env;

use antx_client_sdk::trading::{
    ClientConfig, CreateOrderRequest, OrderParams, RawClientConfig, SubmitPolicies, TradingClient,
};
use antx_client_sdk::types::TimeInForce;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use tracing::level_filters::LevelFilter;

const SUBACCOUNT_ID: u64 = 1;
const EXCHANGE_ID: u64 = 200_001;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    let raw = RawClientConfig {
        gateway: env::var("ANTX_GATEWAY")?,
        ws_url: None,
        chain_id: env::var("ANTX_CHAIN_ID")?,
        primary_key: SecretString::from(env::var("ANTX_PRIMARY_KEY")?),
        agent_key: SecretString::from(env::var("ANTX_AGENT_KEY")?),
        account_hrp: None,
    };
    let config = ClientConfig::from_raw(raw, SubmitPolicies::default())?;
    let client = TradingClient::bootstrap(config).await?;
    tracing::info!(
        agent = client.agent_address(),
        account_number = client.account_number(),
        "bootstrapped"
    );

    let request = CreateOrderRequest::builder()
        .subaccount_id(SUBACCOUNT_ID)
        .exchange_id(EXCHANGE_ID)
        .leverage(5)
        .order(
            OrderParams::builder()
                .is_buy(true)
                .price(dec!(10000.0))
                .size(dec!(0.001))
                .client_order_id("demo-order-1")
                .time_in_force(TimeInForce::Gtc)
                .build(),
        )
        .build();

    let placed = client.create_order(&request).await?;
    tracing::info!(tx = %placed, "order submitted");

    let cancelled = client
        .cancel_order_by_client_id(SUBACCOUNT_ID, &["demo-order-1"])
        .await?;
    tracing::info!(tx = %cancelled, "cancel submitted");

    Ok(())
}
