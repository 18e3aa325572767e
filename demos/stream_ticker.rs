//! Streams ticker and one-minute candles for one exchange until Ctrl-C.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example stream_ticker --features tracing -- wss://stream.antx.exchange/api/v1/ws 200001
//! ```

use std::env;
use std::sync::Arc;

use antx_client_sdk::types::{KlineType, PriceType};
use antx_client_sdk::ws::{WsClient, WsOptions, parse_kline_data, parse_ticker_data};
use tracing::level_filters::LevelFilter;

const DEFAULT_URL: &str = "wss://stream.antx.exchange/api/v1/ws";
const DEFAULT_EXCHANGE: &str = "200001";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::INFO)
        .init();

    let mut args = env::args().skip(1);
    let url = args.next().unwrap_or_else(|| DEFAULT_URL.to_owned());
    let exchange_id = args.next().unwrap_or_else(|| DEFAULT_EXCHANGE.to_owned());

    let options = WsOptions::builder()
        .on_error(Arc::new(|e: antx_client_sdk::error::Error| {
            tracing::error!(error = %e, "stream failed");
        }))
        .build();
    let client = WsClient::with_options(&url, options)?;
    client.connect().await?;

    let mut ticker = client.subscribe_ticker(&exchange_id).await?;
    let mut kline = client
        .subscribe_kline(PriceType::Last, &exchange_id, KlineType::Minute1)
        .await?;

    loop {
        tokio::select! {
            Some(frame) = ticker.recv() => match parse_ticker_data(&frame) {
                Ok(t) => tracing::info!(last = ?t.last_price, mark = ?t.mark_price, "ticker"),
                Err(e) => tracing::warn!(error = %e, "bad ticker frame"),
            },
            Some(frame) = kline.recv() => match parse_kline_data(&frame) {
                Ok(k) => tracing::info!(time = k.kline_time, close = %k.close, "kline"),
                Err(e) => tracing::warn!(error = %e, "bad kline frame"),
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    client.unsubscribe(ticker.channel()).await?;
    client.disconnect().await?;
    Ok(())
}
