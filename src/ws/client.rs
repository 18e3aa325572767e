use std::fmt;

use bon::Builder;
use url::Url;

use crate::Result;
use crate::types::{KlineType, PriceType};
use crate::ws::channel;
use crate::ws::connection::{Connection, ConnectionState, ErrorCallback, FrameCallback, normalize_url};
use crate::ws::demux::{DEFAULT_CHANNEL_CAPACITY, Demultiplexer, Subscription};
use crate::ws::types::{ControlFrame, ControlMethod};

/// Tunables for a [`WsClient`].
#[non_exhaustive]
#[derive(Builder, Clone)]
pub struct WsOptions {
    /// Queue depth of each subscription.
    #[builder(default = DEFAULT_CHANNEL_CAPACITY)]
    pub capacity: usize,
    /// Sees every inbound frame, routed or not.
    pub on_frame: Option<FrameCallback>,
    /// Called once when the connection fails; not on [`WsClient::disconnect`].
    pub on_error: Option<ErrorCallback>,
}

impl Default for WsOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for WsOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsOptions")
            .field("capacity", &self.capacity)
            .field("on_frame", &self.on_frame.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Realtime client: one connection, many channel subscriptions.
///
/// ```no_run
/// # async fn run() -> antx_client_sdk::Result<()> {
/// use antx_client_sdk::ws::{WsClient, parse_ticker_data};
///
/// let client = WsClient::new("wss://stream.antx.exchange/api/v1/ws")?;
/// client.connect().await?;
/// let mut ticker = client.subscribe_ticker("200001").await?;
/// if let Some(frame) = ticker.recv_first().await {
///     let last = parse_ticker_data(&frame)?.last_price;
/// }
/// client.disconnect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct WsClient {
    connection: Connection,
    demux: Demultiplexer,
}

impl WsClient {
    /// `url` may be a full `ws://`/`wss://` URL or a bare `host[:port]`.
    pub fn new(url: &str) -> Result<Self> {
        Self::with_options(url, WsOptions::default())
    }

    pub fn with_options(url: &str, options: WsOptions) -> Result<Self> {
        Ok(Self::from_url(normalize_url(url)?, options))
    }

    #[must_use]
    pub fn from_url(url: Url, options: WsOptions) -> Self {
        let demux = Demultiplexer::new(options.capacity);
        let connection = Connection::new(url, demux.clone(), options.on_frame, options.on_error);
        Self { connection, demux }
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        self.connection.url()
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Snapshot only; the connection may fail right after this returns.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Registry shared with the reader, for inspection.
    #[must_use]
    pub fn demultiplexer(&self) -> &Demultiplexer {
        &self.demux
    }

    pub async fn connect(&self) -> Result<()> {
        self.connection.connect().await
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.connection.disconnect().await
    }

    /// Registers a queue for `channel`, then asks the server for it.
    ///
    /// The queue exists before the request goes out so the first frame is
    /// never lost. If the request cannot be sent the queue is removed again.
    pub async fn subscribe(&self, channel: &str) -> Result<Subscription> {
        let subscription = self.demux.register(channel);
        if let Err(e) = self.send_control(ControlMethod::Subscribe, channel).await {
            drop(subscription);
            self.demux.prune(channel);
            return Err(e);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(%channel, "subscribed");
        Ok(subscription)
    }

    /// Asks the server to stop `channel` and ends every local subscription to it.
    ///
    /// Local queues are removed even when the request cannot be sent.
    pub async fn unsubscribe(&self, channel: &str) -> Result<()> {
        let sent = self.send_control(ControlMethod::Unsubscribe, channel).await;
        self.demux.remove(channel);

        #[cfg(feature = "tracing")]
        tracing::debug!(%channel, "unsubscribed");
        sent
    }

    pub async fn subscribe_ticker(&self, exchange_id: &str) -> Result<Subscription> {
        self.subscribe(&channel::ticker(exchange_id)).await
    }

    pub async fn subscribe_kline(
        &self,
        price_type: PriceType,
        exchange_id: &str,
        kline_type: KlineType,
    ) -> Result<Subscription> {
        self.subscribe(&channel::kline(price_type, exchange_id, kline_type))
            .await
    }

    pub async fn subscribe_depth(&self, exchange_id: &str) -> Result<Subscription> {
        self.subscribe(&channel::depth(exchange_id)).await
    }

    pub async fn subscribe_trade(&self, exchange_id: &str) -> Result<Subscription> {
        self.subscribe(&channel::trade(exchange_id)).await
    }

    pub async fn subscribe_funding_rate(&self, exchange_id: &str) -> Result<Subscription> {
        self.subscribe(&channel::funding_rate(exchange_id)).await
    }

    pub async fn subscribe_price(
        &self,
        price_type: PriceType,
        exchange_id: &str,
    ) -> Result<Subscription> {
        self.subscribe(&channel::price(price_type, exchange_id)).await
    }

    async fn send_control(&self, method: ControlMethod, channel: &str) -> Result<()> {
        let text = serde_json::to_string(&ControlFrame::new(method, channel))?;
        self.connection.send_text(text).await
    }
}
