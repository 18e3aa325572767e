//! One long-lived websocket connection with a single background reader.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt as _, StreamExt as _};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest as _;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use crate::error::{Error, Kind};
use crate::ws::demux::Demultiplexer;
use crate::{APP_TOKEN, APP_TOKEN_HEADER, Result, USER_AGENT, WEBSOCKET_PATH};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Writer = SplitSink<Socket, Message>;
type Reader = SplitStream<Socket>;

/// Invoked with every inbound data frame after it was routed.
pub type FrameCallback = Arc<dyn Fn(&[u8]) + Send + Sync>;
/// Invoked at most once per connection when the reader fails.
pub type ErrorCallback = Arc<dyn Fn(Error) + Send + Sync>;

#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    /// The reader stopped on an error or a peer close. No reconnect is attempted.
    Failed = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Failed,
            _ => Self::Disconnected,
        }
    }
}

/// Accepts `ws://` / `wss://` URLs as is; anything else is taken as a bare
/// `host[:port]` and expanded to `ws://<host>/api/v1/ws`.
pub fn normalize_url(input: &str) -> Result<Url> {
    let input = input.trim();
    if input.starts_with("ws://") || input.starts_with("wss://") {
        return Ok(Url::parse(input)?);
    }
    Ok(Url::parse(&format!("ws://{input}{WEBSOCKET_PATH}"))?)
}

/// `Origin` header matching the websocket URL: `ws`→`http`, `wss`→`https`.
pub fn origin_of(url: &Url) -> Result<String> {
    let scheme = if url.scheme() == "wss" { "https" } else { "http" };
    let host = url
        .host_str()
        .ok_or_else(|| Error::validation(format!("websocket url {url} has no host")))?;
    Ok(match url.port() {
        Some(port) => format!("{scheme}://{host}:{port}"),
        None => format!("{scheme}://{host}"),
    })
}

pub(crate) struct Connection {
    url: Url,
    state: Arc<AtomicU8>,
    writer: Arc<Mutex<Option<Writer>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    demux: Demultiplexer,
    on_frame: Option<FrameCallback>,
    on_error: Option<ErrorCallback>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.url.as_str())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Connection {
    pub(crate) fn new(
        url: Url,
        demux: Demultiplexer,
        on_frame: Option<FrameCallback>,
        on_error: Option<ErrorCallback>,
    ) -> Self {
        Self {
            url,
            state: Arc::new(AtomicU8::new(ConnectionState::Disconnected as u8)),
            writer: Arc::new(Mutex::new(None)),
            reader: Mutex::new(None),
            demux,
            on_frame,
            on_error,
        }
    }

    pub(crate) fn url(&self) -> &Url {
        &self.url
    }

    pub(crate) fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Opens the socket and starts the reader. No-op when already connected.
    pub(crate) async fn connect(&self) -> Result<()> {
        let mut reader = self.reader.lock().await;
        if self.is_connected() {
            return Ok(());
        }
        if let Some(stale) = reader.take() {
            stale.abort();
        }
        self.set_state(ConnectionState::Connecting);

        let socket = match self.handshake().await {
            Ok(socket) => socket,
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                #[cfg(feature = "tracing")]
                tracing::warn!(url = %self.url, error = %e, "websocket connect failed");
                return Err(e.into_kind(Kind::Connect));
            }
        };

        let (writer, stream) = socket.split();
        *self.writer.lock().await = Some(writer);
        self.set_state(ConnectionState::Connected);

        #[cfg(feature = "tracing")]
        tracing::info!(url = %self.url, "websocket connected");

        *reader = Some(tokio::spawn(read_loop(
            stream,
            Arc::clone(&self.state),
            self.demux.clone(),
            self.on_frame.clone(),
            self.on_error.clone(),
        )));
        Ok(())
    }

    async fn handshake(&self) -> Result<Socket> {
        let mut request = self.url.as_str().into_client_request()?;
        let origin = HeaderValue::from_str(&origin_of(&self.url)?)
            .map_err(|e| Error::with_source(Kind::Validation, e))?;
        let headers = request.headers_mut();
        headers.insert(APP_TOKEN_HEADER, HeaderValue::from_static(APP_TOKEN));
        headers.insert("User-Agent", HeaderValue::from_static(USER_AGENT));
        headers.insert("Origin", origin);

        let (socket, _response) = connect_async(request).await?;
        Ok(socket)
    }

    /// Sends one text frame.
    pub(crate) async fn send_text(&self, text: String) -> Result<()> {
        let mut writer = self.writer.lock().await;
        let Some(sink) = writer.as_mut().filter(|_| self.is_connected()) else {
            return Err(Error::message(Kind::Stream, "websocket is not connected"));
        };
        sink.send(Message::text(text)).await?;
        Ok(())
    }

    /// Stops the reader and closes the socket. Idempotent; never invokes
    /// the error callback.
    pub(crate) async fn disconnect(&self) -> Result<()> {
        if let Some(reader) = self.reader.lock().await.take() {
            reader.abort();
        }
        let was = ConnectionState::from_u8(
            self.state
                .swap(ConnectionState::Disconnected as u8, Ordering::AcqRel),
        );

        let writer = self.writer.lock().await.take();
        if let Some(mut sink) = writer
            && was == ConnectionState::Connected
        {
            if let Err(e) = sink.send(Message::Close(None)).await {
                #[cfg(feature = "tracing")]
                tracing::debug!(error = %e, "close frame not sent");
                drop(e);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::info!(url = %self.url, "websocket disconnected");
        Ok(())
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

async fn read_loop(
    mut stream: Reader,
    state: Arc<AtomicU8>,
    demux: Demultiplexer,
    on_frame: Option<FrameCallback>,
    on_error: Option<ErrorCallback>,
) {
    let error = loop {
        let payload = match stream.next().await {
            Some(Ok(Message::Text(text))) => text.as_bytes().to_vec(),
            Some(Ok(Message::Binary(bytes))) => bytes.to_vec(),
            Some(Ok(Message::Close(frame))) => {
                break Error::message(Kind::Stream, format!("closed by peer: {frame:?}"));
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => break Error::from(e),
            None => break Error::message(Kind::Stream, "stream ended"),
        };

        demux.route(&payload);
        if let Some(callback) = &on_frame {
            callback(&payload);
        }
    };

    state.store(ConnectionState::Failed as u8, Ordering::Release);
    #[cfg(feature = "tracing")]
    tracing::warn!(error = %error, "websocket reader stopped");
    if let Some(callback) = &on_error {
        callback(error);
    }
}
