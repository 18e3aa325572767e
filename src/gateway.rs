//! HTTP transport to the venue gateway.
//!
//! Every endpoint answers with a `{code, msg, data}` envelope. A `code` other
//! than `"0"` is surfaced as [`Kind::Application`]; anything that prevents the
//! envelope from being read at all is [`Kind::Transport`].

use std::time::Duration;

use bon::Builder;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client as ReqwestClient, Method, Request};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::{Error, Kind};
use crate::market::{Coin, Exchange, Kline};
use crate::types::{KlineType, PriceType};
use crate::{APP_TOKEN, APP_TOKEN_HEADER, Result, TimestampMillis};

pub(crate) const ADDRESS_INFO_PATH: &str = "/api/v1/address/getAddressInfo";
pub(crate) const SEND_TRANSACTION_PATH: &str = "/api/v1/trade/sendTransaction";
const KLINE_PATH: &str = "/api/v1/trade/getKline";
const COIN_LIST_PATH: &str = "/api/v1/trade/getCoinList";
const EXCHANGE_LIST_PATH: &str = "/api/v1/trade/getExchangeList";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// How much of an unexpected HTML body is kept in the error message.
const BODY_PREVIEW_LEN: usize = 200;
const SUCCESS_CODE: &str = "0";
const NO_QUERY: &[(&str, &str)] = &[];

/// Outer envelope of every gateway response, before `code` is checked.
#[derive(Debug, Deserialize)]
struct GatewayResponse {
    code: Value,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Value,
}

impl GatewayResponse {
    fn code(&self) -> String {
        match &self.code {
            Value::String(code) => code.clone(),
            other => other.to_string(),
        }
    }
}

/// Query for [`Gateway::kline`].
#[non_exhaustive]
#[derive(Clone, Debug, Builder, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KlineRequest {
    #[builder(into)]
    pub exchange_id: String,
    pub kline_type: KlineType,
    pub price_type: PriceType,
    /// Page size; the gateway defaults to 100.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    /// Opaque cursor from a previous [`KlinePage::next_page_offset_data`].
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_begin_kline_time_inclusive: Option<TimestampMillis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_end_kline_time_exclusive: Option<TimestampMillis>,
}

#[non_exhaustive]
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KlinePage {
    pub kline_list: Vec<Kline>,
    /// Empty when there is no further page.
    pub next_page_offset_data: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CoinList {
    coin_list: Vec<Coin>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ExchangeList {
    exchange_list: Vec<Exchange>,
}

/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone, Debug)]
pub struct Gateway {
    host: Url,
    client: ReqwestClient,
}

impl Gateway {
    /// Creates a gateway client with its own connection pool and a 30s
    /// request timeout.
    pub fn new(host: Url) -> Result<Self> {
        let client = ReqwestClient::builder()
            .default_headers(default_headers())
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self { host, client })
    }

    /// Reuses a caller supplied client. The compatibility headers are still
    /// attached to every request.
    #[must_use]
    pub fn with_client(host: Url, client: ReqwestClient) -> Self {
        Self { host, client }
    }

    #[must_use]
    pub fn host(&self) -> &Url {
        &self.host
    }

    /// Appends `path` to the host, keeping any path prefix the host carries.
    fn endpoint(&self, path: &str) -> Url {
        let prefix = self.host.path().trim_end_matches('/');
        let mut url = self.host.clone();
        url.set_path(&format!("{prefix}/{}", path.trim_start_matches('/')));
        url
    }

    /// Issues a GET against `path` and returns the decoded `data` field.
    pub async fn get<Q, T>(&self, path: &str, query: &Q) -> Result<T>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .client
            .request(Method::GET, self.endpoint(path))
            .headers(default_headers())
            .query(query)
            .build()?;

        self.execute(request).await
    }

    /// Issues a JSON POST against `path` and returns the decoded `data` field.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_vec(body).map_err(|e| Error::with_source(Kind::Encoding, e))?;
        let request = self
            .client
            .request(Method::POST, self.endpoint(path))
            .headers(default_headers())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .build()?;

        self.execute(request).await
    }

    pub async fn kline(&self, request: &KlineRequest) -> Result<KlinePage> {
        self.get(KLINE_PATH, request).await
    }

    pub async fn coin_list(&self) -> Result<Vec<Coin>> {
        let list: CoinList = self.get(COIN_LIST_PATH, NO_QUERY).await?;
        Ok(list.coin_list)
    }

    pub async fn exchange_list(&self) -> Result<Vec<Exchange>> {
        let list: ExchangeList = self.get(EXCHANGE_LIST_PATH, NO_QUERY).await?;
        Ok(list.exchange_list)
    }

    async fn execute<T: DeserializeOwned>(&self, request: Request) -> Result<T> {
        let method = request.method().clone();
        let path = request.url().path().to_owned();

        #[cfg(feature = "tracing")]
        tracing::debug!(%method, %path, "gateway request");

        let response = self.client.execute(request).await?;
        let status_code = response.status();
        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("text/html"));
        let text = response.text().await?;

        if is_html || text.trim_start().starts_with('<') {
            let preview: String = text.chars().take(BODY_PREVIEW_LEN).collect();
            #[cfg(feature = "tracing")]
            tracing::warn!(%method, %path, %status_code, "gateway answered with html");
            return Err(Error::status(
                status_code,
                method,
                path,
                format!("unexpected html response: {preview}"),
            ));
        }

        if !status_code.is_success() {
            #[cfg(feature = "tracing")]
            tracing::warn!(%method, %path, %status_code, body = %text, "gateway request failed");
            return Err(Error::status(status_code, method, path, text));
        }

        let envelope: GatewayResponse = serde_json::from_str(&text)?;
        let code = envelope.code();
        if code != SUCCESS_CODE {
            #[cfg(feature = "tracing")]
            tracing::warn!(%method, %path, %code, msg = %envelope.msg, "gateway rejected request");
            return Err(Error::application(code, envelope.msg));
        }

        decode_data(envelope.data)
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(APP_TOKEN_HEADER, HeaderValue::from_static(APP_TOKEN));
    headers.insert(USER_AGENT, HeaderValue::from_static(crate::USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

#[cfg(feature = "tracing")]
fn decode_data<T: DeserializeOwned>(data: Value) -> Result<T> {
    let mut unknown = Vec::new();
    let mut record = |path: serde_ignored::Path<'_>| {
        unknown.push(path.to_string());
    };
    let deserializer = serde_ignored::Deserializer::new(data, &mut record);
    let decoded: T = serde_path_to_error::deserialize(deserializer).map_err(|e| {
        let path = e.path().to_string();
        tracing::warn!(%path, error = %e.inner(), "failed to decode gateway data");
        Error::with_source(Kind::Transport, e.into_inner())
    })?;

    if !unknown.is_empty() {
        tracing::trace!(fields = ?unknown, "gateway data carried unknown fields");
    }

    Ok(decoded)
}

#[cfg(not(feature = "tracing"))]
fn decode_data<T: DeserializeOwned>(data: Value) -> Result<T> {
    Ok(serde_json::from_value(data)?)
}
