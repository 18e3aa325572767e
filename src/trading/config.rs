use bech32::Hrp;
use secrecy::SecretString;
use url::Url;

use crate::error::Error;
use crate::trading::policy::SubmitPolicies;
use crate::types::ChainId;
use crate::{DEFAULT_ACCOUNT_HRP, Result, WEBSOCKET_PATH};

/// String form of the connection settings, as read from app-level config.
#[derive(Clone, Debug)]
pub struct RawClientConfig {
    pub gateway: String,
    /// Defaults to the gateway host with a websocket scheme.
    pub ws_url: Option<String>,
    pub chain_id: String,
    pub primary_key: SecretString,
    pub agent_key: SecretString,
    /// Defaults to [`DEFAULT_ACCOUNT_HRP`].
    pub account_hrp: Option<String>,
}

/// Validated client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub gateway: Url,
    pub ws_url: Option<Url>,
    pub chain_id: ChainId,
    pub primary_key: SecretString,
    pub agent_key: SecretString,
    pub account_hrp: String,
    pub policies: SubmitPolicies,
}

impl ClientConfig {
    pub fn from_raw(raw: RawClientConfig, policies: SubmitPolicies) -> Result<Self> {
        let gateway = Url::parse(raw.gateway.trim())?;
        let ws_url = raw
            .ws_url
            .as_deref()
            .map(|url| Url::parse(url.trim()))
            .transpose()?;
        let account_hrp = raw
            .account_hrp
            .unwrap_or_else(|| DEFAULT_ACCOUNT_HRP.to_owned());

        Self::new(
            gateway,
            ws_url,
            raw.chain_id,
            raw.primary_key,
            raw.agent_key,
            account_hrp,
            policies,
        )
    }

    pub fn new(
        gateway: Url,
        ws_url: Option<Url>,
        chain_id: ChainId,
        primary_key: SecretString,
        agent_key: SecretString,
        account_hrp: String,
        policies: SubmitPolicies,
    ) -> Result<Self> {
        if !matches!(gateway.scheme(), "http" | "https") {
            return Err(Error::validation(format!(
                "gateway url must be http or https, got {}",
                gateway.scheme()
            )));
        }
        if let Some(ws_url) = &ws_url
            && !matches!(ws_url.scheme(), "ws" | "wss")
        {
            return Err(Error::validation(format!(
                "websocket url must be ws or wss, got {}",
                ws_url.scheme()
            )));
        }
        if chain_id.trim().is_empty() {
            return Err(Error::validation("chain id can't be empty"));
        }
        Hrp::parse(&account_hrp).map_err(|e| {
            Error::validation(format!("invalid account prefix `{account_hrp}`: {e}"))
        })?;

        policies.validate()?;

        Ok(Self {
            gateway,
            ws_url,
            chain_id,
            primary_key,
            agent_key,
            account_hrp,
            policies,
        })
    }

    /// Realtime endpoint: the configured one, or the gateway host with
    /// `http`→`ws` / `https`→`wss` and the websocket path.
    pub fn websocket_url(&self) -> Result<Url> {
        if let Some(url) = &self.ws_url {
            return Ok(url.clone());
        }

        let scheme = if self.gateway.scheme() == "https" {
            "wss"
        } else {
            "ws"
        };
        let host = self
            .gateway
            .host_str()
            .ok_or_else(|| Error::validation("gateway url has no host"))?;
        let authority = match self.gateway.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_owned(),
        };

        Ok(Url::parse(&format!("{scheme}://{authority}{WEBSOCKET_PATH}"))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(gateway: &str) -> RawClientConfig {
        RawClientConfig {
            gateway: gateway.to_owned(),
            ws_url: None,
            chain_id: "antx-testnet".to_owned(),
            primary_key: SecretString::from("00"),
            agent_key: SecretString::from("00"),
            account_hrp: None,
        }
    }

    #[test]
    fn websocket_url_follows_gateway_scheme() {
        let config = ClientConfig::from_raw(raw("https://api.antx.exchange"), SubmitPolicies::default())
            .expect("valid config");

        assert_eq!(
            config.websocket_url().expect("ws url").as_str(),
            "wss://api.antx.exchange/api/v1/ws"
        );
        assert_eq!(config.account_hrp, DEFAULT_ACCOUNT_HRP);
    }

    #[test]
    fn websocket_url_keeps_port() {
        let config = ClientConfig::from_raw(raw("http://127.0.0.1:8080"), SubmitPolicies::default())
            .expect("valid config");

        assert_eq!(
            config.websocket_url().expect("ws url").as_str(),
            "ws://127.0.0.1:8080/api/v1/ws"
        );
    }

    #[test]
    fn empty_chain_id_is_rejected() {
        let mut raw = raw("https://api.antx.exchange");
        raw.chain_id = String::new();

        let err = ClientConfig::from_raw(raw, SubmitPolicies::default()).unwrap_err();

        assert_eq!(err.kind(), crate::error::Kind::Validation);
    }
}
