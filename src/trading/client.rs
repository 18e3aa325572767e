use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use prost_types::Any;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::Result;
use crate::account::{AccountState, fetch_account_state};
use crate::error::{Error, Kind, MissingHandle};
use crate::gateway::{Gateway, SEND_TRANSACTION_PATH};
use crate::signer::Identity;
use crate::trading::messages::{
    CHAIN_TYPE_EVM, Instruction, MsgBindAgent, MsgCancelAllOrder, MsgCancelOrder,
    MsgCancelOrderByClientId, MsgCloseAllPosition, MsgCreateOrderBatch,
};
use crate::trading::{
    AccountNumberPolicy, ClientConfig, CreateOrderBatchRequest, CreateOrderRequest,
    OrderParams, OrderingPolicy, SubmitPolicies,
};
use crate::tx::{Envelope, Sequencing, SignedEnvelope};
use crate::types::{Address, ChainId, TxHandle};

/// Handle fields of a `sendTransaction` answer, in priority order.
const HANDLE_FIELDS: &[&str] = &["txHash", "hash", "txId"];

/// How an envelope is protected against replay.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitMode {
    /// Signed with the current ledger sequence, fetched right before signing.
    Ordered,
    /// Signed with sequence `0` and an expiry `unordered_window` from now.
    Unordered,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendTransactionRequest<'a> {
    type_url: &'a str,
    raw_tx: String,
    account_number: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SendTransactionData {
    tx_hash: Option<String>,
    hash: Option<String>,
    tx_id: Option<String>,
}

impl SendTransactionData {
    fn into_handle(self) -> Option<TxHandle> {
        [self.tx_hash, self.hash, self.tx_id]
            .into_iter()
            .flatten()
            .find(|value| !value.is_empty())
            .map(TxHandle::new)
    }
}

/// Signs and submits ledger transactions for one trading identity.
///
/// Cloning is cheap; clones share the gateway connection pool and the
/// ordering lock.
#[derive(Clone, Debug)]
pub struct TradingClient {
    gateway: Gateway,
    chain_id: ChainId,
    identity: Arc<Identity>,
    account_number: u64,
    policies: SubmitPolicies,
    ordering: Arc<Mutex<()>>,
}

impl TradingClient {
    /// Imports both keys and resolves the account number of the agent
    /// address according to [`SubmitPolicies::account_number`].
    pub async fn bootstrap(config: ClientConfig) -> Result<Self> {
        let gateway = Gateway::new(config.gateway.clone())?;
        Self::bootstrap_with_gateway(config, gateway).await
    }

    /// Same as [`Self::bootstrap`] with a caller supplied HTTP client.
    pub async fn bootstrap_with_client(config: ClientConfig, client: ReqwestClient) -> Result<Self> {
        let gateway = Gateway::with_client(config.gateway.clone(), client);
        Self::bootstrap_with_gateway(config, gateway).await
    }

    async fn bootstrap_with_gateway(config: ClientConfig, gateway: Gateway) -> Result<Self> {
        let identity = Identity::new(&config.primary_key, &config.agent_key, &config.account_hrp)?;

        let account_number = match config.policies.account_number {
            AccountNumberPolicy::Fixed(account_number) => account_number,
            AccountNumberPolicy::FetchAndCache => {
                fetch_account_state(&gateway, identity.agent_address())
                    .await?
                    .account_number
            }
        };

        #[cfg(feature = "tracing")]
        tracing::info!(
            agent = %identity.agent_address(),
            primary = %identity.primary_address(),
            account_number,
            chain_id = %config.chain_id,
            "trading client ready"
        );

        Ok(Self {
            gateway,
            chain_id: config.chain_id,
            identity: Arc::new(identity),
            account_number,
            policies: config.policies,
            ordering: Arc::new(Mutex::new(())),
        })
    }

    #[must_use]
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    #[must_use]
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Ledger (bech32) address of the agent key; signs every transaction.
    #[must_use]
    pub fn agent_address(&self) -> &str {
        self.identity.agent_address()
    }

    #[must_use]
    pub fn primary_address(&self) -> Address {
        self.identity.primary_address()
    }

    /// Account number cached at bootstrap.
    #[must_use]
    pub fn account_number(&self) -> u64 {
        self.account_number
    }

    #[must_use]
    pub fn policies(&self) -> SubmitPolicies {
        self.policies
    }

    /// Fresh account counters of the agent address.
    pub async fn account_state(&self) -> Result<AccountState> {
        fetch_account_state(&self.gateway, self.agent_address()).await
    }

    /// Places one order.
    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<TxHandle> {
        let msg = request.to_message(self.agent_address())?;
        self.submit_instruction(&msg).await
    }

    /// Places several orders in a single transaction.
    pub async fn create_order_batch(&self, request: &CreateOrderBatchRequest) -> Result<TxHandle> {
        if request.orders.is_empty() {
            return Err(Error::validation("order batch can't be empty"));
        }
        let msg = MsgCreateOrderBatch {
            agent_address: self.agent_address().to_owned(),
            subaccount_id: request.subaccount_id,
            exchange_id: request.exchange_id,
            margin_mode: request.margin_mode as i32,
            leverage: request.leverage,
            create_order_param: request
                .orders
                .iter()
                .map(OrderParams::to_param)
                .collect::<Result<_>>()?,
        };
        self.submit_instruction(&msg).await
    }

    pub async fn cancel_order(&self, subaccount_id: u64, order_ids: &[u64]) -> Result<TxHandle> {
        if order_ids.is_empty() {
            return Err(Error::validation("no order ids to cancel"));
        }
        let msg = MsgCancelOrder {
            agent_address: self.agent_address().to_owned(),
            subaccount_id,
            order_id: order_ids.to_vec(),
        };
        self.submit_instruction(&msg).await
    }

    pub async fn cancel_order_by_client_id<S: AsRef<str>>(
        &self,
        subaccount_id: u64,
        client_order_ids: &[S],
    ) -> Result<TxHandle> {
        if client_order_ids.is_empty() {
            return Err(Error::validation("no client order ids to cancel"));
        }
        let msg = MsgCancelOrderByClientId {
            agent_address: self.agent_address().to_owned(),
            subaccount_id,
            client_order_id: client_order_ids
                .iter()
                .map(|id| id.as_ref().to_owned())
                .collect(),
        };
        self.submit_instruction(&msg).await
    }

    /// Cancels every open order, optionally only on `exchange_ids`.
    pub async fn cancel_all_orders(&self, subaccount_id: u64, exchange_ids: &[u64]) -> Result<TxHandle> {
        let msg = MsgCancelAllOrder {
            agent_address: self.agent_address().to_owned(),
            subaccount_id,
            filter_exchange_id: exchange_ids.to_vec(),
        };
        self.submit_instruction(&msg).await
    }

    /// Closes every position, optionally only on `exchange_ids`.
    pub async fn close_all_positions(
        &self,
        subaccount_id: u64,
        exchange_ids: &[u64],
    ) -> Result<TxHandle> {
        let msg = MsgCloseAllPosition {
            agent_address: self.agent_address().to_owned(),
            subaccount_id,
            filter_exchange_id: exchange_ids.to_vec(),
        };
        self.submit_instruction(&msg).await
    }

    /// Authorizes the agent key to trade for the primary key for `valid_for`.
    pub async fn bind_agent(&self, valid_for: Duration) -> Result<TxHandle> {
        let msg = self.bind_agent_message(Utc::now(), valid_for)?;
        self.submit_instruction(&msg).await
    }

    pub(crate) fn bind_agent_message(
        &self,
        now: DateTime<Utc>,
        valid_for: Duration,
    ) -> Result<MsgBindAgent> {
        let valid_for = TimeDelta::from_std(valid_for)
            .map_err(|e| Error::validation(format!("agent validity out of range: {e}")))?;
        let expires_at = now
            .checked_add_signed(valid_for)
            .ok_or_else(|| Error::validation("agent validity out of range"))?;
        let create_time = u64::try_from(now.timestamp_millis())
            .map_err(|e| Error::validation(format!("clock before epoch: {e}")))?;
        let expire_time = u64::try_from(expires_at.timestamp_millis())
            .map_err(|e| Error::validation(format!("clock before epoch: {e}")))?;

        let proof = bind_agent_proof(self.agent_address(), create_time, expire_time, &self.chain_id);
        let chain_signature = self.identity.sign_personal_message(&proof)?;

        Ok(MsgBindAgent {
            agent_address: self.agent_address().to_owned(),
            chain_type: CHAIN_TYPE_EVM,
            chain_address: self.primary_address().to_checksum(None),
            create_time,
            expire_time,
            chain_signature,
        })
    }

    async fn submit_instruction<I: Instruction>(&self, instruction: &I) -> Result<TxHandle> {
        let mode = if I::ORDERED {
            SubmitMode::Ordered
        } else {
            SubmitMode::Unordered
        };
        self.submit(instruction.to_any(), mode).await
    }

    /// Builds, signs and submits one envelope carrying `instruction`.
    ///
    /// Nothing is retried. A failed ordered submission must be started over
    /// so the sequence is read again.
    pub async fn submit(&self, instruction: Any, mode: SubmitMode) -> Result<TxHandle> {
        let _guard = match (mode, self.policies.ordering) {
            (SubmitMode::Ordered, OrderingPolicy::Serialized) => Some(self.ordering.lock().await),
            _ => None,
        };

        let type_url = instruction.type_url.clone();
        let signed = self.sign(vec![instruction], mode, Utc::now()).await?;
        self.send(&type_url, &signed).await
    }

    /// Builds and signs an envelope without submitting it.
    ///
    /// In ordered mode the sequence is fetched from the gateway; `now` only
    /// matters in unordered mode.
    ///
    /// This does not take the ordering lock that [`submit`](Self::submit)
    /// holds under [`OrderingPolicy::Serialized`]. Callers that pair `sign`
    /// with their own submission of ordered envelopes must serialize those
    /// pairs themselves, or two envelopes may carry the same sequence.
    pub async fn sign(
        &self,
        instructions: Vec<Any>,
        mode: SubmitMode,
        now: DateTime<Utc>,
    ) -> Result<SignedEnvelope> {
        let sequencing = match mode {
            SubmitMode::Ordered => {
                let state = self
                    .account_state()
                    .await
                    .map_err(|e| e.into_kind(Kind::Build))?;
                Sequencing::Ordered {
                    sequence: state.sequence,
                }
            }
            SubmitMode::Unordered => Sequencing::unordered_at(now, self.policies.unordered_window)?,
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(?sequencing, account_number = self.account_number, "signing envelope");

        let agent = self.identity.agent();
        Envelope::new(instructions, sequencing, agent.public_key(), self.policies.gas_limit)?
            .sign(&self.chain_id, self.account_number, agent)
    }

    /// Submits an already signed envelope.
    pub async fn send(&self, type_url: &str, signed: &SignedEnvelope) -> Result<TxHandle> {
        let body = SendTransactionRequest {
            type_url,
            raw_tx: signed.to_base64(),
            account_number: self.account_number,
        };

        let data: Option<SendTransactionData> =
            self.gateway.post(SEND_TRANSACTION_PATH, &body).await?;
        let handle = data
            .and_then(SendTransactionData::into_handle)
            .ok_or(MissingHandle {
                checked: HANDLE_FIELDS,
            })?;

        #[cfg(feature = "tracing")]
        tracing::info!(%type_url, tx = %handle, "transaction accepted");

        Ok(handle)
    }
}

/// Text the primary key signs to authorize an agent. Times are in ms.
fn bind_agent_proof(agent_address: &str, create_time: u64, expire_time: u64, chain_id: &str) -> String {
    format!(
        "Action:BindAgent\nAgentAddress:{agent_address}\nCreateTime:{create_time}\nExpireTime:{expire_time}\nChainId:{chain_id}"
    )
}
