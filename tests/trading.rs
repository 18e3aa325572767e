#![allow(clippy::unwrap_used, reason = "Do not need additional syntax for setting up tests")]

use std::time::{Duration, Instant};

use antx_client_sdk::error::{Application, Kind, MissingHandle};
use antx_client_sdk::signer::AgentKey;
use antx_client_sdk::trading::messages::{Instruction as _, MsgCancelOrder};
use antx_client_sdk::trading::{
    AccountNumberPolicy, ClientConfig, CreateOrderRequest, OrderParams, OrderingPolicy,
    RawClientConfig, SubmitMode, SubmitPolicies, TradingClient,
};
use antx_client_sdk::tx::proto::{TxBody, TxRaw};
use antx_client_sdk::tx::verify_signed_by;
use chrono::{DateTime, Utc};
use httpmock::Method::{GET, POST};
use httpmock::{Mock, MockServer};
use prost::Message as _;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use serde_json::json;

const ADDRESS_INFO_PATH: &str = "/api/v1/address/getAddressInfo";
const SEND_TRANSACTION_PATH: &str = "/api/v1/trade/sendTransaction";

const CHAIN_ID: &str = "antx-testnet";
const PRIMARY_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const AGENT_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

fn agent_address() -> String {
    AgentKey::from_hex(AGENT_KEY, "antx").unwrap().address().to_owned()
}

fn config(server: &MockServer, policies: SubmitPolicies) -> anyhow::Result<ClientConfig> {
    let raw = RawClientConfig {
        gateway: server.base_url(),
        ws_url: None,
        chain_id: CHAIN_ID.to_owned(),
        primary_key: SecretString::from(PRIMARY_KEY),
        agent_key: SecretString::from(AGENT_KEY),
        account_hrp: None,
    };
    Ok(ClientConfig::from_raw(raw, policies)?)
}

async fn fixed_client(server: &MockServer) -> anyhow::Result<TradingClient> {
    let policies = SubmitPolicies::default().with_account_number(AccountNumberPolicy::Fixed(42));
    Ok(TradingClient::bootstrap(config(server, policies)?).await?)
}

fn mock_address_info<'a>(server: &'a MockServer, account_number: &str, sequence: &str) -> Mock<'a> {
    let address = agent_address();
    let account_number = account_number.to_owned();
    let sequence = sequence.to_owned();
    server.mock(|when, then| {
        when.method(GET)
            .path(ADDRESS_INFO_PATH)
            .query_param("address", address);
        then.status(200).json_body(json!({
            "code": "0",
            "msg": "",
            "data": { "exist": true, "accountNumber": account_number, "sequence": sequence }
        }));
    })
}

fn mock_send<'a>(server: &'a MockServer, body: serde_json::Value) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(POST)
            .path(SEND_TRANSACTION_PATH)
            .header("content-type", "application/json");
        then.status(200).json_body(body);
    })
}

const SEND_DELAY: Duration = Duration::from_millis(400);
const VALIDITY: Duration = Duration::from_secs(86_400);

async fn client_with_ordering(
    server: &MockServer,
    ordering: OrderingPolicy,
) -> anyhow::Result<TradingClient> {
    let policies = SubmitPolicies::default()
        .with_account_number(AccountNumberPolicy::Fixed(42))
        .with_ordering(ordering);
    Ok(TradingClient::bootstrap(config(server, policies)?).await?)
}

fn mock_slow_send(server: &MockServer) -> Mock<'_> {
    server.mock(|when, then| {
        when.method(POST).path(SEND_TRANSACTION_PATH);
        then.status(200)
            .delay(SEND_DELAY)
            .json_body(json!({ "code": "0", "msg": "", "data": { "txHash": "BIND" } }));
    })
}

/// Runs two binds at once and reports how many sequence reads had happened
/// while the first send was still in flight, plus the total time taken.
async fn concurrent_binds(client: &TradingClient, info: &Mock<'_>) -> (usize, Duration) {
    let started = Instant::now();
    let (first, second, reads_mid_send) = tokio::join!(
        client.bind_agent(VALIDITY),
        client.bind_agent(VALIDITY),
        async {
            tokio::time::sleep(SEND_DELAY / 2).await;
            info.hits_async().await
        },
    );
    first.unwrap();
    second.unwrap();
    (reads_mid_send, started.elapsed())
}

fn cancel(agent: &str) -> prost_types::Any {
    MsgCancelOrder {
        agent_address: agent.to_owned(),
        subaccount_id: 1,
        order_id: vec![11, 12],
    }
    .to_any()
}

fn buy_request() -> CreateOrderRequest {
    CreateOrderRequest::builder()
        .subaccount_id(1)
        .exchange_id(200_001)
        .order(
            OrderParams::builder()
                .is_buy(true)
                .price(dec!(65000.5))
                .size(dec!(0.01))
                .client_order_id("order-1")
                .build(),
        )
        .build()
}

#[tokio::test]
async fn bootstrap_caches_fetched_account_number() -> anyhow::Result<()> {
    let server = MockServer::start();
    let info = mock_address_info(&server, "42", "7");

    let client = TradingClient::bootstrap(config(&server, SubmitPolicies::default())?).await?;

    info.assert();
    assert_eq!(client.account_number(), 42);
    assert_eq!(client.agent_address(), agent_address());
    Ok(())
}

#[tokio::test]
async fn ordered_envelope_carries_fetched_sequence() -> anyhow::Result<()> {
    let server = MockServer::start();
    let info = mock_address_info(&server, "42", "7");
    let client = TradingClient::bootstrap(config(&server, SubmitPolicies::default())?).await?;

    let signed = client
        .sign(vec![cancel(client.agent_address())], SubmitMode::Ordered, Utc::now())
        .await?;

    info.assert_hits(2);
    let verified = verify_signed_by(&signed.to_bytes(), CHAIN_ID, 42, client.agent_address())?;
    assert_eq!(verified.signers[0].sequence, 7);
    assert_eq!(verified.signers[0].address, client.agent_address());
    assert!(!verified.unordered, "ordered envelope must not be unordered");
    Ok(())
}

#[tokio::test]
async fn unordered_envelope_expires_after_window() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = fixed_client(&server).await?;
    let now = DateTime::from_timestamp_millis(1_717_000_000_123).unwrap();

    let signed = client
        .sign(vec![cancel(client.agent_address())], SubmitMode::Unordered, now)
        .await?;

    let raw = TxRaw::decode(signed.to_bytes().as_slice())?;
    let body = TxBody::decode(raw.body_bytes.as_slice())?;
    let expiry = body.timeout_timestamp.unwrap();
    let expiry_ms = expiry.seconds * 1000 + i64::from(expiry.nanos) / 1_000_000;
    assert!(body.unordered, "unordered flag must be set");
    assert_eq!(expiry_ms, 1_717_000_010_123);

    let verified = verify_signed_by(&signed.to_bytes(), CHAIN_ID, 42, client.agent_address())?;
    assert_eq!(verified.signers[0].sequence, 0);
    Ok(())
}

#[tokio::test]
async fn create_order_returns_tx_hash() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = fixed_client(&server).await?;
    let send = mock_send(
        &server,
        json!({ "code": "0", "msg": "", "data": { "txHash": "A1B2C3" } }),
    );

    let handle = client.create_order(&buy_request()).await?;

    send.assert();
    assert_eq!(handle.as_str(), "A1B2C3");
    Ok(())
}

#[tokio::test]
async fn create_order_never_fetches_sequence() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = fixed_client(&server).await?;
    let info = mock_address_info(&server, "42", "7");
    let send = mock_send(
        &server,
        json!({ "code": "0", "msg": "", "data": { "txHash": "A1B2C3" } }),
    );

    client.create_order(&buy_request()).await?;

    send.assert();
    info.assert_hits(0);
    Ok(())
}

#[tokio::test]
async fn rejected_submission_is_application_error() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = fixed_client(&server).await?;
    let send = mock_send(
        &server,
        json!({ "code": "1", "msg": "insufficient balance" }),
    );

    let err = client.create_order(&buy_request()).await.unwrap_err();

    send.assert();
    assert_eq!(err.kind(), Kind::Application);
    let app = err.downcast_ref::<Application>().unwrap();
    assert_eq!(app.code, "1");
    assert_eq!(app.message, "insufficient balance");
    Ok(())
}

#[tokio::test]
async fn handle_falls_back_to_later_aliases() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = fixed_client(&server).await?;
    let send = mock_send(
        &server,
        json!({ "code": "0", "msg": "", "data": { "hash": "", "txId": "TX-9" } }),
    );

    let handle = client.cancel_order(1, &[11]).await?;

    send.assert();
    assert_eq!(handle.as_str(), "TX-9");
    Ok(())
}

#[tokio::test]
async fn answer_without_handle_is_reported() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = fixed_client(&server).await?;
    let send = mock_send(&server, json!({ "code": "0", "msg": "", "data": {} }));

    let err = client.cancel_all_orders(1, &[200_001]).await.unwrap_err();

    send.assert();
    assert_eq!(err.kind(), Kind::Transport);
    let missing = err.downcast_ref::<MissingHandle>().unwrap();
    assert_eq!(missing.checked, ["txHash", "hash", "txId"]);
    Ok(())
}

#[tokio::test]
async fn bind_agent_reads_sequence_first() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = fixed_client(&server).await?;
    let info = mock_address_info(&server, "42", "3");
    let send = mock_send(
        &server,
        json!({ "code": "0", "msg": "", "data": { "txHash": "BIND" } }),
    );

    let handle = client.bind_agent(Duration::from_secs(86_400)).await?;

    info.assert();
    send.assert();
    assert_eq!(handle.as_str(), "BIND");
    Ok(())
}

#[tokio::test]
async fn failed_sequence_fetch_is_build_error() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = fixed_client(&server).await?;
    let info = server.mock(|when, then| {
        when.method(GET).path(ADDRESS_INFO_PATH);
        then.status(502).body("bad gateway");
    });

    let err = client
        .submit(cancel(client.agent_address()), SubmitMode::Ordered)
        .await
        .unwrap_err();

    info.assert();
    assert_eq!(err.kind(), Kind::Build);
    Ok(())
}

#[tokio::test]
async fn unknown_agent_fails_bootstrap() -> anyhow::Result<()> {
    let server = MockServer::start();
    let info = server.mock(|when, then| {
        when.method(GET).path(ADDRESS_INFO_PATH);
        then.status(200).json_body(json!({
            "code": "0",
            "msg": "",
            "data": { "exist": false, "accountNumber": "", "sequence": "" }
        }));
    });

    let err = TradingClient::bootstrap(config(&server, SubmitPolicies::default())?)
        .await
        .unwrap_err();

    info.assert();
    assert_eq!(err.kind(), Kind::AccountNotFound);
    Ok(())
}

#[tokio::test]
async fn invalid_order_never_reaches_gateway() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = fixed_client(&server).await?;
    let send = mock_send(
        &server,
        json!({ "code": "0", "msg": "", "data": { "txHash": "X" } }),
    );
    let request = CreateOrderRequest::builder()
        .subaccount_id(1)
        .exchange_id(200_001)
        .order(OrderParams::builder().is_buy(false).price(dec!(1)).size(dec!(0)).build())
        .build();

    let err = client.create_order(&request).await.unwrap_err();

    send.assert_hits(0);
    assert_eq!(err.kind(), Kind::Validation);
    Ok(())
}

#[tokio::test]
async fn serialized_binds_read_sequence_after_previous_send() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = client_with_ordering(&server, OrderingPolicy::Serialized).await?;
    let info = mock_address_info(&server, "42", "3");
    let send = mock_slow_send(&server);

    let (reads_mid_send, elapsed) = concurrent_binds(&client, &info).await;

    assert_eq!(reads_mid_send, 1, "second read must wait for the first send");
    assert!(elapsed >= SEND_DELAY * 2, "sends overlapped: {elapsed:?}");
    info.assert_hits(2);
    send.assert_hits(2);
    Ok(())
}

#[tokio::test]
async fn concurrent_binds_read_sequence_without_waiting() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = client_with_ordering(&server, OrderingPolicy::Concurrent).await?;
    let info = mock_address_info(&server, "42", "3");
    let send = mock_slow_send(&server);

    let (reads_mid_send, elapsed) = concurrent_binds(&client, &info).await;

    assert_eq!(reads_mid_send, 2, "both reads happen before any send completes");
    assert!(elapsed < SEND_DELAY * 2, "sends were serialized: {elapsed:?}");
    info.assert_hits(2);
    send.assert_hits(2);
    Ok(())
}
