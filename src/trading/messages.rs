//! Ledger instructions understood by the venue, as protobuf messages.
//!
//! Prices and sizes travel as `(scale, value)` integer pairs meaning
//! `value * 10^-scale`.

use prost_types::Any;

/// A message that can be wrapped in a transaction envelope.
pub trait Instruction: prost::Message + Sized {
    const TYPE_URL: &'static str;

    /// Whether the venue expects this instruction in ordered mode.
    const ORDERED: bool = false;

    fn to_any(&self) -> Any {
        Any {
            type_url: Self::TYPE_URL.to_owned(),
            value: self.encode_to_vec(),
        }
    }
}

/// Take-profit or stop-loss leg attached to an opening order.
#[derive(Clone, PartialEq, prost::Message)]
pub struct OpenTpSlParam {
    #[prost(int32, tag = "1")]
    pub price_scale: i32,
    #[prost(uint64, tag = "2")]
    pub price_value: u64,
    #[prost(int32, tag = "3")]
    pub size_scale: i32,
    #[prost(uint64, tag = "4")]
    pub size_value: u64,
    #[prost(string, tag = "5")]
    pub client_order_id: String,
    #[prost(int32, tag = "6")]
    pub trigger_price_type: i32,
    #[prost(uint64, tag = "7")]
    pub trigger_price_value: u64,
    #[prost(uint64, tag = "8")]
    pub expire_time: u64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct MsgCreateOrder {
    #[prost(string, tag = "1")]
    pub agent_address: String,
    #[prost(uint64, tag = "2")]
    pub subaccount_id: u64,
    #[prost(uint64, tag = "3")]
    pub exchange_id: u64,
    #[prost(int32, tag = "4")]
    pub margin_mode: i32,
    #[prost(uint32, tag = "5")]
    pub leverage: u32,
    #[prost(bool, tag = "6")]
    pub is_buy: bool,
    #[prost(int32, tag = "7")]
    pub price_scale: i32,
    #[prost(uint64, tag = "8")]
    pub price_value: u64,
    #[prost(int32, tag = "9")]
    pub size_scale: i32,
    #[prost(uint64, tag = "10")]
    pub size_value: u64,
    #[prost(string, tag = "11")]
    pub client_order_id: String,
    #[prost(int32, tag = "12")]
    pub time_in_force: i32,
    #[prost(bool, tag = "13")]
    pub reduce_only: bool,
    #[prost(uint64, tag = "14")]
    pub expire_time: u64,
    #[prost(bool, tag = "15")]
    pub is_market: bool,
    #[prost(bool, tag = "16")]
    pub is_position_tp: bool,
    #[prost(bool, tag = "17")]
    pub is_position_sl: bool,
    #[prost(int32, tag = "18")]
    pub trigger_type: i32,
    #[prost(int32, tag = "19")]
    pub trigger_price_type: i32,
    #[prost(uint64, tag = "20")]
    pub trigger_price_value: u64,
    #[prost(bool, tag = "21")]
    pub is_set_open_tp: bool,
    #[prost(message, optional, tag = "22")]
    pub open_tp_param: Option<OpenTpSlParam>,
    #[prost(bool, tag = "23")]
    pub is_set_open_sl: bool,
    #[prost(message, optional, tag = "24")]
    pub open_sl_param: Option<OpenTpSlParam>,
}

impl Instruction for MsgCreateOrder {
    const TYPE_URL: &'static str = "/antx.chain.order.MsgCreateOrder";
}

/// Per-order part of [`MsgCreateOrderBatch`].
#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateOrderParam {
    #[prost(bool, tag = "1")]
    pub is_buy: bool,
    #[prost(int32, tag = "2")]
    pub price_scale: i32,
    #[prost(uint64, tag = "3")]
    pub price_value: u64,
    #[prost(int32, tag = "4")]
    pub size_scale: i32,
    #[prost(uint64, tag = "5")]
    pub size_value: u64,
    #[prost(string, tag = "6")]
    pub client_order_id: String,
    #[prost(int32, tag = "7")]
    pub time_in_force: i32,
    #[prost(bool, tag = "8")]
    pub reduce_only: bool,
    #[prost(uint64, tag = "9")]
    pub expire_time: u64,
    #[prost(bool, tag = "10")]
    pub is_market: bool,
    #[prost(bool, tag = "11")]
    pub is_position_tp: bool,
    #[prost(bool, tag = "12")]
    pub is_position_sl: bool,
    #[prost(int32, tag = "13")]
    pub trigger_type: i32,
    #[prost(int32, tag = "14")]
    pub trigger_price_type: i32,
    #[prost(uint64, tag = "15")]
    pub trigger_price_value: u64,
    #[prost(bool, tag = "16")]
    pub is_set_open_tp: bool,
    #[prost(message, optional, tag = "17")]
    pub open_tp_param: Option<OpenTpSlParam>,
    #[prost(bool, tag = "18")]
    pub is_set_open_sl: bool,
    #[prost(message, optional, tag = "19")]
    pub open_sl_param: Option<OpenTpSlParam>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct MsgCreateOrderBatch {
    #[prost(string, tag = "1")]
    pub agent_address: String,
    #[prost(uint64, tag = "2")]
    pub subaccount_id: u64,
    #[prost(uint64, tag = "3")]
    pub exchange_id: u64,
    #[prost(int32, tag = "4")]
    pub margin_mode: i32,
    #[prost(uint32, tag = "5")]
    pub leverage: u32,
    #[prost(message, repeated, tag = "6")]
    pub create_order_param: Vec<CreateOrderParam>,
}

impl Instruction for MsgCreateOrderBatch {
    const TYPE_URL: &'static str = "/antx.chain.order.MsgCreateOrderBatch";
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct MsgCancelOrder {
    #[prost(string, tag = "1")]
    pub agent_address: String,
    #[prost(uint64, tag = "2")]
    pub subaccount_id: u64,
    #[prost(uint64, repeated, tag = "3")]
    pub order_id: Vec<u64>,
}

impl Instruction for MsgCancelOrder {
    const TYPE_URL: &'static str = "/antx.chain.order.MsgCancelOrder";
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct MsgCancelOrderByClientId {
    #[prost(string, tag = "1")]
    pub agent_address: String,
    #[prost(uint64, tag = "2")]
    pub subaccount_id: u64,
    #[prost(string, repeated, tag = "3")]
    pub client_order_id: Vec<String>,
}

impl Instruction for MsgCancelOrderByClientId {
    const TYPE_URL: &'static str = "/antx.chain.order.MsgCancelOrderByClientId";
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct MsgCancelAllOrder {
    #[prost(string, tag = "1")]
    pub agent_address: String,
    #[prost(uint64, tag = "2")]
    pub subaccount_id: u64,
    /// Empty means every exchange.
    #[prost(uint64, repeated, tag = "3")]
    pub filter_exchange_id: Vec<u64>,
}

impl Instruction for MsgCancelAllOrder {
    const TYPE_URL: &'static str = "/antx.chain.order.MsgCancelAllOrder";
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct MsgCloseAllPosition {
    #[prost(string, tag = "1")]
    pub agent_address: String,
    #[prost(uint64, tag = "2")]
    pub subaccount_id: u64,
    /// Empty means every exchange.
    #[prost(uint64, repeated, tag = "3")]
    pub filter_exchange_id: Vec<u64>,
}

impl Instruction for MsgCloseAllPosition {
    const TYPE_URL: &'static str = "/antx.chain.order.MsgCloseAllPosition";
}

/// `antx.chain.agent.ChainType.CHAIN_TYPE_EVM`.
pub const CHAIN_TYPE_EVM: i32 = 1;

/// Authorizes an agent address to trade for a primary (EVM) address.
#[derive(Clone, PartialEq, prost::Message)]
pub struct MsgBindAgent {
    #[prost(string, tag = "1")]
    pub agent_address: String,
    #[prost(int32, tag = "2")]
    pub chain_type: i32,
    #[prost(string, tag = "3")]
    pub chain_address: String,
    #[prost(uint64, tag = "4")]
    pub create_time: u64,
    #[prost(uint64, tag = "5")]
    pub expire_time: u64,
    /// `0x`-prefixed personal signature over the bind-agent proof.
    #[prost(string, tag = "6")]
    pub chain_signature: String,
}

impl Instruction for MsgBindAgent {
    const TYPE_URL: &'static str = "/antx.chain.agent.MsgBindAgent";
    const ORDERED: bool = true;
}

#[cfg(test)]
mod tests {
    use prost::Message as _;

    use super::*;

    #[test]
    fn order_instructions_share_prefix() {
        for url in [
            MsgCreateOrder::TYPE_URL,
            MsgCreateOrderBatch::TYPE_URL,
            MsgCancelOrder::TYPE_URL,
            MsgCancelOrderByClientId::TYPE_URL,
            MsgCancelAllOrder::TYPE_URL,
            MsgCloseAllPosition::TYPE_URL,
        ] {
            assert!(url.starts_with("/antx.chain.order."), "{url}");
        }
        assert!(MsgBindAgent::ORDERED, "bind agent is ordered");
        assert!(!MsgCreateOrder::ORDERED, "orders are unordered");
    }

    #[test]
    fn any_carries_encoded_message() {
        let msg = MsgCancelOrder {
            agent_address: "antx1agent".to_owned(),
            subaccount_id: 5,
            order_id: vec![11, 12],
        };

        let any = msg.to_any();

        assert_eq!(any.type_url, "/antx.chain.order.MsgCancelOrder");
        assert_eq!(
            MsgCancelOrder::decode(any.value.as_slice()).expect("decodable"),
            msg
        );
    }
}
