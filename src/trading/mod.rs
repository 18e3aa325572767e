//! Transaction submission pipeline: order and agent instructions, signed
//! with the agent key and handed to the gateway exactly once.

mod client;
mod config;
pub mod messages;
mod policy;
mod types;

pub use client::{SubmitMode, TradingClient};
pub use config::{ClientConfig, RawClientConfig};
pub use messages::Instruction;
pub use policy::{AccountNumberPolicy, OrderingPolicy, SubmitPolicies};
pub use types::{
    CreateOrderBatchRequest, CreateOrderRequest, OrderParams, TpSlLeg, Trigger, to_scaled,
};
