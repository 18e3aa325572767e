use bon::Builder;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive as _;

use crate::Result;
use crate::error::Error;
use crate::trading::messages::{CreateOrderParam, MsgCreateOrder, OpenTpSlParam};
use crate::types::{Decimal, MarginMode, PriceType, TimeInForce};

/// Splits a non-negative decimal into the `(scale, value)` pair the ledger
/// uses, keeping the caller's scale: `1000.00` becomes `(2, 100000)`.
pub fn to_scaled(field: &str, value: Decimal) -> Result<(i32, u64)> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(Error::validation(format!("{field} cannot be negative: {value}")));
    }
    let scale = i32::try_from(value.scale())
        .map_err(|e| Error::validation(format!("{field} scale out of range: {e}")))?;
    let mantissa = value
        .mantissa()
        .to_u64()
        .ok_or_else(|| Error::validation(format!("{field} {value} does not fit the ledger range")))?;
    Ok((scale, mantissa))
}

/// Scales a price and its trigger price to one shared scale, since the ledger
/// reads the trigger value at the price's scale. The shared scale is the
/// price's own scale, widened when the trigger carries more decimals.
fn to_scaled_pair(
    field: &str,
    price: Decimal,
    trigger_field: &str,
    trigger_price: Decimal,
) -> Result<(i32, u64, u64)> {
    let scale = price.scale().max(trigger_price.normalize().scale());
    let (price_scale, price_value) = to_scaled(field, at_scale(price, scale))?;
    let (_, trigger_value) = to_scaled(trigger_field, at_scale(trigger_price, scale))?;
    Ok((price_scale, price_value, trigger_value))
}

/// Only ever widens, so no digits are dropped.
fn at_scale(value: Decimal, scale: u32) -> Decimal {
    let mut rescaled = value;
    if scale > rescaled.scale() {
        rescaled.rescale(scale);
    }
    rescaled
}

fn to_millis(field: &str, at: Option<DateTime<Utc>>) -> Result<u64> {
    let Some(at) = at else {
        return Ok(0);
    };
    u64::try_from(at.timestamp_millis())
        .map_err(|e| Error::validation(format!("{field} {at} predates the epoch: {e}")))
}

/// Conditional trigger of an order.
#[non_exhaustive]
#[derive(Clone, Debug, Builder)]
pub struct Trigger {
    /// Venue trigger type code.
    pub trigger_type: u32,
    pub price_type: PriceType,
    pub price: Decimal,
}

/// Take-profit or stop-loss leg opened together with an order.
#[non_exhaustive]
#[derive(Clone, Debug, Builder)]
pub struct TpSlLeg {
    /// Zero for a market leg.
    #[builder(default)]
    pub price: Decimal,
    pub size: Decimal,
    #[builder(into, default)]
    pub client_order_id: String,
    pub trigger_price_type: PriceType,
    pub trigger_price: Decimal,
    pub expire_time: Option<DateTime<Utc>>,
}

impl TpSlLeg {
    fn to_param(&self) -> Result<OpenTpSlParam> {
        let (price_scale, price_value, trigger_price_value) = to_scaled_pair(
            "tp/sl price",
            self.price,
            "tp/sl trigger price",
            self.trigger_price,
        )?;
        let (size_scale, size_value) = to_scaled("tp/sl size", self.size)?;

        Ok(OpenTpSlParam {
            price_scale,
            price_value,
            size_scale,
            size_value,
            client_order_id: self.client_order_id.clone(),
            trigger_price_type: self.trigger_price_type as i32,
            trigger_price_value,
            expire_time: to_millis("tp/sl expire time", self.expire_time)?,
        })
    }
}

/// Per-order parameters, shared by single and batch placement.
#[non_exhaustive]
#[derive(Clone, Debug, Builder)]
pub struct OrderParams {
    pub is_buy: bool,
    /// Zero for market orders.
    #[builder(default)]
    pub price: Decimal,
    pub size: Decimal,
    /// Idempotency key, at most 64 characters.
    #[builder(into, default)]
    pub client_order_id: String,
    #[builder(default)]
    pub time_in_force: TimeInForce,
    #[builder(default)]
    pub reduce_only: bool,
    pub expire_time: Option<DateTime<Utc>>,
    #[builder(default)]
    pub is_market: bool,
    #[builder(default)]
    pub is_position_tp: bool,
    #[builder(default)]
    pub is_position_sl: bool,
    pub trigger: Option<Trigger>,
    pub open_tp: Option<TpSlLeg>,
    pub open_sl: Option<TpSlLeg>,
}

const MAX_CLIENT_ORDER_ID_LEN: usize = 64;

impl OrderParams {
    pub(crate) fn to_param(&self) -> Result<CreateOrderParam> {
        if self.size.is_zero() || self.size.is_sign_negative() {
            return Err(Error::validation(format!(
                "order size must be positive, got {}",
                self.size
            )));
        }
        if !self.is_market && self.price.is_zero() {
            return Err(Error::validation("limit orders need a non-zero price"));
        }
        if self.client_order_id.len() > MAX_CLIENT_ORDER_ID_LEN {
            return Err(Error::validation(format!(
                "client order id exceeds {MAX_CLIENT_ORDER_ID_LEN} characters"
            )));
        }

        let (size_scale, size_value) = to_scaled("size", self.size)?;
        let (price_scale, price_value, trigger_type, trigger_price_type, trigger_price_value) =
            match &self.trigger {
                Some(trigger) => {
                    let (price_scale, price_value, trigger_price_value) =
                        to_scaled_pair("price", self.price, "trigger price", trigger.price)?;
                    let trigger_type = i32::try_from(trigger.trigger_type).map_err(|e| {
                        Error::validation(format!("trigger type out of range: {e}"))
                    })?;
                    (
                        price_scale,
                        price_value,
                        trigger_type,
                        trigger.price_type as i32,
                        trigger_price_value,
                    )
                }
                None => {
                    let (price_scale, price_value) = to_scaled("price", self.price)?;
                    (price_scale, price_value, 0, 0, 0)
                }
            };

        Ok(CreateOrderParam {
            is_buy: self.is_buy,
            price_scale,
            price_value,
            size_scale,
            size_value,
            client_order_id: self.client_order_id.clone(),
            time_in_force: self.time_in_force as i32,
            reduce_only: self.reduce_only,
            expire_time: to_millis("expire time", self.expire_time)?,
            is_market: self.is_market,
            is_position_tp: self.is_position_tp,
            is_position_sl: self.is_position_sl,
            trigger_type,
            trigger_price_type,
            trigger_price_value,
            is_set_open_tp: self.open_tp.is_some(),
            open_tp_param: self.open_tp.as_ref().map(TpSlLeg::to_param).transpose()?,
            is_set_open_sl: self.open_sl.is_some(),
            open_sl_param: self.open_sl.as_ref().map(TpSlLeg::to_param).transpose()?,
        })
    }
}

/// Input for [`TradingClient::create_order`](crate::trading::TradingClient::create_order).
#[non_exhaustive]
#[derive(Clone, Debug, Builder)]
pub struct CreateOrderRequest {
    pub subaccount_id: u64,
    pub exchange_id: u64,
    #[builder(default)]
    pub margin_mode: MarginMode,
    #[builder(default = 1)]
    pub leverage: u32,
    pub order: OrderParams,
}

impl CreateOrderRequest {
    pub(crate) fn to_message(&self, agent_address: &str) -> Result<MsgCreateOrder> {
        let p = self.order.to_param()?;
        Ok(MsgCreateOrder {
            agent_address: agent_address.to_owned(),
            subaccount_id: self.subaccount_id,
            exchange_id: self.exchange_id,
            margin_mode: self.margin_mode as i32,
            leverage: self.leverage,
            is_buy: p.is_buy,
            price_scale: p.price_scale,
            price_value: p.price_value,
            size_scale: p.size_scale,
            size_value: p.size_value,
            client_order_id: p.client_order_id,
            time_in_force: p.time_in_force,
            reduce_only: p.reduce_only,
            expire_time: p.expire_time,
            is_market: p.is_market,
            is_position_tp: p.is_position_tp,
            is_position_sl: p.is_position_sl,
            trigger_type: p.trigger_type,
            trigger_price_type: p.trigger_price_type,
            trigger_price_value: p.trigger_price_value,
            is_set_open_tp: p.is_set_open_tp,
            open_tp_param: p.open_tp_param,
            is_set_open_sl: p.is_set_open_sl,
            open_sl_param: p.open_sl_param,
        })
    }
}

/// Several orders on one exchange and subaccount, placed in one transaction.
#[non_exhaustive]
#[derive(Clone, Debug, Builder)]
pub struct CreateOrderBatchRequest {
    pub subaccount_id: u64,
    pub exchange_id: u64,
    #[builder(default)]
    pub margin_mode: MarginMode,
    #[builder(default = 1)]
    pub leverage: u32,
    pub orders: Vec<OrderParams>,
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::error::Kind;

    #[test]
    fn decimal_keeps_caller_scale() {
        assert_eq!(to_scaled("price", dec!(1000.00)).expect("valid"), (2, 100_000));
        assert_eq!(to_scaled("size", dec!(0.100)).expect("valid"), (3, 100));
        assert_eq!(to_scaled("price", Decimal::ZERO).expect("valid"), (0, 0));
    }

    #[test]
    fn negative_decimal_is_rejected() {
        let err = to_scaled("price", dec!(-1.5)).unwrap_err();

        assert_eq!(err.kind(), Kind::Validation);
    }

    #[test]
    fn limit_order_maps_to_message() {
        let request = CreateOrderRequest::builder()
            .subaccount_id(7)
            .exchange_id(200_001)
            .margin_mode(MarginMode::Cross)
            .order(
                OrderParams::builder()
                    .is_buy(true)
                    .price(dec!(1000.00))
                    .size(dec!(0.100))
                    .client_order_id("test-order-001")
                    .build(),
            )
            .build();

        let msg = request.to_message("antx1agent").expect("valid order");

        assert_eq!(msg.agent_address, "antx1agent");
        assert_eq!(msg.leverage, 1);
        assert_eq!(msg.margin_mode, 1);
        assert_eq!((msg.price_scale, msg.price_value), (2, 100_000));
        assert_eq!((msg.size_scale, msg.size_value), (3, 100));
        assert_eq!(msg.time_in_force, TimeInForce::Gtc as i32);
        assert!(!msg.is_set_open_tp, "no tp leg");
        assert!(msg.open_tp_param.is_none(), "no tp leg");
    }

    #[test]
    fn limit_order_without_price_is_rejected() {
        let order = OrderParams::builder().is_buy(false).size(dec!(1)).build();

        let err = order.to_param().unwrap_err();

        assert_eq!(err.kind(), Kind::Validation);
    }

    #[test]
    fn market_order_allows_zero_price() {
        let order = OrderParams::builder()
            .is_buy(false)
            .size(dec!(0.050))
            .is_market(true)
            .time_in_force(TimeInForce::Ioc)
            .build();

        let param = order.to_param().expect("valid market order");

        assert_eq!(param.price_value, 0);
        assert_eq!(param.time_in_force, 3);
    }

    #[test]
    fn trigger_price_is_read_at_order_price_scale() {
        let order = OrderParams::builder()
            .is_buy(false)
            .price(dec!(1000.00))
            .size(dec!(1))
            .trigger(
                Trigger::builder()
                    .trigger_type(1)
                    .price_type(PriceType::Mark)
                    .price(dec!(990.5))
                    .build(),
            )
            .build();

        let param = order.to_param().expect("valid stop order");

        assert_eq!((param.price_scale, param.price_value), (2, 100_000));
        assert_eq!(param.trigger_price_value, 99_050);
    }

    #[test]
    fn finer_trigger_price_widens_order_scale() {
        let order = OrderParams::builder()
            .is_buy(true)
            .price(dec!(1000.5))
            .size(dec!(1))
            .trigger(
                Trigger::builder()
                    .trigger_type(1)
                    .price_type(PriceType::Last)
                    .price(dec!(990.125))
                    .build(),
            )
            .build();

        let param = order.to_param().expect("valid stop order");

        assert_eq!((param.price_scale, param.price_value), (3, 1_000_500));
        assert_eq!(param.trigger_price_value, 990_125);
    }

    #[test]
    fn market_stop_order_keeps_trigger_decimals() {
        let order = OrderParams::builder()
            .is_buy(false)
            .size(dec!(1))
            .is_market(true)
            .trigger(
                Trigger::builder()
                    .trigger_type(1)
                    .price_type(PriceType::Last)
                    .price(dec!(990.5))
                    .build(),
            )
            .build();

        let param = order.to_param().expect("valid market stop order");

        assert_eq!((param.price_scale, param.price_value), (1, 0));
        assert_eq!(param.trigger_price_value, 9905);
    }

    #[test]
    fn tp_leg_trigger_uses_leg_price_scale() {
        let leg = TpSlLeg::builder()
            .price(dec!(1100.00))
            .size(dec!(1))
            .trigger_price_type(PriceType::Last)
            .trigger_price(dec!(1095.5))
            .build();

        let param = leg.to_param().expect("valid leg");

        assert_eq!((param.price_scale, param.price_value), (2, 110_000));
        assert_eq!(param.trigger_price_value, 109_550);
    }
}
