//! Channel names understood by the realtime endpoint.

use crate::types::{KlineType, PriceType};

#[must_use]
pub fn ticker(exchange_id: &str) -> String {
    format!("ticker.{exchange_id}")
}

#[must_use]
pub fn kline(price_type: PriceType, exchange_id: &str, kline_type: KlineType) -> String {
    format!("kline.{price_type}.{exchange_id}.{kline_type}")
}

#[must_use]
pub fn depth(exchange_id: &str) -> String {
    format!("depth.{exchange_id}")
}

#[must_use]
pub fn trade(exchange_id: &str) -> String {
    format!("trade.{exchange_id}")
}

#[must_use]
pub fn funding_rate(exchange_id: &str) -> String {
    format!("fundingRate.{exchange_id}")
}

#[must_use]
pub fn price(price_type: PriceType, exchange_id: &str) -> String {
    format!("price.{price_type}.{exchange_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_channel_grammar() {
        assert_eq!(ticker("200001"), "ticker.200001");
        assert_eq!(
            kline(PriceType::Last, "200001", KlineType::Minute1),
            "kline.PRICE_TYPE_LAST.200001.MINUTE_1"
        );
        assert_eq!(depth("200001"), "depth.200001");
        assert_eq!(trade("200001"), "trade.200001");
        assert_eq!(funding_rate("200001"), "fundingRate.200001");
        assert_eq!(price(PriceType::Mark, "200001"), "price.PRICE_TYPE_MARK.200001");
    }
}
