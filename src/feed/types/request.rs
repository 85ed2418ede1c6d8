use serde::Serialize;

use crate::Result;
use crate::stomp::Frame;

/// Destination carrying bulk updates for every tracked symbol.
pub const ALL_STOCKS_TOPIC: &str = "/topic/stock-prices";

/// Prefix of the per-symbol update destinations.
const STOCK_TOPIC_PREFIX: &str = "/topic/stock-price/";

/// Prefix of the application destination that triggers a price snapshot push.
const PRICE_REQUEST_PREFIX: &str = "/app/stock-price/";

/// The destination carrying updates for a single symbol.
#[must_use]
pub fn stock_topic(symbol: &str) -> String {
    format!("{STOCK_TOPIC_PREFIX}{symbol}")
}

/// The application destination a snapshot request for `symbol` is published
/// to. The reply arrives asynchronously on [`stock_topic`], if subscribed.
#[must_use]
pub fn price_request_destination(symbol: &str) -> String {
    format!("{PRICE_REQUEST_PREFIX}{symbol}")
}

/// Body of a one-shot price snapshot request.
#[non_exhaustive]
#[derive(Clone, Debug, Serialize)]
pub struct PriceRequest {
    /// Ticker symbol the snapshot is requested for
    pub symbol: String,
}

impl PriceRequest {
    /// Create a snapshot request for `symbol`.
    #[must_use]
    pub fn new<S: Into<String>>(symbol: S) -> Self {
        Self {
            symbol: symbol.into(),
        }
    }

    /// Build the SEND frame publishing this request.
    pub fn to_frame(&self) -> Result<Frame> {
        let body = serde_json::to_string(self)?;
        Ok(Frame::send(&price_request_destination(&self.symbol), body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_topic_embeds_symbol() {
        assert_eq!(stock_topic("TCS"), "/topic/stock-price/TCS");
    }

    #[test]
    fn price_request_destination_embeds_symbol() {
        assert_eq!(price_request_destination("INFY"), "/app/stock-price/INFY");
    }

    #[test]
    fn price_request_frame_carries_symbol_body() {
        let frame = PriceRequest::new("TCS").to_frame().unwrap();

        assert_eq!(frame.destination(), Some("/app/stock-price/TCS"));
        assert_eq!(frame.header("content-type"), Some("application/json"));
        assert_eq!(frame.body, r#"{"symbol":"TCS"}"#);
    }
}
