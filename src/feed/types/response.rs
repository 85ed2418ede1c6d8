use bon::Builder;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One symbol's current market snapshot, as pushed by the feed.
///
/// Produced per inbound frame and handed to subscribers; nothing is
/// persisted. Money fields use [`Decimal`]; the timestamp is kept as the
/// wire string.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct PriceUpdate {
    /// Ticker symbol (e.g., "TCS", "INFY")
    pub symbol: String,
    /// Last traded price
    pub current_price: Decimal,
    /// Absolute change since the previous close
    pub change: Decimal,
    /// Relative change since the previous close, in percent
    pub change_percent: Decimal,
    /// Highest price seen today
    pub day_high: Decimal,
    /// Lowest price seen today
    pub day_low: Decimal,
    /// Server-side timestamp of this snapshot
    pub timestamp: String,
}

/// Decoded body of one price message.
///
/// The bulk topic carries JSON arrays, the single-symbol topics one object
/// per message. Decoding attempts the array shape first and falls back to a
/// single object.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PricePayload {
    /// Ordered batch of updates from the all-stocks topic
    Bulk(Vec<PriceUpdate>),
    /// One update from a single-symbol topic
    Single(PriceUpdate),
}

impl PricePayload {
    /// The updates in this payload, batch or not, in wire order.
    #[must_use]
    pub fn into_updates(self) -> Vec<PriceUpdate> {
        match self {
            Self::Bulk(updates) => updates,
            Self::Single(update) => vec![update],
        }
    }

    /// Extract the single update, if this is a single-symbol payload.
    #[must_use]
    pub fn into_single(self) -> Option<PriceUpdate> {
        match self {
            Self::Single(update) => Some(update),
            Self::Bulk(_) => None,
        }
    }
}

/// One decoded inbound feed message: which topic it arrived on, which
/// registered subscription the server attributed it to, and its payload.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct FeedEvent {
    /// The destination the message was published on
    pub destination: String,
    /// The `subscription` header, if the server echoed one
    pub subscription: Option<String>,
    /// Decoded price payload
    pub payload: PricePayload,
}

/// Decode a message body into a price payload.
///
/// Attempts the bulk array shape first, then a single object.
pub fn parse_price_payload(body: &str) -> crate::Result<PricePayload> {
    if body.trim_start().starts_with('[') {
        Ok(PricePayload::Bulk(serde_json::from_str(body)?))
    } else {
        Ok(PricePayload::Single(serde_json::from_str(body)?))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn parse_single_update() {
        let json = r#"{
            "symbol": "TCS",
            "currentPrice": 3500.25,
            "change": 12.5,
            "changePercent": 0.36,
            "dayHigh": 3510.0,
            "dayLow": 3480.0,
            "timestamp": "2024-03-12T10:15:30Z"
        }"#;

        let payload = parse_price_payload(json).unwrap();
        let update = payload.into_single().unwrap();
        assert_eq!(update.symbol, "TCS");
        assert_eq!(update.current_price, dec!(3500.25));
        assert_eq!(update.change, dec!(12.5));
        assert_eq!(update.change_percent, dec!(0.36));
        assert_eq!(update.day_high, dec!(3510.0));
        assert_eq!(update.day_low, dec!(3480.0));
        assert_eq!(update.timestamp, "2024-03-12T10:15:30Z");
    }

    #[test]
    fn parse_bulk_update() {
        let json = r#"[
            {
                "symbol": "TCS",
                "currentPrice": 3500.25,
                "change": 12.5,
                "changePercent": 0.36,
                "dayHigh": 3510.0,
                "dayLow": 3480.0,
                "timestamp": "2024-03-12T10:15:30Z"
            },
            {
                "symbol": "INFY",
                "currentPrice": 1500.0,
                "change": -4.25,
                "changePercent": -0.28,
                "dayHigh": 1512.0,
                "dayLow": 1495.5,
                "timestamp": "2024-03-12T10:15:30Z"
            }
        ]"#;

        let payload = parse_price_payload(json).unwrap();
        let updates = payload.into_updates();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].symbol, "TCS");
        assert_eq!(updates[1].symbol, "INFY");
        assert_eq!(updates[1].change, dec!(-4.25));
    }

    #[test]
    fn parse_preserves_bulk_order() {
        let json = r#"[
            {"symbol": "C", "currentPrice": 1, "change": 0, "changePercent": 0, "dayHigh": 1, "dayLow": 1, "timestamp": "t"},
            {"symbol": "A", "currentPrice": 2, "change": 0, "changePercent": 0, "dayHigh": 2, "dayLow": 2, "timestamp": "t"},
            {"symbol": "B", "currentPrice": 3, "change": 0, "changePercent": 0, "dayHigh": 3, "dayLow": 3, "timestamp": "t"}
        ]"#;

        let updates = parse_price_payload(json).unwrap().into_updates();
        let symbols: Vec<&str> = updates.iter().map(|u| u.symbol.as_str()).collect();
        assert_eq!(symbols, ["C", "A", "B"]);
    }

    #[test]
    fn parse_rejects_non_json() {
        parse_price_payload("not json at all").unwrap_err();
    }

    #[test]
    fn parse_rejects_wrong_shape() {
        parse_price_payload(r#"{"hello": "world"}"#).unwrap_err();
    }

    #[test]
    fn bulk_is_not_a_single() {
        let payload = PricePayload::Bulk(Vec::new());
        assert_eq!(payload.into_single(), None);
    }

    #[test]
    fn serialize_roundtrip_uses_camel_case() {
        let update = PriceUpdate::builder()
            .symbol("INFY".to_owned())
            .current_price(dec!(1500))
            .change(dec!(1))
            .change_percent(dec!(0.07))
            .day_high(dec!(1510))
            .day_low(dec!(1490))
            .timestamp("2024-03-12T10:15:30Z".to_owned())
            .build();

        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains("\"currentPrice\""));
        assert!(json.contains("\"changePercent\""));
        assert!(json.contains("\"dayHigh\""));
        assert!(json.contains("\"dayLow\""));
    }
}
