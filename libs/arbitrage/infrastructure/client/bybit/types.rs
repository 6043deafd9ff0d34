//! Bybit v5 public WebSocket message types
//!
//! Endpoint: wss://stream.bybit.com/v5/public/linear. Frames are plain text
//! JSON. Ticker topics publish a `snapshot` first and `delta` updates after,
//! where a delta only carries the fields that changed.

use crate::domain::QuoteFields;
use crate::infrastructure::client::{number, NumberField};
use serde::{Deserialize, Serialize};

// =============================================================================
// Outbound
// =============================================================================

/// Operation request (subscribe / unsubscribe / ping)
///
/// Example JSON:
/// ```json
/// {"op": "subscribe", "args": ["tickers.BTCUSDT", "tickers.ETHUSDT"]}
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct BybitRequest {
    pub op: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

// =============================================================================
// Inbound
// =============================================================================

/// Union of the shapes the public stream sends
///
/// Example JSON (ticker delta):
/// ```json
/// {
///     "topic": "tickers.BTCUSDT",
///     "type": "delta",
///     "ts": 1673853746003,
///     "data": {"symbol": "BTCUSDT", "bid1Price": "21109.50", "ask1Price": "21109.70"}
/// }
/// ```
///
/// Example JSON (pong):
/// ```json
/// {"success": true, "ret_msg": "pong", "conn_id": "...", "op": "ping"}
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct BybitEnvelope {
    #[serde(default)]
    pub topic: Option<String>,

    /// "snapshot" or "delta"
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub ts: Option<NumberField>,

    #[serde(default)]
    pub data: Option<serde_json::Value>,

    #[serde(default)]
    pub op: Option<String>,

    #[serde(default)]
    pub success: Option<bool>,

    #[serde(default)]
    pub ret_msg: Option<String>,
}

impl BybitEnvelope {
    pub fn is_pong(&self) -> bool {
        match self.op.as_deref() {
            Some("pong") => true,
            Some("ping") => self.ret_msg.as_deref() == Some("pong"),
            _ => false,
        }
    }

    pub fn is_delta(&self) -> bool {
        self.kind.as_deref() == Some("delta")
    }
}

/// Linear ticker payload (subset)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BybitTicker {
    #[serde(default)]
    pub symbol: Option<String>,

    #[serde(rename = "bid1Price", default)]
    pub bid1_price: Option<NumberField>,

    #[serde(rename = "ask1Price", default)]
    pub ask1_price: Option<NumberField>,

    #[serde(rename = "lastPrice", default)]
    pub last_price: Option<NumberField>,
}

impl BybitTicker {
    /// Overlay the fields a delta carries
    pub fn merge(&mut self, delta: BybitTicker) {
        if delta.symbol.is_some() {
            self.symbol = delta.symbol;
        }
        if delta.bid1_price.is_some() {
            self.bid1_price = delta.bid1_price;
        }
        if delta.ask1_price.is_some() {
            self.ask1_price = delta.ask1_price;
        }
        if delta.last_price.is_some() {
            self.last_price = delta.last_price;
        }
    }

    pub fn quote_fields(&self) -> QuoteFields {
        QuoteFields {
            bid: number(&self.bid1_price),
            ask: number(&self.ask1_price),
            alt_bid: None,
            alt_ask: None,
            last: number(&self.last_price),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pong_shapes() {
        let pong: BybitEnvelope = serde_json::from_str(
            r#"{"success":true,"ret_msg":"pong","conn_id":"x","op":"ping"}"#,
        )
        .unwrap();
        assert!(pong.is_pong());
        let pong: BybitEnvelope = serde_json::from_str(r#"{"op":"pong","args":["1"]}"#).unwrap();
        assert!(pong.is_pong());
        let ack: BybitEnvelope =
            serde_json::from_str(r#"{"success":true,"ret_msg":"","op":"subscribe"}"#).unwrap();
        assert!(!ack.is_pong());
    }

    #[test]
    fn test_merge_keeps_unchanged_fields() {
        let mut snapshot: BybitTicker = serde_json::from_str(
            r#"{"symbol":"BTCUSDT","bid1Price":"100","ask1Price":"101","lastPrice":"100.5"}"#,
        )
        .unwrap();
        let delta: BybitTicker =
            serde_json::from_str(r#"{"symbol":"BTCUSDT","ask1Price":"102"}"#).unwrap();
        snapshot.merge(delta);
        let fields = snapshot.quote_fields();
        assert_eq!(fields.bid, Some(100.0));
        assert_eq!(fields.ask, Some(102.0));
    }

    #[test]
    fn test_request_shape() {
        let request = BybitRequest {
            op: "subscribe",
            args: vec!["tickers.BTCUSDT".into()],
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"op":"subscribe","args":["tickers.BTCUSDT"]}"#
        );
        let ping = BybitRequest { op: "ping", args: vec![] };
        assert_eq!(serde_json::to_string(&ping).unwrap(), r#"{"op":"ping"}"#);
    }
}
