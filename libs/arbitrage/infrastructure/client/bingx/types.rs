//! BingX perpetual swap WebSocket message types
//!
//! Endpoint: wss://open-api-swap.bingx.com/swap-market. Every frame the
//! server sends is GZIP-compressed; heartbeats are the bare strings
//! `Ping` / `Pong`.

use crate::domain::QuoteFields;
use crate::infrastructure::client::{number, NumberField};
use serde::{Deserialize, Serialize};

// =============================================================================
// Outbound
// =============================================================================

/// Subscription request
///
/// Example JSON:
/// ```json
/// {"id": "sub_BTC-USDT", "reqType": "sub", "dataType": "BTC-USDT@ticker"}
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct BingxRequest {
    pub id: String,
    #[serde(rename = "reqType")]
    pub req_type: &'static str,
    #[serde(rename = "dataType")]
    pub data_type: String,
}

impl BingxRequest {
    pub fn ticker(req_type: &'static str, native_symbol: &str) -> Self {
        Self {
            id: format!("{}_{}", req_type, native_symbol),
            req_type,
            data_type: format!("{}@ticker", native_symbol),
        }
    }
}

// =============================================================================
// Inbound
// =============================================================================

/// Common envelope of every JSON frame
///
/// Example JSON (subscription ack):
/// ```json
/// {"id": "sub_BTC-USDT", "code": 0, "msg": "", "dataType": "", "data": null}
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct BingxEnvelope {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub code: Option<i64>,

    #[serde(default)]
    pub msg: Option<String>,

    #[serde(rename = "dataType", default)]
    pub data_type: Option<String>,

    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// 24h ticker payload (`<SYMBOL>@ticker`)
///
/// Example JSON:
/// ```json
/// {
///     "e": "24hTicker",
///     "E": 1766482935996,
///     "s": "BTC-USDT",
///     "c": "87398.4",
///     "b": "87398.3",
///     "B": "1.204",
///     "a": "87398.5",
///     "A": "0.870"
/// }
/// ```
/// `b`/`a` are not always present; `bid1`/`ask1` show up on some streams
/// and `c` (last) is the final fallback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BingxTicker {
    /// Event time (ms since epoch)
    #[serde(rename = "E", default)]
    pub event_time: Option<NumberField>,

    #[serde(rename = "s", default)]
    pub symbol: Option<String>,

    #[serde(rename = "b", default)]
    pub bid: Option<NumberField>,

    #[serde(rename = "a", default)]
    pub ask: Option<NumberField>,

    #[serde(default)]
    pub bid1: Option<NumberField>,

    #[serde(default)]
    pub ask1: Option<NumberField>,

    /// Last traded price
    #[serde(rename = "c", default)]
    pub last: Option<NumberField>,
}

impl BingxTicker {
    pub fn quote_fields(&self) -> QuoteFields {
        QuoteFields {
            bid: number(&self.bid),
            ask: number(&self.ask),
            alt_bid: number(&self.bid1),
            alt_ask: number(&self.ask1),
            last: number(&self.last),
        }
    }
}
