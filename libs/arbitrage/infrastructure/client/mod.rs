//! Exchange adapters
//!
//! One adapter per venue owns everything exchange-specific: subscription
//! frames, heartbeat framing and the mapping from raw payloads to the
//! canonical [`Tick`]. Nothing else in the crate knows a wire key name.

pub mod bingx;
pub mod bybit;

use crate::domain::{Exchange, Tick};
use serde::Deserialize;
use wsfeed::WsMessage;

pub use bingx::BingxAdapter;
pub use bybit::BybitAdapter;

/// What a raw payload turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Tick(Tick),
    /// Acknowledges our heartbeat; never forwarded downstream
    HeartbeatAck,
    /// The server pinged us; send the reply back on the same socket
    ServerPing(WsMessage),
}

/// Per-exchange protocol knowledge
pub trait ExchangeAdapter: Send + Sync + 'static {
    fn exchange(&self) -> Exchange;

    /// Turn a decoded payload into zero or one [`Normalized`] value
    ///
    /// Never fails: unparseable or irrelevant payloads yield `None` and are
    /// logged at debug level.
    fn normalize(&self, payload: &str) -> Option<Normalized>;

    /// Frames subscribing to the ticker stream of canonical `symbols`
    fn subscribe_messages(&self, symbols: &[String]) -> Vec<WsMessage>;

    fn unsubscribe_messages(&self, symbols: &[String]) -> Vec<WsMessage>;

    /// Client heartbeat frame
    fn heartbeat(&self) -> WsMessage;
}

/// Adapter instance for `exchange`
pub fn adapter_for(exchange: Exchange) -> Box<dyn ExchangeAdapter> {
    match exchange {
        Exchange::BingX => Box::new(BingxAdapter::new()),
        Exchange::Bybit => Box::new(BybitAdapter::new()),
    }
}

// =============================================================================
// Wire helpers shared by the adapters
// =============================================================================

/// Numeric wire field that may arrive as a JSON number or a decimal string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberField {
    Number(f64),
    Text(String),
}

impl NumberField {
    /// `None` for empty or unparseable strings
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NumberField::Number(n) => Some(*n),
            NumberField::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    None
                } else {
                    s.parse().ok()
                }
            }
        }
    }

    /// Millisecond timestamps; `None` unless a positive integer
    pub fn as_millis(&self) -> Option<u64> {
        self.as_f64()
            .filter(|v| v.is_finite() && *v > 0.0)
            .map(|v| v as u64)
    }
}

pub(crate) fn number(field: &Option<NumberField>) -> Option<f64> {
    field.as_ref().and_then(NumberField::as_f64)
}

/// Exchange timestamp, or local receive time when the payload has none
pub(crate) fn timestamp_or_now(field: &Option<NumberField>) -> u64 {
    field
        .as_ref()
        .and_then(NumberField::as_millis)
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis().max(0) as u64)
}

/// Key set of a JSON object, for diagnostics
pub(crate) fn key_set(value: &serde_json::Value) -> Vec<String> {
    value
        .as_object()
        .map(|o| o.keys().cloned().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_field_forms() {
        let parsed: Vec<NumberField> =
            serde_json::from_str(r#"[1.5, "2.25", "", "abc", 1700000000000]"#).unwrap();
        assert_eq!(parsed[0].as_f64(), Some(1.5));
        assert_eq!(parsed[1].as_f64(), Some(2.25));
        assert_eq!(parsed[2].as_f64(), None);
        assert_eq!(parsed[3].as_f64(), None);
        assert_eq!(parsed[4].as_millis(), Some(1_700_000_000_000));
    }

    #[test]
    fn test_adapter_for_matches_exchange() {
        for exchange in Exchange::all() {
            assert_eq!(adapter_for(*exchange).exchange(), *exchange);
        }
    }
}
