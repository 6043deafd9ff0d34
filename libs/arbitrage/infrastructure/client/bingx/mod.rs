//! BingX swap market adapter

pub mod types;

use super::{key_set, timestamp_or_now, ExchangeAdapter, Normalized};
use crate::domain::{Exchange, Tick};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use types::{BingxEnvelope, BingxRequest, BingxTicker};
use wsfeed::WsMessage;

const TICKER_SUFFIX: &str = "@ticker";
const PING: &str = "Ping";
const PONG: &str = "Pong";

/// BingX protocol knowledge
///
/// Heartbeat is the literal text `Ping`; the server answers with a
/// GZIP-compressed `Pong` (decompressed by the session before it gets here).
/// The server may also ping us with `Ping`, which we answer with `Pong`.
#[derive(Debug, Default)]
pub struct BingxAdapter {
    /// First ticker payload's key set is logged once at info level
    keys_logged: AtomicBool,
}

impl BingxAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn requests(&self, req_type: &'static str, symbols: &[String]) -> Vec<WsMessage> {
        symbols
            .iter()
            .filter_map(|symbol| {
                let native = Exchange::BingX.native_symbol(symbol);
                match serde_json::to_string(&BingxRequest::ticker(req_type, &native)) {
                    Ok(json) => Some(WsMessage::Text(json)),
                    Err(e) => {
                        warn!(
                            "[BingX WS] Failed to encode {} request for {}: {}",
                            req_type, symbol, e
                        );
                        None
                    }
                }
            })
            .collect()
    }

    fn ticker(&self, native_symbol: &str, data: serde_json::Value) -> Option<Tick> {
        let keys = key_set(&data);
        if !self.keys_logged.swap(true, Ordering::Relaxed) {
            info!("[BingX WS] Ticker payload keys: {:?}", keys);
        }

        let ticker: BingxTicker = match serde_json::from_value(data) {
            Ok(t) => t,
            Err(e) => {
                debug!(
                    "[BingX WS] Malformed ticker for {}: {} (keys: {:?})",
                    native_symbol, e, keys
                );
                return None;
            }
        };

        let Some((bid, ask)) = ticker.quote_fields().resolve() else {
            debug!("[BingX WS] No usable price fields for {} (keys: {:?})", native_symbol, keys);
            return None;
        };

        let native = ticker.symbol.as_deref().unwrap_or(native_symbol);
        Tick::new(
            Exchange::BingX,
            Exchange::BingX.canonical_symbol(native),
            bid,
            ask,
            timestamp_or_now(&ticker.event_time),
        )
    }
}

impl ExchangeAdapter for BingxAdapter {
    fn exchange(&self) -> Exchange {
        Exchange::BingX
    }

    fn normalize(&self, payload: &str) -> Option<Normalized> {
        let trimmed = payload.trim();
        if trimmed == PONG {
            return Some(Normalized::HeartbeatAck);
        }
        if trimmed == PING {
            return Some(Normalized::ServerPing(WsMessage::Text(PONG.to_string())));
        }

        let envelope: BingxEnvelope = match serde_json::from_str(trimmed) {
            Ok(e) => e,
            Err(e) => {
                debug!("[BingX WS] Unparseable payload ({}): {}", e, trimmed);
                return None;
            }
        };

        let Some(native_symbol) = envelope
            .data_type
            .as_deref()
            .and_then(|d| d.strip_suffix(TICKER_SUFFIX))
            .map(str::to_string)
        else {
            match envelope.code {
                Some(code) if code != 0 => warn!(
                    "[BingX WS] Request {} rejected: code={} msg={}",
                    envelope.id.as_deref().unwrap_or("?"),
                    code,
                    envelope.msg.as_deref().unwrap_or("")
                ),
                _ => debug!("[BingX WS] Non-ticker payload: {}", trimmed),
            }
            return None;
        };

        match envelope.data {
            Some(data) if data.is_object() => {
                self.ticker(&native_symbol, data).map(Normalized::Tick)
            }
            _ => {
                debug!("[BingX WS] Ticker frame without data object: {}", trimmed);
                None
            }
        }
    }

    fn subscribe_messages(&self, symbols: &[String]) -> Vec<WsMessage> {
        self.requests("sub", symbols)
    }

    fn unsubscribe_messages(&self, symbols: &[String]) -> Vec<WsMessage> {
        self.requests("unsub", symbols)
    }

    fn heartbeat(&self) -> WsMessage {
        WsMessage::Text(PING.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(payload: &str) -> Tick {
        match BingxAdapter::new().normalize(payload) {
            Some(Normalized::Tick(t)) => t,
            other => panic!("expected tick, got {:?}", other),
        }
    }

    #[test]
    fn test_ticker_with_explicit_quotes() {
        let t = tick(
            r#"{"code":0,"dataType":"BTC-USDT@ticker","data":{"e":"24hTicker","E":1700000000000,"s":"BTC-USDT","b":"50000.5","a":"50001.5","c":"50001"}}"#,
        );
        assert_eq!(t.exchange, Exchange::BingX);
        assert_eq!(t.symbol, "BTC/USDT");
        assert_eq!(t.bid, 50000.5);
        assert_eq!(t.ask, 50001.5);
        assert_eq!(t.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn test_alternate_keys_and_numbers() {
        let t =
            tick(r#"{"dataType":"ETH-USDT@ticker","data":{"E":5,"bid1":3000.1,"ask1":3000.3}}"#);
        assert_eq!(t.symbol, "ETH/USDT");
        assert_eq!((t.bid, t.ask), (3000.1, 3000.3));
    }

    #[test]
    fn test_last_price_fallback() {
        let t = tick(r#"{"dataType":"ETH-USDT@ticker","data":{"E":5,"c":"2999.9"}}"#);
        assert_eq!((t.bid, t.ask), (2999.9, 2999.9));
    }

    #[test]
    fn test_missing_timestamp_uses_receive_time() {
        let t = tick(r#"{"dataType":"ETH-USDT@ticker","data":{"b":"1","a":"2"}}"#);
        assert!(t.timestamp > 1_600_000_000_000);
    }

    #[test]
    fn test_heartbeat_literals() {
        let adapter = BingxAdapter::new();
        assert_eq!(adapter.normalize("Pong"), Some(Normalized::HeartbeatAck));
        assert_eq!(
            adapter.normalize("Ping"),
            Some(Normalized::ServerPing(WsMessage::Text("Pong".into())))
        );
        assert_eq!(adapter.heartbeat(), WsMessage::Text("Ping".into()));
    }

    #[test]
    fn test_irrelevant_payloads_are_dropped() {
        let adapter = BingxAdapter::new();
        let ignored = [
            "not json",
            r#"{"id":"sub_BTC-USDT","code":0,"msg":"","dataType":"","data":null}"#,
            r#"{"dataType":"BTC-USDT@depth5","data":{"b":"1"}}"#,
            r#"{"dataType":"BTC-USDT@ticker","data":{"v":"12"}}"#,
            r#"{"dataType":"BTC-USDT@ticker","data":{"b":"-1","a":"2"}}"#,
        ];
        for payload in ignored {
            assert_eq!(adapter.normalize(payload), None, "{}", payload);
        }
    }

    #[test]
    fn test_subscribe_frames_per_symbol() {
        let adapter = BingxAdapter::new();
        let frames = adapter.subscribe_messages(&["BTC/USDT".into(), "ETH/USDT".into()]);
        assert_eq!(frames.len(), 2);
        assert_eq!(
            frames[0].as_text(),
            Some(r#"{"id":"sub_BTC-USDT","reqType":"sub","dataType":"BTC-USDT@ticker"}"#)
        );
        let unsub = adapter.unsubscribe_messages(&["ETH/USDT".into()]);
        assert!(unsub[0].as_text().unwrap().contains(r#""reqType":"unsub""#));
    }
}
