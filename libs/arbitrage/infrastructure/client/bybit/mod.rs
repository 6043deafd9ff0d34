//! Bybit linear perpetual adapter

pub mod types;

use super::{key_set, timestamp_or_now, ExchangeAdapter, Normalized};
use crate::domain::{Exchange, Tick};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use types::{BybitEnvelope, BybitRequest, BybitTicker};
use wsfeed::WsMessage;

const TOPIC_PREFIX: &str = "tickers.";

/// Topics per subscribe request
const MAX_ARGS_PER_REQUEST: usize = 10;

/// Bybit protocol knowledge
///
/// Keeps the last full ticker per instrument so `delta` frames, which only
/// carry changed fields, can be resolved into complete quotes.
#[derive(Debug, Default)]
pub struct BybitAdapter {
    tickers: Mutex<HashMap<String, BybitTicker>>,
    keys_logged: AtomicBool,
}

impl BybitAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn requests(&self, op: &'static str, symbols: &[String]) -> Vec<WsMessage> {
        let topics: Vec<String> = symbols
            .iter()
            .map(|s| format!("{}{}", TOPIC_PREFIX, Exchange::Bybit.native_symbol(s)))
            .collect();

        topics
            .chunks(MAX_ARGS_PER_REQUEST)
            .filter_map(|chunk| {
                let request = BybitRequest {
                    op,
                    args: chunk.to_vec(),
                };
                match serde_json::to_string(&request) {
                    Ok(json) => Some(WsMessage::Text(json)),
                    Err(e) => {
                        warn!("[Bybit WS] Failed to encode {} request: {}", op, e);
                        None
                    }
                }
            })
            .collect()
    }

    fn ticker(&self, envelope: BybitEnvelope, native_symbol: &str) -> Option<Tick> {
        let data = envelope.data.as_ref().filter(|d| d.is_object())?;
        let keys = key_set(data);
        if !self.keys_logged.swap(true, Ordering::Relaxed) {
            info!("[Bybit WS] Ticker payload keys: {:?}", keys);
        }

        let update: BybitTicker = match serde_json::from_value(data.clone()) {
            Ok(t) => t,
            Err(e) => {
                debug!(
                    "[Bybit WS] Malformed ticker for {}: {} (keys: {:?})",
                    native_symbol, e, keys
                );
                return None;
            }
        };

        let merged = {
            let mut tickers = self.tickers.lock();
            let entry = tickers.entry(native_symbol.to_string()).or_default();
            if envelope.is_delta() {
                entry.merge(update);
            } else {
                *entry = update;
            }
            entry.clone()
        };

        let Some((bid, ask)) = merged.quote_fields().resolve() else {
            debug!("[Bybit WS] No usable price fields for {} (keys: {:?})", native_symbol, keys);
            return None;
        };

        Tick::new(
            Exchange::Bybit,
            Exchange::Bybit.canonical_symbol(native_symbol),
            bid,
            ask,
            timestamp_or_now(&envelope.ts),
        )
    }
}

impl ExchangeAdapter for BybitAdapter {
    fn exchange(&self) -> Exchange {
        Exchange::Bybit
    }

    fn normalize(&self, payload: &str) -> Option<Normalized> {
        let envelope: BybitEnvelope = match serde_json::from_str(payload.trim()) {
            Ok(e) => e,
            Err(e) => {
                debug!("[Bybit WS] Unparseable payload ({}): {}", e, payload);
                return None;
            }
        };

        if envelope.is_pong() {
            return Some(Normalized::HeartbeatAck);
        }

        if let Some(op) = envelope.op.as_deref() {
            if envelope.success == Some(false) {
                warn!(
                    "[Bybit WS] {} rejected: {}",
                    op,
                    envelope.ret_msg.as_deref().unwrap_or("")
                );
            } else {
                debug!("[Bybit WS] {} acknowledged", op);
            }
            return None;
        }

        let Some(native_symbol) = envelope
            .topic
            .as_deref()
            .and_then(|t| t.strip_prefix(TOPIC_PREFIX))
            .map(str::to_string)
        else {
            debug!("[Bybit WS] Non-ticker payload: {}", payload);
            return None;
        };

        self.ticker(envelope, &native_symbol).map(Normalized::Tick)
    }

    fn subscribe_messages(&self, symbols: &[String]) -> Vec<WsMessage> {
        self.requests("subscribe", symbols)
    }

    fn unsubscribe_messages(&self, symbols: &[String]) -> Vec<WsMessage> {
        let mut tickers = self.tickers.lock();
        for symbol in symbols {
            tickers.remove(&Exchange::Bybit.native_symbol(symbol));
        }
        drop(tickers);
        self.requests("unsubscribe", symbols)
    }

    fn heartbeat(&self) -> WsMessage {
        WsMessage::Text(r#"{"op":"ping"}"#.to_string())
    }
}
