//! Glue between one exchange session and the distribution queue

use super::events::{ConnectionStatus, EventSink};
use crate::domain::{Exchange, Tick};
use crate::infrastructure::{DropOldestQueue, ExchangeAdapter, Normalized, PushOutcome};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use wsfeed::{ConnectionState, Dispatch, FrameHandler, WsMessage};

/// [`FrameHandler`] for one exchange
///
/// Runs on the session task: normalizes each payload and pushes ticks for
/// subscribed symbols onto the shared queue. Never blocks.
pub struct ExchangeFeed {
    adapter: Box<dyn ExchangeAdapter>,
    symbols: RwLock<Vec<String>>,
    queue: Arc<DropOldestQueue<Tick>>,
    sink: Arc<dyn EventSink>,
}

impl ExchangeFeed {
    pub fn new(
        adapter: Box<dyn ExchangeAdapter>,
        symbols: Vec<String>,
        queue: Arc<DropOldestQueue<Tick>>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            adapter,
            symbols: RwLock::new(symbols),
            queue,
            sink,
        }
    }

    pub fn exchange(&self) -> Exchange {
        self.adapter.exchange()
    }

    pub fn heartbeat(&self) -> WsMessage {
        self.adapter.heartbeat()
    }

    pub fn symbols(&self) -> Vec<String> {
        self.symbols.read().clone()
    }

    /// Add symbols, returning the subscribe frames for the ones that were new
    pub fn add_symbols(&self, symbols: &[String]) -> Vec<WsMessage> {
        let added: Vec<String> = {
            let mut current = self.symbols.write();
            let mut added = Vec::new();
            for symbol in symbols {
                if !current.contains(symbol) {
                    current.push(symbol.clone());
                    added.push(symbol.clone());
                }
            }
            added
        };
        if added.is_empty() {
            return Vec::new();
        }
        self.adapter.subscribe_messages(&added)
    }

    pub fn remove_symbols(&self, symbols: &[String]) -> Vec<WsMessage> {
        let removed: Vec<String> = {
            let mut current = self.symbols.write();
            let before = current.clone();
            current.retain(|s| !symbols.contains(s));
            before.into_iter().filter(|s| symbols.contains(s)).collect()
        };
        if removed.is_empty() {
            return Vec::new();
        }
        self.adapter.unsubscribe_messages(&removed)
    }

    fn is_subscribed(&self, symbol: &str) -> bool {
        self.symbols.read().iter().any(|s| s == symbol)
    }
}

impl FrameHandler for ExchangeFeed {
    fn subscriptions(&self) -> Vec<WsMessage> {
        let symbols = self.symbols();
        if symbols.is_empty() {
            return Vec::new();
        }
        info!(
            "[{} WS] Subscribing to {} symbol(s): {:?}",
            self.exchange(),
            symbols.len(),
            symbols
        );
        self.adapter.subscribe_messages(&symbols)
    }

    fn on_frame(&self, payload: &str) -> Dispatch {
        match self.adapter.normalize(payload) {
            Some(Normalized::Tick(tick)) => {
                if !self.is_subscribed(&tick.symbol) {
                    debug!("[{} WS] Tick for unsubscribed {}", self.exchange(), tick.symbol);
                    return Dispatch::Ignored;
                }
                match self.queue.push(tick) {
                    PushOutcome::Rejected(tick) => {
                        debug!("[{} WS] Queue closed, dropping {}", self.exchange(), tick.symbol);
                        Dispatch::Ignored
                    }
                    PushOutcome::Accepted | PushOutcome::Evicted(_) => Dispatch::Forwarded,
                }
            }
            Some(Normalized::HeartbeatAck) => Dispatch::HeartbeatAck,
            Some(Normalized::ServerPing(reply)) => Dispatch::Reply(reply),
            None => Dispatch::Ignored,
        }
    }

    fn on_state_change(&self, state: ConnectionState, detail: &str) {
        let exchange = self.exchange();
        match state {
            ConnectionState::Failed => error!("[{} WS] {}: {}", exchange, state, detail),
            ConnectionState::Reconnecting => warn!("[{} WS] {}: {}", exchange, state, detail),
            _ => info!("[{} WS] {}: {}", exchange, state, detail),
        }

        self.sink.on_connection_status(&ConnectionStatus {
            exchange,
            state,
            detail: detail.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis().max(0) as u64,
        });
    }
}
