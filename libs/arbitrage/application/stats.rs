//! Latest per-symbol statistics for on-demand queries
//!
//! Written only by the consumer task; readers get clones and never block it
//! for long.

use crate::domain::{Exchange, SignalState, SpreadUpdate, Tick};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;

/// Snapshot of the last computed sample for a symbol
///
/// `z_score` is the value the streaming path produced for that sample, not a
/// recomputation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentStats {
    pub symbol: String,
    pub z_score: f64,
    pub net_spread_pct: f64,
    pub gross_spread_pct: f64,
    pub in_position: bool,
    pub signal_state: SignalState,
    pub mean: f64,
    pub std: f64,
    pub window_len: usize,
    pub timestamp: u64,
}

#[derive(Debug, Default)]
pub struct StatsBoard {
    stats: RwLock<HashMap<String, CurrentStats>>,
    ticks: RwLock<HashMap<(Exchange, String), Tick>>,
}

impl StatsBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tick(&self, tick: &Tick) {
        self.ticks
            .write()
            .insert((tick.exchange, tick.symbol.clone()), tick.clone());
    }

    /// Store the result of one sample together with the detector's state after it
    pub fn record(&self, update: &SpreadUpdate, signal_state: SignalState) {
        let stats = CurrentStats {
            symbol: update.sample.symbol.clone(),
            z_score: update.z_score,
            net_spread_pct: update.sample.net_spread_pct,
            gross_spread_pct: update.sample.gross_spread_pct,
            in_position: signal_state == SignalState::InPosition,
            signal_state,
            mean: update.mean,
            std: update.std,
            window_len: update.window_len,
            timestamp: update.sample.timestamp,
        };
        self.stats.write().insert(stats.symbol.clone(), stats);
    }

    pub fn current(&self, symbol: &str) -> Option<CurrentStats> {
        self.stats.read().get(symbol).cloned()
    }

    /// All symbols, sorted
    pub fn all(&self) -> Vec<CurrentStats> {
        let mut all: Vec<CurrentStats> = self.stats.read().values().cloned().collect();
        all.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        all
    }

    pub fn latest_tick(&self, exchange: Exchange, symbol: &str) -> Option<Tick> {
        self.ticks
            .read()
            .get(&(exchange, symbol.to_string()))
            .cloned()
    }

    pub fn remove(&self, symbol: &str) {
        self.stats.write().remove(symbol);
        self.ticks.write().retain(|(_, s), _| s != symbol);
    }
}
