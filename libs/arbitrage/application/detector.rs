//! Signal detector
//!
//! Per-symbol state machine driven by each new [`SpreadUpdate`]:
//!
//! ```text
//!            |z| > entry, net > min (x min_entry_ticks)
//!   NORMAL ───────────── ENTRY_SIGNALED ─────────────> IN_POSITION
//!     ▲  │                                                  │
//!     │  └─ |z| > entry, net <= min: WARNING, stays NORMAL  │
//!     │                                                     │
//!     └──────────────── EXIT_SIGNALED <─────────────────────┘
//!        |z| < exit (x min_exit_ticks) | |z| > stop | age > max hold
//! ```
//!
//! Only `NORMAL` and `IN_POSITION` are resting states.

use crate::domain::{
    Direction, Signal, SignalKind, SignalReason, SignalState, SignalTransition, SpreadUpdate,
};
use crate::infrastructure::config::TradingConfig;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct SignalThresholds {
    pub z_score_entry: f64,
    pub z_score_exit: f64,
    pub stop_z_score: f64,
    /// Percent
    pub min_spread_pct: f64,
    pub max_position_time_ms: u64,
    pub min_entry_ticks: u32,
    pub min_exit_ticks: u32,
}

impl From<&TradingConfig> for SignalThresholds {
    fn from(config: &TradingConfig) -> Self {
        Self {
            z_score_entry: config.z_score_entry,
            z_score_exit: config.z_score_exit,
            stop_z_score: config.stop_z_score,
            min_spread_pct: config.min_spread_pct,
            max_position_time_ms: config.max_position_time_ms(),
            min_entry_ticks: config.min_entry_ticks.max(1),
            min_exit_ticks: config.min_exit_ticks.max(1),
        }
    }
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self::from(&TradingConfig::default())
    }
}

#[derive(Debug, Clone)]
struct SymbolSignalState {
    state: SignalState,
    entry_streak: u32,
    exit_streak: u32,
    /// Sample timestamp of the entry
    entered_at: u64,
    direction: Option<Direction>,
}

impl Default for SymbolSignalState {
    fn default() -> Self {
        Self {
            state: SignalState::Normal,
            entry_streak: 0,
            exit_streak: 0,
            entered_at: 0,
            direction: None,
        }
    }
}

/// Owned by the consumer task, like the engine
#[derive(Debug, Default)]
pub struct SignalDetector {
    thresholds: SignalThresholds,
    symbols: HashMap<String, SymbolSignalState>,
}

impl SignalDetector {
    pub fn new(thresholds: SignalThresholds) -> Self {
        Self {
            thresholds,
            symbols: HashMap::new(),
        }
    }

    pub fn thresholds(&self) -> &SignalThresholds {
        &self.thresholds
    }

    /// Resting state of `symbol` (`Normal` if never seen)
    pub fn state(&self, symbol: &str) -> SignalState {
        self.symbols
            .get(symbol)
            .map(|s| s.state)
            .unwrap_or(SignalState::Normal)
    }

    pub fn in_position(&self, symbol: &str) -> bool {
        self.state(symbol) == SignalState::InPosition
    }

    /// Direction of the open position, if any
    pub fn position_direction(&self, symbol: &str) -> Option<Direction> {
        self.symbols
            .get(symbol)
            .filter(|s| s.state == SignalState::InPosition)
            .and_then(|s| s.direction)
    }

    /// Drop a symbol's state, open position included
    ///
    /// Returns the state it was in, if it had been seen.
    pub fn forget(&mut self, symbol: &str) -> Option<SignalState> {
        self.symbols.remove(symbol).map(|s| s.state)
    }

    /// Advance `update`'s symbol by one sample
    pub fn evaluate(&mut self, update: &SpreadUpdate) -> Option<Signal> {
        let Self {
            thresholds,
            symbols,
        } = self;
        let entry = symbols.entry(update.symbol().to_string()).or_default();

        match entry.state {
            SignalState::InPosition => Self::evaluate_position(thresholds, entry, update),
            _ => Self::evaluate_flat(thresholds, entry, update),
        }
    }

    fn evaluate_flat(
        thresholds: &SignalThresholds,
        entry: &mut SymbolSignalState,
        update: &SpreadUpdate,
    ) -> Option<Signal> {
        entry.state = SignalState::Normal;
        if update.z_score.abs() <= thresholds.z_score_entry {
            entry.entry_streak = 0;
            return None;
        }

        let sample = &update.sample;
        if sample.net_spread_pct <= thresholds.min_spread_pct {
            entry.entry_streak = 0;
            return Some(signal(
                update,
                SignalKind::Warning,
                SignalReason::Unprofitable,
                Some(Direction::from_gross(sample.gross_spread_pct)),
                SignalState::Normal,
                SignalState::Warning,
                SignalState::Normal,
            ));
        }

        entry.entry_streak += 1;
        if entry.entry_streak < thresholds.min_entry_ticks {
            debug!(
                "[Detector] {} entry condition {}/{}",
                sample.symbol, entry.entry_streak, thresholds.min_entry_ticks
            );
            return None;
        }

        let direction = Direction::from_gross(sample.gross_spread_pct);
        entry.state = SignalState::InPosition;
        entry.entry_streak = 0;
        entry.exit_streak = 0;
        entry.entered_at = sample.timestamp;
        entry.direction = Some(direction);

        Some(signal(
            update,
            SignalKind::Entry,
            SignalReason::Divergence,
            Some(direction),
            SignalState::Normal,
            SignalState::EntrySignaled,
            SignalState::InPosition,
        ))
    }

    fn evaluate_position(
        thresholds: &SignalThresholds,
        entry: &mut SymbolSignalState,
        update: &SpreadUpdate,
    ) -> Option<Signal> {
        let abs_z = update.z_score.abs();
        let age_ms = update.sample.timestamp.saturating_sub(entry.entered_at);

        let reason = if abs_z > thresholds.stop_z_score {
            SignalReason::StopLoss
        } else if age_ms > thresholds.max_position_time_ms {
            SignalReason::MaxHoldTime
        } else if abs_z < thresholds.z_score_exit {
            entry.exit_streak += 1;
            if entry.exit_streak < thresholds.min_exit_ticks {
                return None;
            }
            SignalReason::Converged
        } else {
            entry.exit_streak = 0;
            return None;
        };

        let direction = entry.direction.take();
        entry.state = SignalState::Normal;
        entry.exit_streak = 0;
        entry.entry_streak = 0;

        Some(signal(
            update,
            SignalKind::Exit,
            reason,
            direction,
            SignalState::InPosition,
            SignalState::ExitSignaled,
            SignalState::Normal,
        ))
    }
}

fn signal(
    update: &SpreadUpdate,
    kind: SignalKind,
    reason: SignalReason,
    direction: Option<Direction>,
    from: SignalState,
    via: SignalState,
    to: SignalState,
) -> Signal {
    Signal {
        symbol: update.sample.symbol.clone(),
        kind,
        reason,
        direction,
        z_score: update.z_score,
        gross_spread_pct: update.sample.gross_spread_pct,
        net_spread_pct: update.sample.net_spread_pct,
        timestamp: update.sample.timestamp,
        transition: SignalTransition {
            from,
            via: Some(via),
            to,
        },
    }
}
