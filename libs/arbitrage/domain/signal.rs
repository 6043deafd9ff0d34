//! Signal vocabulary
//!
//! The state machine itself lives in the application layer
//! ([`SignalDetector`](crate::application::SignalDetector)); these are the
//! values it produces.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-symbol detector state
///
/// `Warning`, `EntrySignaled` and `ExitSignaled` are pass-through states: a
/// transition reports them in [`SignalTransition::via`] but the detector
/// only ever rests in `Normal` or `InPosition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalState {
    Normal,
    Warning,
    EntrySignaled,
    InPosition,
    ExitSignaled,
}

impl SignalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalState::Normal => "NORMAL",
            SignalState::Warning => "WARNING",
            SignalState::EntrySignaled => "ENTRY_SIGNALED",
            SignalState::InPosition => "IN_POSITION",
            SignalState::ExitSignaled => "EXIT_SIGNALED",
        }
    }
}

impl fmt::Display for SignalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    Entry,
    Exit,
    Warning,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Entry => write!(f, "ENTRY"),
            SignalKind::Exit => write!(f, "EXIT"),
            SignalKind::Warning => write!(f, "WARNING"),
        }
    }
}

/// Why a signal fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalReason {
    /// Abnormal spread, profitable after fees
    Divergence,
    /// Abnormal spread that fees would eat
    Unprofitable,
    /// Spread back inside the exit band
    Converged,
    /// Spread blew through the stop band
    StopLoss,
    /// Position held longer than allowed
    MaxHoldTime,
}

impl SignalReason {
    /// Forced exits bypass the exit persistence requirement
    pub fn is_forced(&self) -> bool {
        matches!(self, SignalReason::StopLoss | SignalReason::MaxHoldTime)
    }
}

/// Trade legs implied by the spread's sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// BingX rich: sell BingX, buy Bybit
    SellBingxBuyBybit,
    /// BingX cheap: buy BingX, sell Bybit
    BuyBingxSellBybit,
}

impl Direction {
    pub fn from_gross(gross_spread_pct: f64) -> Self {
        if gross_spread_pct >= 0.0 {
            Direction::SellBingxBuyBybit
        } else {
            Direction::BuyBingxSellBybit
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::SellBingxBuyBybit => write!(f, "sell BingX / buy Bybit"),
            Direction::BuyBingxSellBybit => write!(f, "buy BingX / sell Bybit"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalTransition {
    pub from: SignalState,
    pub via: Option<SignalState>,
    pub to: SignalState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub kind: SignalKind,
    pub reason: SignalReason,
    pub direction: Option<Direction>,
    pub z_score: f64,
    pub gross_spread_pct: f64,
    pub net_spread_pct: f64,
    /// Sample timestamp (ms)
    pub timestamp: u64,
    pub transition: SignalTransition,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_from_gross() {
        assert_eq!(Direction::from_gross(0.4), Direction::SellBingxBuyBybit);
        assert_eq!(Direction::from_gross(-0.4), Direction::BuyBingxSellBybit);
    }

    #[test]
    fn test_state_labels() {
        assert_eq!(SignalState::EntrySignaled.to_string(), "ENTRY_SIGNALED");
        assert_eq!(
            serde_json::to_string(&SignalState::InPosition).unwrap(),
            "\"IN_POSITION\""
        );
    }
}
