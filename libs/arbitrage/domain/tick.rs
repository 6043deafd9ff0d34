//! Canonical tick schema
//!
//! Every exchange adapter produces the same [`Tick`]; nothing downstream of
//! the normalizer ever sees an exchange-specific field name.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Exchange
// =============================================================================

/// Supported venues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    BingX,
    Bybit,
}

/// Quote assets recognised when splitting a concatenated symbol (longest first)
const QUOTE_ASSETS: &[&str] = &["USDT", "USDC", "USD", "BTC", "ETH"];

impl Exchange {
    pub fn all() -> &'static [Exchange] {
        &[Exchange::BingX, Exchange::Bybit]
    }

    /// Lower-case identifier used in config keys and events
    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::BingX => "bingx",
            Exchange::Bybit => "bybit",
        }
    }

    /// Exchange-native instrument name for a canonical `BASE/QUOTE` symbol
    ///
    /// `BTC/USDT` -> `BTC-USDT` on BingX, `BTCUSDT` on Bybit.
    pub fn native_symbol(&self, canonical: &str) -> String {
        match self {
            Exchange::BingX => canonical.replace('/', "-"),
            Exchange::Bybit => canonical.replace('/', ""),
        }
    }

    /// Canonical `BASE/QUOTE` symbol for an exchange-native instrument name
    pub fn canonical_symbol(&self, native: &str) -> String {
        match self {
            Exchange::BingX => native.replace('-', "/"),
            Exchange::Bybit => QUOTE_ASSETS
                .iter()
                .find_map(|quote| {
                    native
                        .strip_suffix(quote)
                        .filter(|base| !base.is_empty())
                        .map(|base| format!("{}/{}", base, quote))
                })
                .unwrap_or_else(|| native.to_string()),
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exchange::BingX => write!(f, "BingX"),
            Exchange::Bybit => write!(f, "Bybit"),
        }
    }
}

// =============================================================================
// Tick
// =============================================================================

/// Top-of-book quote from one exchange
///
/// Immutable once built. `bid` and `ask` are both finite and non-negative and
/// never both zero; [`Tick::new`] refuses anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub exchange: Exchange,
    /// Canonical `BASE/QUOTE` symbol
    pub symbol: String,
    pub bid: f64,
    pub ask: f64,
    /// Exchange event time (ms since epoch)
    pub timestamp: u64,
}

impl Tick {
    pub fn new(
        exchange: Exchange,
        symbol: impl Into<String>,
        bid: f64,
        ask: f64,
        timestamp: u64,
    ) -> Option<Self> {
        let valid = |v: f64| v.is_finite() && v >= 0.0;
        if !valid(bid) || !valid(ask) || (bid == 0.0 && ask == 0.0) {
            return None;
        }
        Some(Self {
            exchange,
            symbol: symbol.into(),
            bid,
            ask,
            timestamp,
        })
    }

    /// Reference price: mid when both sides are quoted, otherwise the quoted side
    pub fn price(&self) -> f64 {
        if self.bid > 0.0 && self.ask > 0.0 {
            (self.bid + self.ask) / 2.0
        } else {
            self.bid.max(self.ask)
        }
    }
}

// =============================================================================
// QuoteFields - documented price precedence
// =============================================================================

/// Price candidates pulled out of one ticker payload
///
/// Each side resolves to the first usable value of:
/// explicit field -> alternate field -> last traded price.
/// Zero counts as "not quoted"; a negative or non-finite value anywhere
/// makes the whole payload unusable.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QuoteFields {
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub alt_bid: Option<f64>,
    pub alt_ask: Option<f64>,
    pub last: Option<f64>,
}

impl QuoteFields {
    /// Resolve to `(bid, ask)`, or `None` when nothing usable is present
    pub fn resolve(&self) -> Option<(f64, f64)> {
        let all = [self.bid, self.ask, self.alt_bid, self.alt_ask, self.last];
        if all.iter().flatten().any(|v| !v.is_finite() || *v < 0.0) {
            return None;
        }

        let pick = |explicit: Option<f64>, alternate: Option<f64>| {
            [explicit, alternate, self.last]
                .into_iter()
                .flatten()
                .find(|v| *v > 0.0)
                .unwrap_or(0.0)
        };

        let bid = pick(self.bid, self.alt_bid);
        let ask = pick(self.ask, self.alt_ask);
        if bid == 0.0 && ask == 0.0 {
            None
        } else {
            Some((bid, ask))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_mapping() {
        assert_eq!(Exchange::BingX.native_symbol("BTC/USDT"), "BTC-USDT");
        assert_eq!(Exchange::Bybit.native_symbol("BTC/USDT"), "BTCUSDT");
        assert_eq!(Exchange::BingX.canonical_symbol("ETH-USDT"), "ETH/USDT");
        assert_eq!(Exchange::Bybit.canonical_symbol("ETHUSDT"), "ETH/USDT");
        assert_eq!(Exchange::Bybit.canonical_symbol("SOLUSDC"), "SOL/USDC");
        assert_eq!(Exchange::Bybit.canonical_symbol("ETHBTC"), "ETH/BTC");
        // Unknown quote: passed through untouched
        assert_eq!(Exchange::Bybit.canonical_symbol("FOOBAR"), "FOOBAR");
    }

    #[test]
    fn test_tick_validation() {
        assert!(Tick::new(Exchange::BingX, "BTC/USDT", 0.0, 0.0, 1).is_none());
        assert!(Tick::new(Exchange::BingX, "BTC/USDT", -1.0, 2.0, 1).is_none());
        assert!(Tick::new(Exchange::BingX, "BTC/USDT", f64::NAN, 2.0, 1).is_none());
        assert!(Tick::new(Exchange::BingX, "BTC/USDT", 0.0, 2.0, 1).is_some());
    }

    #[test]
    fn test_price_is_mid_or_quoted_side() {
        let both = Tick::new(Exchange::Bybit, "BTC/USDT", 100.0, 102.0, 1).unwrap();
        assert_eq!(both.price(), 101.0);
        let ask_only = Tick::new(Exchange::Bybit, "BTC/USDT", 0.0, 102.0, 1).unwrap();
        assert_eq!(ask_only.price(), 102.0);
    }

    #[test]
    fn test_precedence_explicit_then_alternate_then_last() {
        let fields = QuoteFields {
            bid: Some(10.0),
            ask: None,
            alt_bid: Some(11.0),
            alt_ask: Some(12.0),
            last: Some(13.0),
        };
        assert_eq!(fields.resolve(), Some((10.0, 12.0)));

        let last_only = QuoteFields {
            last: Some(13.0),
            ..Default::default()
        };
        assert_eq!(last_only.resolve(), Some((13.0, 13.0)));

        let zeros_fall_through = QuoteFields {
            bid: Some(0.0),
            ask: Some(0.0),
            last: Some(7.0),
            ..Default::default()
        };
        assert_eq!(zeros_fall_through.resolve(), Some((7.0, 7.0)));
    }

    #[test]
    fn test_nothing_usable() {
        assert_eq!(QuoteFields::default().resolve(), None);
        let negative = QuoteFields {
            bid: Some(-1.0),
            last: Some(5.0),
            ..Default::default()
        };
        assert_eq!(negative.resolve(), None);
    }
}
