//! Spread & statistics engine
//!
//! Keeps the latest tick per (exchange, symbol) and one rolling window of
//! gross spreads per symbol. Only gross spreads ever enter a window; the net
//! figure is computed alongside and passed through.

use crate::domain::rolling_window::z_score;
use crate::domain::{
    gross_spread_pct, net_spread_pct, Exchange, RollingWindow, SpreadSample, SpreadUpdate, Tick,
};
use crate::infrastructure::MonitorConfig;
use std::collections::HashMap;
use tracing::debug;

// =============================================================================
// Fees
// =============================================================================

/// Round-trip fee per symbol, in percent
///
/// Default is one taker leg on each enabled exchange; per-symbol overrides
/// replace it entirely.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeSchedule {
    default_pct: f64,
    overrides: HashMap<String, f64>,
}

impl FeeSchedule {
    pub fn new(default_pct: f64) -> Self {
        Self {
            default_pct,
            overrides: HashMap::new(),
        }
    }

    /// Symbols are matched case-insensitively
    pub fn with_override(mut self, symbol: &str, fee_pct: f64) -> Self {
        self.overrides.insert(symbol.to_uppercase(), fee_pct);
        self
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        let default_pct = config
            .enabled_exchanges()
            .into_iter()
            .map(|e| config.exchange(e).fee_pct)
            .sum();
        config
            .fees
            .symbols
            .iter()
            .fold(Self::new(default_pct), |fees, (symbol, pct)| {
                fees.with_override(symbol, *pct)
            })
    }

    pub fn default_pct(&self) -> f64 {
        self.default_pct
    }

    pub fn fee_for(&self, symbol: &str) -> f64 {
        self.overrides
            .get(&symbol.to_uppercase())
            .copied()
            .unwrap_or(self.default_pct)
    }
}

// =============================================================================
// Engine
// =============================================================================

#[derive(Debug)]
struct SymbolBook {
    bingx: Option<Tick>,
    bybit: Option<Tick>,
    window: RollingWindow,
}

impl SymbolBook {
    fn new(window_size: usize) -> Self {
        Self {
            bingx: None,
            bybit: None,
            window: RollingWindow::new(window_size),
        }
    }

    fn slot(&mut self, exchange: Exchange) -> &mut Option<Tick> {
        match exchange {
            Exchange::BingX => &mut self.bingx,
            Exchange::Bybit => &mut self.bybit,
        }
    }
}

/// Per-symbol spread statistics
///
/// Owned by the single consumer task; no interior locking.
#[derive(Debug)]
pub struct SpreadEngine {
    window_size: usize,
    fees: FeeSchedule,
    books: HashMap<String, SymbolBook>,
}

impl SpreadEngine {
    pub fn new(window_size: usize, fees: FeeSchedule) -> Self {
        Self {
            window_size,
            fees,
            books: HashMap::new(),
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.trading.z_score_window, FeeSchedule::from_config(config))
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    fn book(&mut self, symbol: &str) -> &mut SymbolBook {
        let window_size = self.window_size;
        self.books
            .entry(symbol.to_string())
            .or_insert_with(|| SymbolBook::new(window_size))
    }

    /// Record `tick` and, once both exchanges have quoted the symbol, produce
    /// a fresh sample
    ///
    /// The new gross spread is pushed into the window before the Z-score is
    /// taken, so the returned statistics always include it.
    pub fn on_tick(&mut self, tick: Tick) -> Option<SpreadUpdate> {
        let fee = self.fees.fee_for(&tick.symbol);
        let symbol = tick.symbol.clone();
        let exchange = tick.exchange;
        let book = self.book(&symbol);
        *book.slot(exchange) = Some(tick);

        let (bingx, bybit) = match (&book.bingx, &book.bybit) {
            (Some(a), Some(b)) => (a, b),
            _ => return None,
        };

        let bingx_price = bingx.price();
        let bybit_price = bybit.price();
        let timestamp = bingx.timestamp.max(bybit.timestamp);
        let Some(gross) = gross_spread_pct(bingx_price, bybit_price) else {
            debug!(
                "[Engine] {} unusable prices bingx={} bybit={}",
                symbol, bingx_price, bybit_price
            );
            return None;
        };

        book.window.push(gross);
        let stats = book.window.stats()?;

        Some(SpreadUpdate {
            sample: SpreadSample {
                symbol,
                timestamp,
                bingx_price,
                bybit_price,
                gross_spread_pct: gross,
                net_spread_pct: net_spread_pct(gross, fee),
            },
            z_score: z_score(gross, &stats),
            mean: stats.mean,
            std: stats.std,
            window_len: stats.len,
        })
    }

    /// Seed a symbol's window with historical gross spreads (oldest first)
    ///
    /// Non-finite values are skipped. Returns how many were accepted.
    pub fn preload(&mut self, symbol: &str, gross_spreads: &[f64]) -> usize {
        let book = self.book(symbol);
        let mut accepted = 0;
        for value in gross_spreads.iter().copied().filter(|v| v.is_finite()) {
            book.window.push(value);
            accepted += 1;
        }
        accepted
    }

    pub fn latest_tick(&self, exchange: Exchange, symbol: &str) -> Option<&Tick> {
        let book = self.books.get(symbol)?;
        match exchange {
            Exchange::BingX => book.bingx.as_ref(),
            Exchange::Bybit => book.bybit.as_ref(),
        }
    }

    pub fn window(&self, symbol: &str) -> Option<&RollingWindow> {
        self.books.get(symbol).map(|b| &b.window)
    }

    /// Drop all state for a symbol
    pub fn forget(&mut self, symbol: &str) -> bool {
        self.books.remove(symbol).is_some()
    }
}
