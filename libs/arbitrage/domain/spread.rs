use serde::{Deserialize, Serialize};

/// One cross-exchange spread observation for a symbol
///
/// Built from the latest tick of each exchange. All `*_pct` fields are in
/// percent units (0.3 means 0.3 %).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadSample {
    pub symbol: String,
    /// Newest of the two tick timestamps (ms)
    pub timestamp: u64,
    pub bingx_price: f64,
    pub bybit_price: f64,
    /// Signed: positive when BingX is richer
    pub gross_spread_pct: f64,
    /// `|gross| - total fee`; never fed into the statistics
    pub net_spread_pct: f64,
}

/// A sample together with the statistics it produced
///
/// `z_score`, `mean` and `std` are taken over the window *after* this
/// sample's gross spread was pushed into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadUpdate {
    pub sample: SpreadSample,
    pub z_score: f64,
    pub mean: f64,
    pub std: f64,
    pub window_len: usize,
}

impl SpreadUpdate {
    pub fn symbol(&self) -> &str {
        &self.sample.symbol
    }
}

/// `(bingx - bybit) / bingx * 100`, `None` when either price is unusable
pub fn gross_spread_pct(bingx_price: f64, bybit_price: f64) -> Option<f64> {
    let usable = |p: f64| p.is_finite() && p > 0.0;
    if !usable(bingx_price) || !usable(bybit_price) {
        return None;
    }
    let gross = (bingx_price - bybit_price) / bingx_price * 100.0;
    gross.is_finite().then_some(gross)
}

/// Profit left after paying `total_fee_pct`, for either trade direction
pub fn net_spread_pct(gross_spread_pct: f64, total_fee_pct: f64) -> f64 {
    gross_spread_pct.abs() - total_fee_pct
}
