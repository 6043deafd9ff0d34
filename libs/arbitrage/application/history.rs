//! Preload hook for rolling windows

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Source of historical gross spreads used to seed a symbol's window
#[async_trait]
pub trait SpreadHistorySource: Send + Sync {
    /// Up to `limit` most recent gross spreads (percent), oldest first
    async fn gross_spreads(&self, symbol: &str, limit: usize) -> Result<Vec<f64>>;
}

/// Fixed in-memory history
#[derive(Debug, Clone, Default)]
pub struct StaticHistory {
    samples: HashMap<String, Vec<f64>>,
}

impl StaticHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_samples(mut self, symbol: &str, samples: Vec<f64>) -> Self {
        self.samples.insert(symbol.to_string(), samples);
        self
    }
}

#[async_trait]
impl SpreadHistorySource for StaticHistory {
    async fn gross_spreads(&self, symbol: &str, limit: usize) -> Result<Vec<f64>> {
        let samples = self.samples.get(symbol).map(Vec::as_slice).unwrap_or(&[]);
        let start = samples.len().saturating_sub(limit);
        Ok(samples[start..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_history_keeps_newest() {
        let history = StaticHistory::new().with_samples("BTC/USDT", vec![1.0, 2.0, 3.0]);
        assert_eq!(history.gross_spreads("BTC/USDT", 2).await.unwrap(), vec![2.0, 3.0]);
        assert!(history.gross_spreads("ETH/USDT", 2).await.unwrap().is_empty());
    }
}
