use std::collections::VecDeque;

/// Mean / standard deviation of a window snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    pub len: usize,
}

/// Bounded FIFO of the most recent gross-spread samples for one symbol
///
/// Statistics are recomputed from the full snapshot on each call; the window
/// is small (tens of samples) so there is no streaming formula to drift.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl RollingWindow {
    /// `capacity` is clamped to at least 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, returning the evicted oldest one when full
    pub fn push(&mut self, value: f64) -> Option<f64> {
        let evicted = if self.values.len() == self.capacity {
            self.values.pop_front()
        } else {
            None
        };
        self.values.push_back(value);
        evicted
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.values.iter()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// `None` for an empty window
    pub fn stats(&self) -> Option<WindowStats> {
        if self.values.is_empty() {
            return None;
        }
        let n = self.values.len() as f64;
        let mean = self.values.iter().sum::<f64>() / n;
        let variance = self.values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Some(WindowStats {
            mean,
            std: variance.sqrt(),
            len: self.values.len(),
        })
    }

    /// Z-score of `value` against the current window
    ///
    /// 0 for an empty window or a (numerically) zero standard deviation.
    pub fn z_score(&self, value: f64) -> f64 {
        match self.stats() {
            Some(stats) => z_score(value, &stats),
            None => 0.0,
        }
    }
}

/// Z-score with the zero-variance guard applied
pub fn z_score(value: f64, stats: &WindowStats) -> f64 {
    // Rounding noise on identical samples must not turn into a huge Z
    let tolerance = 16.0 * f64::EPSILON * stats.mean.abs().max(1.0);
    if !stats.std.is_finite() || stats.std <= tolerance {
        return 0.0;
    }
    let z = (value - stats.mean) / stats.std;
    if z.is_finite() {
        z
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_eviction() {
        let mut window = RollingWindow::new(3);
        assert_eq!(window.push(1.0), None);
        assert_eq!(window.push(2.0), None);
        assert_eq!(window.push(3.0), None);
        assert!(window.is_full());
        assert_eq!(window.push(4.0), Some(1.0));
        assert_eq!(window.iter().copied().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_population_stats() {
        let mut window = RollingWindow::new(8);
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            window.push(v);
        }
        let stats = window.stats().unwrap();
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.std, 2.0);
        assert_eq!(window.z_score(9.0), 2.0);
    }

    #[test]
    fn test_identical_values_give_zero_z() {
        let mut window = RollingWindow::new(20);
        for _ in 0..20 {
            window.push(0.1);
        }
        assert_eq!(window.z_score(0.1), 0.0);
        window.push(0.1);
        assert_eq!(window.z_score(0.1), 0.0);
    }

    #[test]
    fn test_single_and_empty_window() {
        let mut window = RollingWindow::new(5);
        assert_eq!(window.z_score(1.0), 0.0);
        assert!(window.stats().is_none());
        window.push(3.0);
        assert_eq!(window.z_score(3.0), 0.0);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut window = RollingWindow::new(0);
        window.push(1.0);
        assert_eq!(window.push(2.0), Some(1.0));
        assert_eq!(window.capacity(), 1);
    }
}
