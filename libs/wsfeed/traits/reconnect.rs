use std::time::Duration;

/// Trait for defining reconnection strategies
///
/// Implement this trait to control how the session waits between
/// failed connection attempts and when it gives up.
pub trait ReconnectionStrategy: Send + Sync {
    /// Get the delay before the next connection attempt
    ///
    /// # Arguments
    /// * `failures` - Consecutive failed attempts so far (1 after the first failure)
    ///
    /// # Returns
    /// * `Some(duration)` - Wait this long, then try again
    /// * `None` - Budget exhausted, stop reconnecting
    fn next_delay(&self, failures: usize) -> Option<Duration>;

    /// Maximum number of consecutive failed attempts (None = unlimited)
    fn max_attempts(&self) -> Option<usize>;
}

/// Capped exponential backoff
///
/// The wait after the k-th consecutive failure is
/// `initial_delay * factor^(k-1)`, capped at `max_delay`. After `max_attempts`
/// consecutive failures no further attempt is made.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    factor: f64,
    max_delay: Duration,
    max_attempts: Option<usize>,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff strategy
    ///
    /// # Arguments
    /// * `initial_delay` - Delay after the first failure
    /// * `factor` - Growth factor per failure (values below 1.0 are treated as 1.0)
    /// * `max_delay` - Upper bound for any single delay
    /// * `max_attempts` - Maximum consecutive failures (None = unlimited)
    pub fn new(
        initial_delay: Duration,
        factor: f64,
        max_delay: Duration,
        max_attempts: Option<usize>,
    ) -> Self {
        let factor = if factor.is_finite() && factor >= 1.0 { factor } else { 1.0 };
        Self {
            initial_delay,
            factor,
            max_delay,
            max_attempts,
        }
    }

    /// Delay for the k-th consecutive failure, ignoring the attempt budget
    pub fn delay_for(&self, failures: usize) -> Duration {
        let exponent = failures.saturating_sub(1).min(i32::MAX as usize) as i32;
        let scaled = self.initial_delay.as_secs_f64() * self.factor.powi(exponent);
        let capped = scaled.min(self.max_delay.as_secs_f64());
        if capped.is_finite() {
            Duration::from_secs_f64(capped.max(0.0)).min(self.max_delay)
        } else {
            self.max_delay
        }
    }
}

impl ReconnectionStrategy for ExponentialBackoff {
    fn next_delay(&self, failures: usize) -> Option<Duration> {
        if let Some(max) = self.max_attempts {
            if failures >= max {
                return None;
            }
        }
        Some(self.delay_for(failures))
    }

    fn max_attempts(&self) -> Option<usize> {
        self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_delay_is_initial() {
        let backoff = ExponentialBackoff::new(
            Duration::from_millis(100),
            2.0,
            Duration::from_secs(10),
            None,
        );
        assert_eq!(backoff.next_delay(1), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_delay(2), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next_delay(3), Some(Duration::from_millis(400)));
    }

    #[test]
    fn test_budget_exhausted() {
        let backoff = ExponentialBackoff::new(
            Duration::from_millis(10),
            2.0,
            Duration::from_secs(1),
            Some(3),
        );
        assert!(backoff.next_delay(1).is_some());
        assert!(backoff.next_delay(2).is_some());
        assert!(backoff.next_delay(3).is_none());
    }

    #[test]
    fn test_factor_below_one_is_flat() {
        let backoff = ExponentialBackoff::new(
            Duration::from_millis(250),
            0.5,
            Duration::from_secs(1),
            None,
        );
        for failures in 1..20 {
            assert_eq!(backoff.next_delay(failures), Some(Duration::from_millis(250)));
        }
    }

    #[test]
    fn test_huge_exponent_is_capped() {
        let backoff = ExponentialBackoff::new(
            Duration::from_secs(5),
            2.0,
            Duration::from_secs(300),
            None,
        );
        assert_eq!(backoff.next_delay(10_000), Some(Duration::from_secs(300)));
    }
}
