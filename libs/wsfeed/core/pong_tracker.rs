//! Heartbeat acknowledgment tracker
//!
//! Detects dead/zombie WebSocket connections. A connection is unhealthy once
//! a heartbeat has been outstanding, unacknowledged, for longer than the
//! configured timeout.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Sentinel for "nothing outstanding"
const NONE: u64 = u64::MAX;

/// Tracks heartbeat acknowledgments to detect dead connections
///
/// Timestamps are stored as milliseconds since an internal epoch so they fit
/// in atomics. Only the first unanswered heartbeat starts the clock: a second
/// ping sent before any ack arrives does not extend the deadline, which keeps
/// the check correct when the timeout is longer than the ping interval.
pub struct PongTracker {
    epoch: Instant,
    /// Send time of the oldest unacknowledged ping (ms since epoch)
    awaiting_since_ms: AtomicU64,
    timeout: Duration,
}

impl PongTracker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            epoch: Instant::now(),
            awaiting_since_ms: AtomicU64::new(NONE),
            timeout,
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Record that a heartbeat was just written to the socket
    pub fn record_ping_sent(&self) {
        let now = self.now_ms();
        // Keep the oldest outstanding ping
        let _ = self.awaiting_since_ms.compare_exchange(
            NONE,
            now,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Record a heartbeat acknowledgment (any form the exchange uses)
    pub fn record_pong_received(&self) {
        self.awaiting_since_ms.store(NONE, Ordering::Release);
    }

    /// `false` once a ping has waited longer than the timeout
    pub fn is_healthy(&self) -> bool {
        let since = self.awaiting_since_ms.load(Ordering::Acquire);
        if since == NONE {
            return true;
        }
        self.now_ms().saturating_sub(since) < self.timeout.as_millis() as u64
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_healthy_before_first_ping() {
        let tracker = PongTracker::new(Duration::from_secs(15));
        assert!(tracker.is_healthy());
    }

    #[test]
    fn test_healthy_after_pong() {
        let tracker = PongTracker::new(Duration::from_millis(20));
        tracker.record_ping_sent();
        tracker.record_pong_received();
        sleep(Duration::from_millis(30));
        assert!(tracker.is_healthy());
    }

    #[test]
    fn test_unhealthy_after_timeout() {
        let tracker = PongTracker::new(Duration::from_millis(50));
        tracker.record_ping_sent();
        assert!(tracker.is_healthy());
        sleep(Duration::from_millis(60));
        assert!(!tracker.is_healthy());
    }

    #[test]
    fn test_second_ping_does_not_extend_deadline() {
        let tracker = PongTracker::new(Duration::from_millis(50));
        tracker.record_ping_sent();
        sleep(Duration::from_millis(35));
        tracker.record_ping_sent();
        sleep(Duration::from_millis(25));
        assert!(!tracker.is_healthy());
    }

    #[test]
    fn test_pong_restarts_the_clock() {
        let tracker = PongTracker::new(Duration::from_millis(50));
        tracker.record_ping_sent();
        sleep(Duration::from_millis(35));
        tracker.record_pong_received();
        tracker.record_ping_sent();
        sleep(Duration::from_millis(25));
        assert!(tracker.is_healthy());
    }
}
