//! Integration tests for reconnection strategies
//!
//! These tests verify backoff sequences and that an exhausted budget leaves
//! the session FAILED with no further connection attempts.

mod common;

use common::{closed_port_url, wait_until};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use wsfeed::{
    ConnectionState, Dispatch, ExponentialBackoff, FrameHandler, ReconnectionStrategy,
    SessionBuilder, WsMessage,
};

#[test]
fn test_exponential_backoff_full_sequence() {
    verbose_println!("Testing exponential backoff full sequence...");

    let strategy = ExponentialBackoff::new(
        Duration::from_millis(100),
        2.0,
        Duration::from_secs(10),
        Some(6),
    );

    let expected_delays = [100, 200, 400, 800, 1600];

    for (i, &expected_ms) in expected_delays.iter().enumerate() {
        let failures = i + 1;
        let delay = strategy.next_delay(failures).unwrap();
        verbose_println!("  Failure {}: {:?}", failures, delay);
        assert_eq!(
            delay.as_millis(),
            expected_ms,
            "Unexpected delay after failure {}",
            failures
        );
    }

    assert!(
        strategy.next_delay(6).is_none(),
        "Should return None after max attempts"
    );
}

#[test]
fn test_exponential_backoff_with_capping() {
    verbose_println!("Testing exponential backoff with capping...");

    let strategy = ExponentialBackoff::new(
        Duration::from_millis(500),
        2.0,
        Duration::from_secs(2),
        None,
    );

    let delays: Vec<u64> = (1..=6)
        .map(|i| strategy.next_delay(i).unwrap().as_millis() as u64)
        .collect();

    verbose_println!("  Delays: {:?}", delays);

    assert_eq!(delays, vec![500, 1000, 2000, 2000, 2000, 2000]);
}

#[test]
fn test_default_monitor_schedule() {
    // reconnect_delay 5s, factor 2, cap 300s, 10 attempts
    let strategy = ExponentialBackoff::new(
        Duration::from_secs(5),
        2.0,
        Duration::from_secs(300),
        Some(10),
    );

    let secs: Vec<u64> = (1..10)
        .map(|i| strategy.next_delay(i).unwrap().as_secs())
        .collect();
    assert_eq!(secs, vec![5, 10, 20, 40, 80, 160, 300, 300, 300]);
    assert!(strategy.next_delay(10).is_none());
    assert_eq!(strategy.max_attempts(), Some(10));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_backoff_non_decreasing_and_bounded(
        initial_ms in 1u64..10_000,
        factor in 0.0f64..8.0,
        cap_ms in 1u64..600_000,
        failures in 1usize..200,
    ) {
        let strategy = ExponentialBackoff::new(
            Duration::from_millis(initial_ms),
            factor,
            Duration::from_millis(cap_ms),
            None,
        );

        let current = strategy.next_delay(failures).unwrap();
        let next = strategy.next_delay(failures + 1).unwrap();

        prop_assert!(next >= current);
        prop_assert!(next <= Duration::from_millis(cap_ms));
    }

    #[test]
    fn prop_budget_is_exact(max in 1usize..50) {
        let strategy = ExponentialBackoff::new(
            Duration::from_millis(1),
            2.0,
            Duration::from_millis(10),
            Some(max),
        );

        for failures in 1..max {
            prop_assert!(strategy.next_delay(failures).is_some());
        }
        prop_assert!(strategy.next_delay(max).is_none());
    }
}

#[derive(Default)]
struct StateLog(Mutex<Vec<(ConnectionState, String)>>);

impl FrameHandler for StateLog {
    fn subscriptions(&self) -> Vec<WsMessage> {
        Vec::new()
    }

    fn on_frame(&self, _payload: &str) -> Dispatch {
        Dispatch::Ignored
    }

    fn on_state_change(&self, state: ConnectionState, detail: &str) {
        self.0.lock().push((state, detail.to_string()));
    }
}

#[tokio::test]
async fn test_session_fails_after_budget_and_stops_trying() {
    verbose_println!("Testing FAILED after max attempts...");

    let log = Arc::new(StateLog::default());
    let session = SessionBuilder::new()
        .name("unreachable")
        .url(closed_port_url().await)
        .handler(Arc::clone(&log))
        .reconnect_strategy(ExponentialBackoff::new(
            Duration::from_millis(10),
            2.0,
            Duration::from_millis(40),
            Some(3),
        ))
        .spawn()
        .unwrap();

    assert!(
        wait_until(Duration::from_secs(3), || session.state() == ConnectionState::Failed).await
    );
    assert!(wait_until(Duration::from_secs(1), || session.is_finished()).await);

    let attempts = session.metrics().connect_attempts;
    assert_eq!(attempts, 3);

    // No further attempts once FAILED
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(session.metrics().connect_attempts, attempts);

    let states: Vec<ConnectionState> = log.0.lock().iter().map(|(s, _)| *s).collect();
    assert_eq!(
        states,
        vec![
            ConnectionState::Connecting,
            ConnectionState::Reconnecting,
            ConnectionState::Reconnecting,
            ConnectionState::Failed,
        ]
    );
    let detail = log.0.lock().last().map(|(_, d)| d.clone()).unwrap();
    verbose_println!("  final detail: {}", detail);
    assert!(detail.contains("3 attempts"));

    // stop after FAILED is harmless
    session.stop();
    session.join().await;
    assert_eq!(session.state(), ConnectionState::Failed);
}
