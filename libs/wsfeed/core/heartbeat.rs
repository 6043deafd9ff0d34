//! Heartbeat mechanism for feed sessions
//!
//! # Architecture
//!
//! The heartbeat runs in a dedicated Tokio task, one per live connection:
//!
//! ```text
//! ┌─────────────────────┐
//! │  Heartbeat Task     │
//! │  (Tokio spawn)      │
//! │                     │
//! │  Every X interval:  │
//! │  1. Wait for tick   │
//! │  2. Send payload ───┼──> mpsc channel ──> Session loop ──> WebSocket
//! │  3. Repeat          │                        (records ping in PongTracker)
//! └─────────────────────┘
//! ```
//!
//! The task lives exactly as long as the connection it belongs to: the
//! [`HeartbeatHandle`] stops it on drop, so a reconnect or `stop()` never
//! leaves a stray timer behind.

use crate::traits::WsMessage;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

/// Heartbeat task that sends periodic messages
///
/// 1. Waits for the first interval (skips the immediate first tick)
/// 2. On each tick, pushes the payload to the session loop
/// 3. Exits on shutdown signal or when the session loop is gone
pub async fn heartbeat_task(
    interval: Duration,
    payload: WsMessage,
    heartbeat_tx: mpsc::Sender<WsMessage>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    // Skip the first immediate tick - wait for the first interval
    ticker.tick().await;
    // If we miss ticks due to slow processing, skip them rather than bursting
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    debug!("Heartbeat task started with interval: {:?}", interval);

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                debug!("Heartbeat task received shutdown signal");
                break;
            }
            _ = ticker.tick() => {
                // A full channel means the previous ping is still unsent; skip this one
                match heartbeat_tx.try_send(payload.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        debug!("Heartbeat channel full, skipping tick");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        debug!("Heartbeat channel closed, shutting down heartbeat task");
                        break;
                    }
                }
            }
        }
    }

    debug!("Heartbeat task exiting");
}

/// Owner of a running heartbeat task
pub struct HeartbeatHandle {
    handle: Option<JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl HeartbeatHandle {
    /// Stop the task and cancel its timer. Safe to call more than once.
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawn a heartbeat task
///
/// Returns the task handle and the receiver the session loop drains.
pub fn spawn_heartbeat(
    interval: Duration,
    payload: WsMessage,
) -> (HeartbeatHandle, mpsc::Receiver<WsMessage>) {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let (heartbeat_tx, heartbeat_rx) = mpsc::channel(1);

    let handle = tokio::spawn(heartbeat_task(interval, payload, heartbeat_tx, shutdown_rx));

    (
        HeartbeatHandle {
            handle: Some(handle),
            shutdown_tx: Some(shutdown_tx),
        },
        heartbeat_rx,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_heartbeat_ticks_after_interval() {
        let (mut handle, mut rx) =
            spawn_heartbeat(Duration::from_millis(20), WsMessage::Text("Ping".into()));

        let msg = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg, WsMessage::Text("Ping".into()));

        handle.stop();
        handle.stop();
    }

    #[tokio::test]
    async fn test_stop_closes_channel() {
        let (mut handle, mut rx) =
            spawn_heartbeat(Duration::from_secs(30), WsMessage::Text("Ping".into()));
        handle.stop();
        let next = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert!(next.is_none());
    }
}
