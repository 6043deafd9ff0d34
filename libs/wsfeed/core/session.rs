use crate::core::codec::decode_frame;
use crate::core::config::SessionConfig;
use crate::core::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use crate::core::heartbeat::spawn_heartbeat;
use crate::core::pong_tracker::PongTracker;
use crate::traits::*;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;

/// Internal command messages for session control
#[derive(Debug)]
enum SessionCommand {
    /// Send a message to the WebSocket
    Send(WsMessage),
}

/// Point-in-time snapshot of a session's counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMetrics {
    pub state: ConnectionState,
    pub frames_received: u64,
    pub frames_sent: u64,
    pub connect_attempts: u64,
    pub reconnects: u64,
    pub decode_errors: u64,
    pub heartbeats_acked: u64,
}

/// One long-lived streaming connection to a single exchange
///
/// The session runs as its own Tokio task and owns its socket, heartbeat
/// timer and reconnect state exclusively:
/// - connects, then sends the handler's subscription messages
/// - sends the configured heartbeat and tears the socket down when the
///   acknowledgment does not arrive within `pong_timeout`
/// - decodes text and GZIP binary frames and hands payloads to the handler
/// - reconnects with the configured backoff and gives up (`FAILED`) once the
///   strategy is exhausted
///
/// Every state change is reported through
/// [`FrameHandler::on_state_change`]; nothing here is fatal to the process.
pub struct FeedSession {
    name: String,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    shutdown_tx: watch::Sender<bool>,
    command_tx: mpsc::UnboundedSender<SessionCommand>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl FeedSession {
    /// Spawn the session task. Called by the builder's `spawn()`.
    pub(crate) fn spawn(config: SessionConfig, handler: Arc<dyn FrameHandler>) -> Self {
        let name = config.name.clone();
        let state = Arc::new(AtomicConnectionState::new(ConnectionState::Disconnected));
        let metrics = Arc::new(AtomicMetrics::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let task = {
            let state = Arc::clone(&state);
            let metrics = Arc::clone(&metrics);
            tokio::spawn(async move {
                run_session(config, handler, state, metrics, shutdown_rx, command_rx).await;
            })
        };

        Self {
            name,
            state,
            metrics,
            shutdown_tx,
            command_tx,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get current connection state
    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn metrics(&self) -> SessionMetrics {
        SessionMetrics {
            state: self.state.get(),
            frames_received: self.metrics.frames_received(),
            frames_sent: self.metrics.frames_sent(),
            connect_attempts: self.metrics.connect_attempts(),
            reconnects: self.metrics.reconnects(),
            decode_errors: self.metrics.decode_errors(),
            heartbeats_acked: self.metrics.heartbeats_acked(),
        }
    }

    /// Queue a message for the live connection
    ///
    /// Messages still queued when a connection drops are discarded; the
    /// handler's `subscriptions()` is replayed on every reconnect instead.
    pub fn send(&self, message: WsMessage) -> Result<()> {
        if self.is_finished() {
            return Err(FeedError::ConnectionClosed(format!(
                "session {} is no longer running",
                self.name
            )));
        }
        self.command_tx
            .send(SessionCommand::Send(message))
            .map_err(|e| FeedError::ChannelSend(e.to_string()))
    }

    /// Request shutdown
    ///
    /// Closes the socket and cancels any pending heartbeat or backoff timer.
    /// Callable at any time, any number of times.
    pub fn stop(&self) {
        let was_stopped = self.shutdown_tx.send_replace(true);
        if !was_stopped {
            info!("[{}] Stop requested", self.name);
        }
    }

    /// Whether the session task has exited (stopped or failed)
    pub fn is_finished(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map(|handle| handle.is_finished())
            .unwrap_or(true)
    }

    /// Wait for the session task to exit
    ///
    /// Does not request shutdown by itself; pair with [`stop`](Self::stop).
    pub async fn join(&self) {
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("[{}] Session task ended abnormally: {}", self.name, e);
            }
        }
    }
}

/// Resolves once shutdown was requested or the owning [`FeedSession`] is gone
async fn shutdown_requested(shutdown_rx: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown_rx.borrow_and_update() {
            return;
        }
        if shutdown_rx.changed().await.is_err() {
            return;
        }
    }
}

fn transition(
    name: &str,
    state: &AtomicConnectionState,
    handler: &dyn FrameHandler,
    next: ConnectionState,
    detail: &str,
) {
    let previous = state.set(next);
    debug!("[{}] {} -> {} ({})", name, previous, next, detail);
    handler.on_state_change(next, detail);
}

/// Main session task loop
async fn run_session(
    config: SessionConfig,
    handler: Arc<dyn FrameHandler>,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    mut shutdown_rx: watch::Receiver<bool>,
    mut command_rx: mpsc::UnboundedReceiver<SessionCommand>,
) {
    let name = config.name.as_str();
    // Consecutive failed attempts; reset by a connection that stayed up
    let mut failures: usize = 0;
    let mut ever_connected = false;

    transition(name, &state, &*handler, ConnectionState::Connecting, "connecting");

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        metrics.increment_connect_attempts();
        debug!("[{}] Connecting to {}", name, config.url);

        let connect =
            tokio::time::timeout(config.connect_timeout, connect_async(config.url.as_str()));
        let outcome = tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown_rx) => break,
            res = connect => res,
        };

        let failure = match outcome {
            Ok(Ok((ws_stream, _))) => {
                info!("[{}] Connected to {}", name, config.url);
                if ever_connected {
                    metrics.increment_reconnects();
                }
                ever_connected = true;
                transition(name, &state, &*handler, ConnectionState::Connected, "connected");

                let connected_at = Instant::now();
                let result = handle_connection(
                    ws_stream,
                    &config,
                    &*handler,
                    &metrics,
                    &mut shutdown_rx,
                    &mut command_rx,
                )
                .await;

                if connected_at.elapsed() >= config.stable_after {
                    failures = 0;
                }

                match result {
                    Ok(()) => break,
                    Err(e) => {
                        warn!("[{}] Connection lost: {}", name, e);
                        e
                    }
                }
            }
            Ok(Err(e)) => {
                error!("[{}] Failed to connect: {}", name, e);
                FeedError::WebSocket(e.to_string())
            }
            Err(_) => {
                error!("[{}] Handshake timed out after {:?}", name, config.connect_timeout);
                FeedError::Timeout(format!("handshake exceeded {:?}", config.connect_timeout))
            }
        };

        failures += 1;

        let Some(delay) = config.reconnect_strategy.next_delay(failures) else {
            let detail = FeedError::ReconnectionFailed {
                attempts: failures,
                reason: failure.to_string(),
            }
            .to_string();
            error!("[{}] {}", name, detail);
            transition(name, &state, &*handler, ConnectionState::Failed, &detail);
            info!("[{}] Session task exiting", name);
            return;
        };

        let detail = format!("{}; retrying in {:?} (failure {})", failure, delay, failures);
        info!("[{}] Reconnecting in {:?} (failure {})", name, delay, failures);
        transition(name, &state, &*handler, ConnectionState::Reconnecting, &detail);

        tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown_rx) => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    transition(name, &state, &*handler, ConnectionState::Disconnected, "stopped");
    info!("[{}] Session task exiting", name);
}

/// Drive one live connection until shutdown (`Ok`) or failure (`Err`)
async fn handle_connection(
    ws_stream: WsStream,
    config: &SessionConfig,
    handler: &dyn FrameHandler,
    metrics: &AtomicMetrics,
    shutdown_rx: &mut watch::Receiver<bool>,
    command_rx: &mut mpsc::UnboundedReceiver<SessionCommand>,
) -> Result<()> {
    let name = config.name.as_str();
    let (mut write, mut read) = ws_stream.split();

    // Anything queued for a previous connection is stale
    while command_rx.try_recv().is_ok() {}

    for sub in handler.subscriptions() {
        send(&mut write, &sub).await?;
        metrics.increment_sent();
        debug!("[{}] Sent subscription message", name);
    }

    // Dropping the handle stops the task on every exit path
    let (_heartbeat, mut heartbeat_rx) = match &config.heartbeat {
        Some((interval, payload)) => {
            let (handle, rx) = spawn_heartbeat(*interval, payload.clone());
            (Some(handle), Some(rx))
        }
        None => (None, None),
    };

    let tracker = PongTracker::new(config.pong_timeout);
    let mut liveness = tokio::time::interval(liveness_check_period(config.pong_timeout));
    liveness.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = shutdown_requested(shutdown_rx) => {
                debug!("[{}] Shutdown requested, closing socket", name);
                let _ = write.close().await;
                return Ok(());
            }

            msg = read.next() => {
                handle_incoming(name, msg, handler, metrics, &tracker, &mut write).await?;
            }

            Some(SessionCommand::Send(msg)) = command_rx.recv() => {
                send(&mut write, &msg).await?;
                metrics.increment_sent();
            }

            Some(ping) = next_heartbeat(&mut heartbeat_rx) => {
                send(&mut write, &ping).await.map_err(|e| {
                    FeedError::WebSocket(format!("Failed to send heartbeat: {}", e))
                })?;
                metrics.increment_sent();
                tracker.record_ping_sent();
                debug!("[{}] Heartbeat sent", name);
            }

            _ = liveness.tick() => {
                if !tracker.is_healthy() {
                    return Err(FeedError::Timeout(format!(
                        "no heartbeat acknowledgment within {:?}",
                        tracker.timeout()
                    )));
                }
            }
        }
    }
}

async fn handle_incoming(
    name: &str,
    msg: Option<std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>,
    handler: &dyn FrameHandler,
    metrics: &AtomicMetrics,
    tracker: &PongTracker,
    write: &mut WsWrite,
) -> Result<()> {
    let msg = match msg {
        Some(Ok(msg)) => msg,
        Some(Err(e)) => return Err(FeedError::WebSocket(e.to_string())),
        None => return Err(FeedError::ConnectionClosed("stream ended".into())),
    };

    match msg {
        Message::Close(frame) => {
            return Err(FeedError::ConnectionClosed(format!(
                "server sent close frame: {:?}",
                frame
            )));
        }
        // Protocol-level pong counts as an acknowledgment too
        Message::Pong(_) => {
            tracker.record_pong_received();
            metrics.increment_heartbeats_acked();
            return Ok(());
        }
        _ => {}
    }

    metrics.increment_received();

    let payload = match decode_frame(msg) {
        Ok(Some(payload)) => payload,
        Ok(None) => return Ok(()),
        Err(e) => {
            metrics.increment_decode_errors();
            warn!("[{}] Dropping undecodable frame: {}", name, e);
            return Ok(());
        }
    };

    match handler.on_frame(&payload) {
        Dispatch::Forwarded | Dispatch::Ignored => {}
        Dispatch::HeartbeatAck => {
            tracker.record_pong_received();
            metrics.increment_heartbeats_acked();
        }
        Dispatch::Reply(reply) => {
            send(write, &reply).await?;
            metrics.increment_sent();
            debug!("[{}] Replied to server heartbeat", name);
        }
    }

    Ok(())
}

async fn next_heartbeat(rx: &mut Option<mpsc::Receiver<WsMessage>>) -> Option<WsMessage> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn liveness_check_period(pong_timeout: Duration) -> Duration {
    (pong_timeout / 4).clamp(Duration::from_millis(10), Duration::from_secs(1))
}

async fn send(write: &mut WsWrite, msg: &WsMessage) -> Result<()> {
    write
        .send(to_tungstenite(msg))
        .await
        .map_err(|e| FeedError::WebSocket(e.to_string()))
}

/// Convert WsMessage to tungstenite Message
fn to_tungstenite(msg: &WsMessage) -> Message {
    match msg {
        WsMessage::Text(text) => Message::Text(text.clone()),
        WsMessage::Binary(data) => Message::Binary(data.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_liveness_period_is_clamped() {
        assert_eq!(
            liveness_check_period(Duration::from_millis(8)),
            Duration::from_millis(10)
        );
        assert_eq!(
            liveness_check_period(Duration::from_millis(400)),
            Duration::from_millis(100)
        );
        assert_eq!(liveness_check_period(Duration::from_secs(60)), Duration::from_secs(1));
    }

    #[test]
    fn test_ws_message_conversion() {
        assert_eq!(
            to_tungstenite(&WsMessage::Text("Ping".into())),
            Message::Text("Ping".into())
        );
        assert_eq!(
            to_tungstenite(&WsMessage::Binary(vec![1, 2])),
            Message::Binary(vec![1, 2])
        );
    }
}
