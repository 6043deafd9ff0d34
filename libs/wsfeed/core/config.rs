use crate::traits::*;
use std::time::Duration;

/// Configuration for one [`FeedSession`](crate::core::session::FeedSession)
///
/// Built by [`SessionBuilder`](crate::core::builder::SessionBuilder); the
/// session task owns it for its whole lifetime.
pub struct SessionConfig {
    /// Name used in log lines and status details (e.g. "bingx")
    pub(crate) name: String,

    /// WebSocket URL (wss:// or ws://)
    pub(crate) url: String,

    /// Optional heartbeat configuration (interval, payload)
    pub(crate) heartbeat: Option<(Duration, WsMessage)>,

    /// Maximum wait for a heartbeat acknowledgment before the connection is
    /// considered dead
    pub(crate) pong_timeout: Duration,

    /// Maximum time for the TCP/TLS/WebSocket handshake
    pub(crate) connect_timeout: Duration,

    /// A connection that stays up at least this long resets the failure count
    pub(crate) stable_after: Duration,

    /// Reconnection strategy
    pub(crate) reconnect_strategy: Box<dyn ReconnectionStrategy>,
}

impl SessionConfig {
    /// Get the session name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a reference to the URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Check if heartbeat is configured
    pub fn has_heartbeat(&self) -> bool {
        self.heartbeat.is_some()
    }

    /// Heartbeat acknowledgment timeout
    pub fn pong_timeout(&self) -> Duration {
        self.pong_timeout
    }

    /// Handshake timeout
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Maximum consecutive failed attempts, if bounded
    pub fn max_attempts(&self) -> Option<usize> {
        self.reconnect_strategy.max_attempts()
    }
}
