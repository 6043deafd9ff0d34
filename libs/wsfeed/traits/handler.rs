//! Frame handling seam
//!
//! Every decoded frame read from the socket is handed to a [`FrameHandler`].
//! The handler tells the session what the frame was:
//!
//! ```text
//! Socket ──frame──> decode (text / gzip) ──payload──> FrameHandler::on_frame
//!                                                          │
//!                     ┌────────────────────┬───────────────┼──────────────┐
//!                     ▼                    ▼               ▼              ▼
//!                Forwarded           HeartbeatAck      Reply(msg)      Ignored
//!            (handler consumed)   (pong tracker hit)  (sent back)   (dropped)
//! ```

use crate::core::connection_state::ConnectionState;

/// Outbound/inbound WebSocket payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
}

impl WsMessage {
    /// Get the message as text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            WsMessage::Text(s) => Some(s),
            WsMessage::Binary(_) => None,
        }
    }

    /// Get the message as binary, if it is binary
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            WsMessage::Text(_) => None,
            WsMessage::Binary(b) => Some(b),
        }
    }
}

/// What the handler did with a decoded frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The frame carried data and the handler took it
    Forwarded,
    /// The frame acknowledged our heartbeat
    HeartbeatAck,
    /// The server pinged us; send this message back immediately
    Reply(WsMessage),
    /// Nothing useful in the frame (acks, unknown topics, ...)
    Ignored,
}

/// Protocol-specific behaviour plugged into a session
///
/// `on_frame` runs on the session task for every decoded frame, in arrival
/// order, so it must not block. Push work onto a queue instead.
pub trait FrameHandler: Send + Sync + 'static {
    /// Frames to send right after every successful (re)connect
    fn subscriptions(&self) -> Vec<WsMessage>;

    /// Classify and consume one decoded payload
    fn on_frame(&self, payload: &str) -> Dispatch;

    /// Called on every connection state transition
    fn on_state_change(&self, _state: ConnectionState, _detail: &str) {}
}
