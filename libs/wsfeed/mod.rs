//! # wsfeed
//!
//! Streaming market-data session library. One [`FeedSession`] owns exactly one
//! WebSocket connection and drives it through its whole lifecycle:
//!
//! - **Connect / subscribe**: subscription frames are re-sent on every (re)connect
//! - **Heartbeat**: periodic application-level ping with pong-timeout detection
//! - **Framing**: text frames and GZIP-compressed binary frames are decoded before dispatch
//! - **Reconnect**: capped exponential backoff, `Failed` after too many consecutive failures
//! - **Stop**: idempotent, cancels heartbeat and backoff timers and closes the socket
//!
//! The library knows nothing about exchanges. Protocol specifics live behind the
//! [`FrameHandler`] trait.

pub mod core;
pub mod traits;

// Re-export all traits
pub use traits::*;

// Re-export core session functionality
pub use self::core::{
    builder::{states, SessionBuilder},
    codec::decode_frame,
    config::SessionConfig,
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState},
    pong_tracker::PongTracker,
    session::{FeedSession, SessionMetrics},
};

/// Type alias for Result with FeedError
pub type Result<T> = std::result::Result<T, traits::FeedError>;
