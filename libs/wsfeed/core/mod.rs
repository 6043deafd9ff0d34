//! # wsfeed core
//!
//! Session machinery: configuration, the connection state machine, the
//! heartbeat task, pong tracking, frame decoding and the session loop itself.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use wsfeed::{ExponentialBackoff, SessionBuilder, WsMessage};
//!
//! let session = SessionBuilder::new()
//!     .name("bybit")
//!     .url("wss://stream.bybit.com/v5/public/linear")
//!     .handler(Arc::new(MyHandler))
//!     .heartbeat(Duration::from_secs(20), WsMessage::Text(r#"{"op":"ping"}"#.into()))
//!     .pong_timeout(Duration::from_secs(60))
//!     .reconnect_strategy(ExponentialBackoff::new(
//!         Duration::from_secs(5),
//!         2.0,
//!         Duration::from_secs(300),
//!         Some(10),
//!     ))
//!     .spawn()?;
//!
//! // ... later, from anywhere, any number of times
//! session.stop();
//! session.join().await;
//! ```

pub mod builder;
pub mod codec;
pub mod config;
pub mod connection_state;
pub mod heartbeat;
pub mod pong_tracker;
pub mod session;

// Re-export main types
pub use builder::{states, SessionBuilder};
pub use config::SessionConfig;
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
pub use pong_tracker::PongTracker;
pub use session::{FeedSession, SessionMetrics};
