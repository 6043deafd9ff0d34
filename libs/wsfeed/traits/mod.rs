//! # wsfeed traits
//!
//! Seams between the generic session machinery and protocol-specific code:
//!
//! - **FrameHandler**: subscriptions, per-frame dispatch and state notifications
//! - **ReconnectionStrategy**: how long to wait between failed connection attempts
//! - **FeedError**: error type shared by the whole library

pub mod error;
pub mod handler;
pub mod reconnect;

// Re-export commonly used types
pub use error::{FeedError, Result};
pub use handler::{Dispatch, FrameHandler, WsMessage};
pub use reconnect::{ExponentialBackoff, ReconnectionStrategy};
