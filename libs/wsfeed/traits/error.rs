use thiserror::Error;

/// Main error type for wsfeed
#[derive(Error, Debug)]
pub enum FeedError {
    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Connection closed by the remote side or the stream ended
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// Binary frame could not be decompressed or decoded as UTF-8
    #[error("Frame decode error: {0}")]
    Decode(String),

    /// Channel send error
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Reconnection budget exhausted
    #[error("Reconnection failed after {attempts} attempts: {reason}")]
    ReconnectionFailed { attempts: usize, reason: String },

    /// Connect or heartbeat timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

/// Result type for wsfeed operations
pub type Result<T> = std::result::Result<T, FeedError>;
