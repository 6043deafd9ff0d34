use crate::infrastructure::config::ConfigError;
use thiserror::Error;

/// Errors surfaced by the monitor's public API
///
/// Ingestion and analysis never return these; only startup and explicit
/// control calls do.
#[derive(Error, Debug)]
pub enum ArbitrageError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Feed error: {0}")]
    Feed(#[from] wsfeed::FeedError),

    #[error("Invalid state: {0}")]
    State(String),
}

pub type Result<T> = std::result::Result<T, ArbitrageError>;
