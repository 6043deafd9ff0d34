//! Infrastructure Layer
//!
//! Configuration, logging, the distribution queue and the exchange adapters.
//! Depends on the domain layer, never on the application layer's internals.

pub mod client;
pub mod config;
pub mod logging;
pub mod queue;

pub use client::{adapter_for, BingxAdapter, BybitAdapter, ExchangeAdapter, NumberField, Normalized};
pub use config::{ConfigError, MonitorConfig};
pub use logging::init_tracing;
pub use queue::{DropOldestQueue, PushOutcome, QueueStats};
