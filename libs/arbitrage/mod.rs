//! Cross-exchange spread monitor
//!
//! Streams top-of-book quotes from BingX and Bybit, normalizes them into a
//! canonical [`Tick`], keeps a rolling Z-score baseline of the gross spread per
//! symbol and emits ENTRY / EXIT / WARNING signals when the spread is both
//! abnormal and profitable net of fees.
//!
//! Layers:
//! - [`domain`]: pure data and math (ticks, spreads, rolling window, signals)
//! - [`infrastructure`]: config, logging, the distribution queue and exchange adapters
//! - [`application`]: spread engine, signal detector, event sinks and the live monitor

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::{
    ConnectionStatus, CurrentStats, EventBus, EventKind, EventSink, ExchangeFeed, FanoutSink,
    FeeSchedule, LiveMonitor, MonitorEvent, SignalDetector, SignalThresholds, SpreadEngine,
    SpreadHistorySource, SpreadPipeline, StaticHistory, StatsBoard, TracingSink,
};
pub use domain::{
    Direction, Exchange, RollingWindow, Signal, SignalKind, SignalReason, SignalState,
    SignalTransition, SpreadSample, SpreadUpdate, Tick,
};
pub use error::{ArbitrageError, Result};
pub use infrastructure::{
    adapter_for, init_tracing, DropOldestQueue, ExchangeAdapter, MonitorConfig, Normalized,
    QueueStats,
};
