//! Application Layer
//!
//! Everything on the consumer side of the distribution queue, plus the
//! orchestration that wires sessions, queue and sinks together.

pub mod detector;
pub mod engine;
pub mod events;
pub mod feed;
pub mod history;
pub mod monitor;
pub mod stats;

pub use detector::{SignalDetector, SignalThresholds};
pub use engine::{FeeSchedule, SpreadEngine};
pub use events::{
    ConnectionStatus, EventBus, EventKind, EventSink, FanoutSink, MonitorEvent, TracingSink,
};
pub use feed::ExchangeFeed;
pub use history::{SpreadHistorySource, StaticHistory};
pub use monitor::{run_consumer, ConsumerCommand, LiveMonitor, ProcessOutcome, SpreadPipeline};
pub use stats::{CurrentStats, StatsBoard};
