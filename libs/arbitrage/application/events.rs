//! Event sink contract
//!
//! The monitor publishes four kinds of events and never reads anything back
//! from whoever consumes them:
//!
//! ```text
//!  ExchangeFeed ──connection status──┐
//!                                    ├──> EventSink ──> TracingSink (logs)
//!  SpreadPipeline ──tick / spread────┤           └────> EventBus ──> subscribers
//!                 ──signal───────────┘                   (typed channels)
//! ```

use crate::domain::{Exchange, Signal, SignalKind, SpreadUpdate, Tick};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use wsfeed::ConnectionState;

/// Connection lifecycle change of one exchange session
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionStatus {
    pub exchange: Exchange,
    pub state: ConnectionState,
    pub detail: String,
    /// Local time of the transition (ms)
    pub timestamp: u64,
}

/// Consumer of monitor output
///
/// Callbacks run on the thread that produced the event (a session task for
/// connection status, the consumer task for everything else), so they must
/// return quickly.
pub trait EventSink: Send + Sync + 'static {
    fn on_tick(&self, _tick: &Tick) {}

    fn on_spread(&self, _update: &SpreadUpdate) {}

    fn on_signal(&self, _signal: &Signal) {}

    fn on_connection_status(&self, _status: &ConnectionStatus) {}
}

// =============================================================================
// Typed pub/sub
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Tick,
    Spread,
    Signal,
    ConnectionStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    Tick(Tick),
    Spread(SpreadUpdate),
    Signal(Signal),
    ConnectionStatus(ConnectionStatus),
}

impl MonitorEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            MonitorEvent::Tick(_) => EventKind::Tick,
            MonitorEvent::Spread(_) => EventKind::Spread,
            MonitorEvent::Signal(_) => EventKind::Signal,
            MonitorEvent::ConnectionStatus(_) => EventKind::ConnectionStatus,
        }
    }
}

struct Subscriber {
    id: u64,
    kinds: Vec<EventKind>,
    tx: Sender<MonitorEvent>,
}

impl Subscriber {
    fn wants(&self, kind: EventKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }
}

/// Default per-subscriber buffer
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 1024;

/// Fan-out of events to any number of independent subscribers
///
/// Each subscriber gets its own bounded channel filtered by event kind. A
/// subscriber that falls behind loses the events published while its buffer
/// is full; publishing never waits. Dropping the receiver unsubscribes.
pub struct EventBus {
    subscribers: RwLock<Vec<Subscriber>>,
    next_id: AtomicU64,
    capacity: usize,
    dropped: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SUBSCRIBER_CAPACITY)
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// `capacity` is clamped to at least 1
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
            capacity: capacity.max(1),
            dropped: AtomicU64::new(0),
        }
    }

    /// Receive every event whose kind is in `kinds` (all kinds when empty)
    pub fn subscribe(&self, kinds: &[EventKind]) -> Receiver<MonitorEvent> {
        let (tx, rx) = bounded(self.capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.write().push(Subscriber {
            id,
            kinds: kinds.to_vec(),
            tx,
        });
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Events lost to full subscriber buffers
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn publish(&self, event: MonitorEvent) {
        let kind = event.kind();
        let mut gone = Vec::new();
        {
            let subscribers = self.subscribers.read();
            for sub in subscribers.iter().filter(|s| s.wants(kind)) {
                match sub.tx.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                        warn!(
                            "[EventBus] Subscriber {} full, dropped {:?} ({} so far)",
                            sub.id, kind, dropped
                        );
                    }
                    Err(TrySendError::Disconnected(_)) => gone.push(sub.id),
                }
            }
        }

        if !gone.is_empty() {
            self.subscribers.write().retain(|s| !gone.contains(&s.id));
            debug!("[EventBus] Pruned {} closed subscriber(s)", gone.len());
        }
    }
}

impl EventSink for EventBus {
    fn on_tick(&self, tick: &Tick) {
        self.publish(MonitorEvent::Tick(tick.clone()));
    }

    fn on_spread(&self, update: &SpreadUpdate) {
        self.publish(MonitorEvent::Spread(update.clone()));
    }

    fn on_signal(&self, signal: &Signal) {
        self.publish(MonitorEvent::Signal(signal.clone()));
    }

    fn on_connection_status(&self, status: &ConnectionStatus) {
        self.publish(MonitorEvent::ConnectionStatus(status.clone()));
    }
}

// =============================================================================
// Built-in sinks
// =============================================================================

/// Logs every event through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn on_tick(&self, tick: &Tick) {
        debug!(
            "[Tick] {} {} bid={} ask={} ts={}",
            tick.exchange, tick.symbol, tick.bid, tick.ask, tick.timestamp
        );
    }

    fn on_spread(&self, update: &SpreadUpdate) {
        debug!(
            "[Spread] {} gross={:.4}% net={:.4}% z={:.2} (n={})",
            update.symbol(),
            update.sample.gross_spread_pct,
            update.sample.net_spread_pct,
            update.z_score,
            update.window_len
        );
    }

    fn on_signal(&self, signal: &Signal) {
        match signal.kind {
            SignalKind::Warning => warn!(
                "[Signal] WARNING {}: z={:.2} but net spread {:.4}% is not profitable",
                signal.symbol, signal.z_score, signal.net_spread_pct
            ),
            kind => info!(
                "[Signal] {} {} ({:?}): z={:.2} gross={:.4}% net={:.4}%{}",
                kind,
                signal.symbol,
                signal.reason,
                signal.z_score,
                signal.gross_spread_pct,
                signal.net_spread_pct,
                signal
                    .direction
                    .map(|d| format!(" -> {}", d))
                    .unwrap_or_default()
            ),
        }
    }

    fn on_connection_status(&self, status: &ConnectionStatus) {
        match status.state {
            ConnectionState::Failed => {
                error!("[Connection] {} {}: {}", status.exchange, status.state, status.detail)
            }
            ConnectionState::Reconnecting => {
                warn!("[Connection] {} {}: {}", status.exchange, status.state, status.detail)
            }
            _ => info!("[Connection] {} {}: {}", status.exchange, status.state, status.detail),
        }
    }
}

/// Forwards every event to each inner sink in order
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for FanoutSink {
    fn on_tick(&self, tick: &Tick) {
        self.sinks.iter().for_each(|s| s.on_tick(tick));
    }

    fn on_spread(&self, update: &SpreadUpdate) {
        self.sinks.iter().for_each(|s| s.on_spread(update));
    }

    fn on_signal(&self, signal: &Signal) {
        self.sinks.iter().for_each(|s| s.on_signal(signal));
    }

    fn on_connection_status(&self, status: &ConnectionStatus) {
        self.sinks.iter().for_each(|s| s.on_connection_status(status));
    }
}
