//! Live monitor orchestration
//!
//! ```text
//!  FeedSession(bingx) ──┐                                   ┌──> StatsBoard
//!                       ├──> DropOldestQueue ──> consumer ──┤
//!  FeedSession(bybit) ──┘    (many producers)   (one task)  └──> EventSink
//!                                          SpreadEngine + SignalDetector
//! ```
//!
//! Sessions never share state with each other; the queue is the only point
//! where they meet. Everything after the queue runs on a single task, so the
//! per-symbol windows and signal states need no locks. Control requests such
//! as dropping an unsubscribed symbol reach that task over a command channel
//! and are applied between ticks.

use super::detector::{SignalDetector, SignalThresholds};
use super::engine::SpreadEngine;
use super::events::EventSink;
use super::feed::ExchangeFeed;
use super::history::SpreadHistorySource;
use super::stats::{CurrentStats, StatsBoard};
use crate::domain::{Exchange, Signal, SignalState, SpreadUpdate, Tick};
use crate::error::{ArbitrageError, Result};
use crate::infrastructure::{adapter_for, DropOldestQueue, MonitorConfig, QueueStats};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wsfeed::{ConnectionState, FeedSession, SessionBuilder, SessionMetrics};

// =============================================================================
// Pipeline (consumer side)
// =============================================================================

/// Result of processing one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessOutcome {
    pub update: Option<SpreadUpdate>,
    pub signal: Option<Signal>,
}

/// Request for the consumer task
#[derive(Debug, Clone, PartialEq)]
pub enum ConsumerCommand {
    /// Drop all per-symbol state: quotes, window, signal state and stats
    Forget(Vec<String>),
}

/// Engine + detector + publication, driven one tick at a time
pub struct SpreadPipeline {
    engine: SpreadEngine,
    detector: SignalDetector,
    stats: Arc<StatsBoard>,
    sink: Arc<dyn EventSink>,
}

impl SpreadPipeline {
    pub fn new(
        engine: SpreadEngine,
        detector: SignalDetector,
        stats: Arc<StatsBoard>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            engine,
            detector,
            stats,
            sink,
        }
    }

    pub fn from_config(
        config: &MonitorConfig,
        stats: Arc<StatsBoard>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self::new(
            SpreadEngine::from_config(config),
            SignalDetector::new(SignalThresholds::from(&config.trading)),
            stats,
            sink,
        )
    }

    pub fn engine(&self) -> &SpreadEngine {
        &self.engine
    }

    pub fn detector(&self) -> &SignalDetector {
        &self.detector
    }

    pub fn preload(&mut self, symbol: &str, gross_spreads: &[f64]) -> usize {
        self.engine.preload(symbol, gross_spreads)
    }

    /// Reset `symbol` as if it had never been seen
    pub fn forget(&mut self, symbol: &str) {
        let had_book = self.engine.forget(symbol);
        if let Some(state) = self.detector.forget(symbol) {
            if state == SignalState::InPosition {
                warn!("[Monitor] {} dropped while IN_POSITION", symbol);
            }
        }
        self.stats.remove(symbol);
        debug!("[Monitor] Forgot {} (had data: {})", symbol, had_book);
    }

    pub fn apply(&mut self, command: ConsumerCommand) {
        match command {
            ConsumerCommand::Forget(symbols) => {
                for symbol in &symbols {
                    self.forget(symbol);
                }
            }
        }
    }

    pub fn process(&mut self, tick: Tick) -> ProcessOutcome {
        self.stats.record_tick(&tick);
        self.sink.on_tick(&tick);

        let Some(update) = self.engine.on_tick(tick) else {
            return ProcessOutcome::default();
        };

        let signal = self.detector.evaluate(&update);
        self.stats.record(&update, self.detector.state(update.symbol()));

        self.sink.on_spread(&update);
        if let Some(signal) = &signal {
            self.sink.on_signal(signal);
        }

        ProcessOutcome {
            update: Some(update),
            signal,
        }
    }
}

/// Drain `queue` into `pipeline` until the queue is closed and empty
///
/// Pending commands always run before the next tick. Returns the pipeline so
/// its final state can be inspected.
pub async fn run_consumer(
    queue: Arc<DropOldestQueue<Tick>>,
    mut commands: mpsc::UnboundedReceiver<ConsumerCommand>,
    mut pipeline: SpreadPipeline,
) -> SpreadPipeline {
    debug!("[Monitor] Consumer started");
    let mut processed: u64 = 0;
    let mut commands_open = true;
    loop {
        tokio::select! {
            biased;

            command = commands.recv(), if commands_open => match command {
                Some(command) => pipeline.apply(command),
                None => commands_open = false,
            },
            tick = queue.pop() => match tick {
                Some(tick) => {
                    pipeline.process(tick);
                    processed += 1;
                }
                None => break,
            },
        }
    }
    debug!("[Monitor] Consumer finished after {} ticks", processed);
    pipeline
}

// =============================================================================
// LiveMonitor
// =============================================================================

struct LiveFeed {
    feed: Arc<ExchangeFeed>,
    session: FeedSession,
}

/// Owns the sessions, the queue and the consumer task
///
/// ```rust,ignore
/// let monitor = LiveMonitor::new(config, Arc::new(TracingSink))?;
/// monitor.start().await?;
/// // ...
/// monitor.stop().await;
/// ```
pub struct LiveMonitor {
    config: MonitorConfig,
    sink: Arc<dyn EventSink>,
    stats: Arc<StatsBoard>,
    queue: Arc<DropOldestQueue<Tick>>,
    history: Option<Arc<dyn SpreadHistorySource>>,
    /// Present until `start` hands it to the consumer task
    pipeline: Mutex<Option<SpreadPipeline>>,
    commands: mpsc::UnboundedSender<ConsumerCommand>,
    command_rx: Mutex<Option<mpsc::UnboundedReceiver<ConsumerCommand>>>,
    feeds: RwLock<Vec<LiveFeed>>,
    consumer: Mutex<Option<JoinHandle<SpreadPipeline>>>,
}

impl LiveMonitor {
    /// Validates `config`; nothing connects until [`start`](Self::start)
    pub fn new(config: MonitorConfig, sink: Arc<dyn EventSink>) -> Result<Self> {
        config.validate()?;
        let stats = Arc::new(StatsBoard::new());
        let pipeline = SpreadPipeline::from_config(&config, stats.clone(), sink.clone());
        let queue = Arc::new(DropOldestQueue::new(config.websocket.message_queue_size));
        let (commands, command_rx) = mpsc::unbounded_channel();

        Ok(Self {
            config,
            sink,
            stats,
            queue,
            history: None,
            pipeline: Mutex::new(Some(pipeline)),
            commands,
            command_rx: Mutex::new(Some(command_rx)),
            feeds: RwLock::new(Vec::new()),
            consumer: Mutex::new(None),
        })
    }

    pub fn with_history_source(mut self, source: Arc<dyn SpreadHistorySource>) -> Self {
        self.history = Some(source);
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Seed a symbol's window before `start`
    pub fn preload(&self, symbol: &str, gross_spreads: &[f64]) -> Result<usize> {
        let mut pipeline = self.pipeline.lock();
        let pipeline = pipeline
            .as_mut()
            .ok_or_else(|| ArbitrageError::State("preload after start".to_string()))?;
        Ok(pipeline.preload(symbol, gross_spreads))
    }

    pub fn is_running(&self) -> bool {
        self.consumer.lock().is_some()
    }

    /// Preload history, start the consumer and one session per enabled exchange
    pub async fn start(&self) -> Result<()> {
        let Some(mut pipeline) = self.pipeline.lock().take() else {
            return Err(ArbitrageError::State("monitor already started".to_string()));
        };
        let Some(command_rx) = self.command_rx.lock().take() else {
            return Err(ArbitrageError::State("monitor already started".to_string()));
        };

        if let Some(history) = &self.history {
            let limit = self.config.trading.z_score_window;
            for symbol in self.config.all_symbols() {
                match history.gross_spreads(&symbol, limit).await {
                    Ok(samples) => {
                        let loaded = pipeline.preload(&symbol, &samples);
                        info!("[Monitor] Preloaded {} samples for {}", loaded, symbol);
                    }
                    Err(e) => warn!(
                        "[Monitor] History unavailable for {}, starting empty: {}",
                        symbol, e
                    ),
                }
            }
        }

        let consumer = tokio::spawn(run_consumer(self.queue.clone(), command_rx, pipeline));
        *self.consumer.lock() = Some(consumer);

        let mut started = Vec::new();
        for exchange in self.config.enabled_exchanges() {
            match self.spawn_feed(exchange) {
                Ok(live) => started.push(live),
                Err(e) => {
                    for live in &started {
                        live.session.stop();
                    }
                    self.queue.close();
                    return Err(e);
                }
            }
        }

        info!(
            "[Monitor] Started {} session(s) for {} symbol(s)",
            started.len(),
            self.config.all_symbols().len()
        );
        *self.feeds.write() = started;
        Ok(())
    }

    fn spawn_feed(&self, exchange: Exchange) -> Result<LiveFeed> {
        let ws = &self.config.websocket;
        let feed = Arc::new(ExchangeFeed::new(
            adapter_for(exchange),
            self.config.symbols_for(exchange),
            self.queue.clone(),
            self.sink.clone(),
        ));

        let session = SessionBuilder::new()
            .name(exchange.as_str())
            .url(self.config.exchange(exchange).url.clone())
            .handler(feed.clone())
            .heartbeat(ws.ping_interval(), feed.heartbeat())
            .pong_timeout(ws.pong_timeout())
            .connect_timeout(ws.connect_timeout())
            .stable_after(ws.ping_interval())
            .reconnect_strategy(ws.reconnect_strategy())
            .spawn()?;

        Ok(LiveFeed { feed, session })
    }

    /// Stop every session, drain the queue and wait for the consumer
    ///
    /// Idempotent; safe to call before `start`.
    pub async fn stop(&self) {
        let feeds = std::mem::take(&mut *self.feeds.write());
        for live in &feeds {
            live.session.stop();
        }
        for live in &feeds {
            live.session.join().await;
        }

        self.queue.close();
        let consumer = self.consumer.lock().take();
        if let Some(handle) = consumer {
            if let Err(e) = handle.await {
                warn!("[Monitor] Consumer task ended abnormally: {}", e);
            }
            info!("[Monitor] Stopped");
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn current_stats(&self, symbol: &str) -> Option<CurrentStats> {
        self.stats.current(symbol)
    }

    pub fn all_stats(&self) -> Vec<CurrentStats> {
        self.stats.all()
    }

    pub fn latest_tick(&self, exchange: Exchange, symbol: &str) -> Option<Tick> {
        self.stats.latest_tick(exchange, symbol)
    }

    pub fn connection_states(&self) -> Vec<(Exchange, ConnectionState)> {
        self.feeds
            .read()
            .iter()
            .map(|l| (l.feed.exchange(), l.session.state()))
            .collect()
    }

    pub fn session_metrics(&self) -> Vec<(Exchange, SessionMetrics)> {
        self.feeds
            .read()
            .iter()
            .map(|l| (l.feed.exchange(), l.session.metrics()))
            .collect()
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Symbols currently subscribed per exchange
    pub fn symbols(&self) -> Vec<(Exchange, Vec<String>)> {
        self.feeds
            .read()
            .iter()
            .map(|l| (l.feed.exchange(), l.feed.symbols()))
            .collect()
    }

    // =========================================================================
    // Runtime subscription changes
    // =========================================================================

    /// Add symbols on every running session
    ///
    /// Frames go out immediately on connected sessions; a session that is
    /// between connections picks the symbols up on its next subscribe.
    pub fn subscribe(&self, symbols: &[String]) -> Result<()> {
        self.change_subscriptions(symbols, true)
    }

    /// Remove symbols from every running session and drop their state
    ///
    /// Ticks already queued for them are purged; the consumer resets the
    /// symbols before it handles any later tick, so a resubscribe starts
    /// from an empty window.
    pub fn unsubscribe(&self, symbols: &[String]) -> Result<()> {
        self.change_subscriptions(symbols, false)?;
        let purged = self.queue.retain(|tick| !symbols.contains(&tick.symbol));
        if purged > 0 {
            debug!("[Monitor] Purged {} queued tick(s) for {:?}", purged, symbols);
        }
        self.commands
            .send(ConsumerCommand::Forget(symbols.to_vec()))
            .map_err(|_| ArbitrageError::State("consumer is not running".to_string()))
    }

    fn change_subscriptions(&self, symbols: &[String], add: bool) -> Result<()> {
        let feeds = self.feeds.read();
        if feeds.is_empty() {
            return Err(ArbitrageError::State("monitor is not running".to_string()));
        }

        for live in feeds.iter() {
            let frames = if add {
                live.feed.add_symbols(symbols)
            } else {
                live.feed.remove_symbols(symbols)
            };
            if !live.session.is_connected() {
                continue;
            }
            for frame in frames {
                if let Err(e) = live.session.send(frame) {
                    warn!(
                        "[Monitor] Could not send subscription change to {}: {}",
                        live.feed.exchange(),
                        e
                    );
                }
            }
        }
        Ok(())
    }
}
