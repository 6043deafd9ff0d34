//! Monitor configuration
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults ([`MonitorConfig::default`])
//! 2. the YAML file (partial files are fine, missing keys keep their default)
//! 3. `ARBIBOT_<SECTION>__<KEY>` environment variables, values parsed as YAML
//!    scalars (`ARBIBOT_TRADING__Z_SCORE_ENTRY=2.5`)

use crate::domain::Exchange;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use wsfeed::ExponentialBackoff;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "ARBIBOT_";

/// Separator between path segments in an override key
const ENV_SEPARATOR: &str = "__";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// Main monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub websocket: WebSocketConfig,
    pub exchanges: ExchangesConfig,
    /// Canonical `BASE/QUOTE` symbols monitored on every exchange
    pub symbols: Vec<String>,
    pub trading: TradingConfig,
    pub fees: FeesConfig,
    pub log_level: String,
}

/// Connection tuning shared by all exchange sessions (seconds unless noted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSocketConfig {
    pub reconnect_delay: f64,
    pub backoff_factor: f64,
    pub max_reconnect_delay: f64,
    /// Consecutive failed attempts before an exchange is marked FAILED
    pub max_reconnect_attempts: usize,
    pub ping_interval: f64,
    pub pong_timeout: f64,
    /// Distribution queue capacity (ticks)
    pub message_queue_size: usize,
    pub connect_timeout: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangesConfig {
    pub bingx: ExchangeConfig,
    pub bybit: ExchangeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub url: String,
    pub enabled: bool,
    /// Taker fee per leg, percent
    pub fee_pct: f64,
    /// Overrides the global symbol list for this exchange
    #[serde(default)]
    pub symbols: Option<Vec<String>>,
}

/// Signal thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    pub z_score_window: usize,
    pub z_score_entry: f64,
    pub z_score_exit: f64,
    pub stop_z_score: f64,
    /// Minimum net spread for an entry, percent
    pub min_spread_pct: f64,
    /// Seconds, measured on sample timestamps
    pub max_position_time: f64,
    pub min_entry_ticks: u32,
    pub min_exit_ticks: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeesConfig {
    /// Total round-trip fee per symbol, percent; replaces the exchange sum
    pub symbols: BTreeMap<String, f64>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            websocket: WebSocketConfig::default(),
            exchanges: ExchangesConfig::default(),
            symbols: vec!["BTC/USDT".to_string()],
            trading: TradingConfig::default(),
            fees: FeesConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: 5.0,
            backoff_factor: 2.0,
            max_reconnect_delay: 300.0,
            max_reconnect_attempts: 10,
            ping_interval: 30.0,
            pong_timeout: 60.0,
            message_queue_size: 1000,
            connect_timeout: 10.0,
        }
    }
}

impl Default for ExchangesConfig {
    fn default() -> Self {
        Self {
            bingx: ExchangeConfig {
                url: "wss://open-api-swap.bingx.com/swap-market".to_string(),
                enabled: true,
                fee_pct: 0.05,
                symbols: None,
            },
            bybit: ExchangeConfig {
                url: "wss://stream.bybit.com/v5/public/linear".to_string(),
                enabled: true,
                fee_pct: 0.055,
                symbols: None,
            },
        }
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            z_score_window: 20,
            z_score_entry: 2.0,
            z_score_exit: 0.5,
            stop_z_score: 4.0,
            min_spread_pct: 0.3,
            max_position_time: 3600.0,
            min_entry_ticks: 1,
            min_exit_ticks: 1,
        }
    }
}

impl WebSocketConfig {
    pub fn reconnect_strategy(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(
            Duration::from_secs_f64(self.reconnect_delay),
            self.backoff_factor,
            Duration::from_secs_f64(self.max_reconnect_delay),
            Some(self.max_reconnect_attempts),
        )
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs_f64(self.ping_interval)
    }

    pub fn pong_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.pong_timeout)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.connect_timeout)
    }
}

impl TradingConfig {
    pub fn max_position_time_ms(&self) -> u64 {
        (self.max_position_time * 1000.0).round() as u64
    }
}

// =============================================================================
// Loading
// =============================================================================

impl MonitorConfig {
    /// Load configuration from a YAML file plus `ARBIBOT_*` overrides
    ///
    /// A missing file is not an error: defaults are used and a warning logged.
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let path = config_path.as_ref();
        let yaml = match std::fs::read_to_string(path) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("[Config] {} not found, using defaults", path.display());
                None
            }
            Err(e) => return Err(e.into()),
        };

        Self::from_sources(yaml.as_deref(), std::env::vars())
    }

    /// Parse YAML (without environment overrides) and validate
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::from_sources(Some(yaml), std::iter::empty())
    }

    /// Merge defaults, optional YAML and the given environment, then validate
    pub fn from_sources(
        yaml: Option<&str>,
        env: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self> {
        let mut tree = serde_yaml::to_value(Self::default())?;

        if let Some(yaml) = yaml {
            let user: Value = serde_yaml::from_str(yaml)?;
            if !user.is_null() {
                merge(&mut tree, user);
            }
        }

        apply_env_overrides(&mut tree, env)?;

        let config: MonitorConfig = serde_yaml::from_value(tree)?;
        config.validate()?;
        Ok(config)
    }

    pub fn exchange(&self, exchange: Exchange) -> &ExchangeConfig {
        match exchange {
            Exchange::BingX => &self.exchanges.bingx,
            Exchange::Bybit => &self.exchanges.bybit,
        }
    }

    pub fn enabled_exchanges(&self) -> Vec<Exchange> {
        Exchange::all()
            .iter()
            .copied()
            .filter(|e| self.exchange(*e).enabled)
            .collect()
    }

    /// Symbols to subscribe on `exchange`
    pub fn symbols_for(&self, exchange: Exchange) -> Vec<String> {
        self.exchange(exchange)
            .symbols
            .clone()
            .unwrap_or_else(|| self.symbols.clone())
    }

    /// Every symbol monitored on at least one exchange, in config order
    pub fn all_symbols(&self) -> Vec<String> {
        let mut all: Vec<String> = Vec::new();
        for exchange in self.enabled_exchanges() {
            for symbol in self.symbols_for(exchange) {
                if !all.contains(&symbol) {
                    all.push(symbol);
                }
            }
        }
        all
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let ws = &self.websocket;
        for (name, value) in [
            ("websocket.reconnect_delay", ws.reconnect_delay),
            ("websocket.max_reconnect_delay", ws.max_reconnect_delay),
            ("websocket.ping_interval", ws.ping_interval),
            ("websocket.pong_timeout", ws.pong_timeout),
            ("websocket.connect_timeout", ws.connect_timeout),
            ("trading.max_position_time", self.trading.max_position_time),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(format!("{} must be > 0 (got {})", name, value)));
            }
        }
        // Duration::from_secs_f64 panics past this
        for (name, value) in [
            ("websocket.reconnect_delay", ws.reconnect_delay),
            ("websocket.max_reconnect_delay", ws.max_reconnect_delay),
            ("websocket.ping_interval", ws.ping_interval),
            ("websocket.pong_timeout", ws.pong_timeout),
            ("websocket.connect_timeout", ws.connect_timeout),
        ] {
            if value > u32::MAX as f64 {
                return Err(invalid(format!("{} is out of range (got {})", name, value)));
            }
        }
        if !ws.backoff_factor.is_finite() || ws.backoff_factor < 1.0 {
            return Err(invalid("websocket.backoff_factor must be >= 1".to_string()));
        }
        if ws.max_reconnect_attempts < 1 {
            return Err(invalid("websocket.max_reconnect_attempts must be >= 1".to_string()));
        }
        if ws.message_queue_size < 1 {
            return Err(invalid("websocket.message_queue_size must be >= 1".to_string()));
        }

        let t = &self.trading;
        if t.z_score_window < 2 {
            return Err(invalid("trading.z_score_window must be >= 2".to_string()));
        }
        let thresholds_ok = [t.z_score_exit, t.z_score_entry, t.stop_z_score, t.min_spread_pct]
            .iter()
            .all(|v| v.is_finite())
            && 0.0 <= t.z_score_exit
            && t.z_score_exit < t.z_score_entry
            && t.z_score_entry < t.stop_z_score;
        if !thresholds_ok {
            return Err(invalid(format!(
                "need 0 <= z_score_exit < z_score_entry < stop_z_score (got {} / {} / {})",
                t.z_score_exit, t.z_score_entry, t.stop_z_score
            )));
        }
        if t.min_entry_ticks < 1 || t.min_exit_ticks < 1 {
            return Err(invalid(
                "trading.min_entry_ticks and min_exit_ticks must be >= 1".to_string(),
            ));
        }

        let enabled = self.enabled_exchanges();
        if enabled.is_empty() {
            return Err(invalid("at least one exchange must be enabled".to_string()));
        }
        for exchange in Exchange::all() {
            let cfg = self.exchange(*exchange);
            if !cfg.fee_pct.is_finite() || cfg.fee_pct < 0.0 {
                return Err(invalid(format!(
                    "exchanges.{}.fee_pct must be >= 0",
                    exchange.as_str()
                )));
            }
            if cfg.enabled && !(cfg.url.starts_with("ws://") || cfg.url.starts_with("wss://")) {
                return Err(invalid(format!(
                    "exchanges.{}.url must be a ws:// or wss:// URL",
                    exchange.as_str()
                )));
            }
        }

        if self.all_symbols().is_empty() {
            return Err(invalid("at least one symbol is required".to_string()));
        }
        for symbol in self.all_symbols() {
            if !is_canonical_symbol(&symbol) {
                return Err(invalid(format!("symbol {:?} is not BASE/QUOTE", symbol)));
            }
        }
        for (symbol, fee) in &self.fees.symbols {
            if !fee.is_finite() || *fee < 0.0 {
                return Err(invalid(format!("fees.symbols.{} must be >= 0", symbol)));
            }
        }

        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(invalid(format!(
                "log_level {:?} is not one of {:?}",
                self.log_level, LOG_LEVELS
            )));
        }

        Ok(())
    }

    /// Log the effective configuration
    pub fn log_summary(&self) {
        info!("[Config] Symbols: {}", self.all_symbols().join(", "));
        for exchange in Exchange::all() {
            let cfg = self.exchange(*exchange);
            info!(
                "[Config] {}: enabled={} fee={}% url={}",
                exchange, cfg.enabled, cfg.fee_pct, cfg.url
            );
        }
        let t = &self.trading;
        info!(
            "[Config] Z window={} entry={} exit={} stop={} min_spread={}% max_hold={}s",
            t.z_score_window,
            t.z_score_entry,
            t.z_score_exit,
            t.stop_z_score,
            t.min_spread_pct,
            t.max_position_time
        );
        let ws = &self.websocket;
        info!(
            "[Config] Reconnect {}s x{} (cap {}s, {} attempts), ping {}s, pong {}s, queue {}",
            ws.reconnect_delay,
            ws.backoff_factor,
            ws.max_reconnect_delay,
            ws.max_reconnect_attempts,
            ws.ping_interval,
            ws.pong_timeout,
            ws.message_queue_size
        );
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Validation(message)
}

fn is_canonical_symbol(symbol: &str) -> bool {
    match symbol.split_once('/') {
        Some((base, quote)) => !base.is_empty() && !quote.is_empty() && !quote.contains('/'),
        None => false,
    }
}

/// Deep-merge `overlay` into `base`; mappings merge key by key, anything else replaces
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Apply `ARBIBOT_A__B=value` pairs onto the config tree, returning how many applied
pub fn apply_env_overrides(
    tree: &mut Value,
    env: impl IntoIterator<Item = (String, String)>,
) -> Result<usize> {
    let mut applied = 0;
    for (key, raw) in env {
        let Some(path) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let segments: Vec<String> = path
            .split(ENV_SEPARATOR)
            .map(|s| s.to_lowercase())
            .collect();
        if segments.iter().any(|s| s.is_empty()) {
            warn!("[Config] Ignoring malformed override {}", key);
            continue;
        }

        let value: Value = serde_yaml::from_str(&raw)?;
        if set_path(tree, &segments, value) {
            info!("[Config] Override {} applied", key);
            applied += 1;
        } else {
            warn!("[Config] Override {} does not address a config section", key);
        }
    }
    Ok(applied)
}

fn set_path(node: &mut Value, segments: &[String], value: Value) -> bool {
    // A null section (e.g. `symbols: ~`) becomes a mapping on demand
    if node.is_null() {
        *node = Value::Mapping(Mapping::new());
    }
    let Value::Mapping(map) = node else {
        return false;
    };

    match segments {
        [] => false,
        [last] => {
            map.insert(Value::String(last.clone()), value);
            true
        }
        [first, rest @ ..] => {
            let key = Value::String(first.clone());
            if !map.contains_key(&key) {
                map.insert(key.clone(), Value::Mapping(Mapping::new()));
            }
            match map.get_mut(&key) {
                Some(child) => set_path(child, rest, value),
                None => false,
            }
        }
    }
}
