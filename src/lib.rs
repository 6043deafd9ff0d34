//! BingX / Bybit spread monitor - main library
//!
//! ## Architecture
//!
//! - **bin_common**: shared helpers for binaries (config path, banners, shutdown)
//! - **arbitrage**: tick normalization, spread statistics and signals (re-exported from workspace)
//! - **wsfeed**: streaming WebSocket session library (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust,ignore
//! use spread_arb_monitor::bin_common::{load_config_from_env, ConfigType};
//! use spread_arb_monitor::arbitrage::LiveMonitor;
//! ```

// Re-export workspace libraries for convenience
pub use arbitrage;
pub use wsfeed;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod runner;

    pub use cli::{load_config_from_env, parse_args, ConfigType};
    pub use runner::{print_banner, print_shutdown, shutdown_signal, RunConfig};
}
