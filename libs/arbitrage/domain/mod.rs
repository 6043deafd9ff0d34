//! Domain Layer
//!
//! Pure entities and math. No I/O, no async, no knowledge of exchanges'
//! wire formats.

pub mod rolling_window;
pub mod signal;
pub mod spread;
pub mod tick;

pub use rolling_window::{RollingWindow, WindowStats};
pub use signal::{Direction, Signal, SignalKind, SignalReason, SignalState, SignalTransition};
pub use spread::{gross_spread_pct, net_spread_pct, SpreadSample, SpreadUpdate};
pub use tick::{Exchange, QuoteFields, Tick};
