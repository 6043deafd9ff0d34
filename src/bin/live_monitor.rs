use anyhow::Result;
use spread_arb_monitor::arbitrage::{init_tracing, LiveMonitor, MonitorConfig, TracingSink};
use spread_arb_monitor::bin_common::{
    load_config_from_env, parse_args, print_banner, print_shutdown, shutdown_signal, ConfigType,
    RunConfig,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Load config first (before logging is initialized)
    let config_type = match parse_args().into_iter().next() {
        Some(path) => ConfigType::Custom(path),
        None => ConfigType::Monitor,
    };
    let config_path = load_config_from_env(config_type);
    let config = MonitorConfig::load(&config_path)?;

    init_tracing(&config.log_level);
    config.log_summary();

    let run = RunConfig::new("BingX/Bybit Spread Monitor");
    print_banner(
        &run,
        &[
            format!("Config: {}", config_path.display()),
            format!("Symbols: {}", config.all_symbols().join(", ")),
        ],
    );

    let monitor = LiveMonitor::new(config, Arc::new(TracingSink))?;
    monitor.start().await?;

    let mut report = tokio::time::interval(run.report_interval);
    report.tick().await;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
            _ = report.tick() => print_status(&monitor),
        }
    }

    monitor.stop().await;

    let queue = monitor.queue_stats();
    let summary = format!("Ticks queued: {}, dropped: {}", queue.pushed, queue.dropped);
    print_shutdown(&run.name, Some(&summary));
    Ok(())
}

fn print_status(monitor: &LiveMonitor) {
    let now = chrono::Local::now().format("%H:%M:%S");
    let connections: Vec<String> = monitor
        .connection_states()
        .into_iter()
        .map(|(exchange, state)| format!("{}={}", exchange, state))
        .collect();
    let queue = monitor.queue_stats();

    info!("");
    info!(
        "[{}] {} | queue {}/{} (dropped {})",
        now,
        connections.join(" "),
        queue.len,
        queue.capacity,
        queue.dropped
    );
    info!(
        "{:<12} {:>10} {:>10} {:>8} {:>14}",
        "SYMBOL", "GROSS %", "NET %", "Z", "STATE"
    );

    let stats = monitor.all_stats();
    if stats.is_empty() {
        info!("(waiting for quotes from both exchanges)");
    }
    for s in stats {
        info!(
            "{:<12} {:>10.4} {:>10.4} {:>8.2} {:>14}",
            s.symbol,
            s.gross_spread_pct,
            s.net_spread_pct,
            s.z_score,
            s.signal_state.as_str()
        );
    }
}
