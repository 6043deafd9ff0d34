//! Common test utilities for arbitrage integration tests
//!
//! A local exchange stand-in that answers both heartbeat dialects and can
//! push arbitrary frames to its clients.

#![allow(dead_code)]

use arbitrage::domain::{Exchange, SpreadSample, SpreadUpdate, Tick};
use arbitrage::{EventBus, MonitorConfig};
use flate2::write::GzEncoder;
use flate2::Compression;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Notify};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

const BYBIT_PING: &str = r#"{"op":"ping"}"#;
const BYBIT_PONG: &str = r#"{"success":true,"ret_msg":"pong","conn_id":"mock","op":"ping"}"#;

/// Mock exchange endpoint
///
/// - literal `Ping` is answered with a GZIP `Pong` binary frame (BingX)
/// - `{"op":"ping"}` is answered with a JSON pong (Bybit)
/// - every text frame from the client is recorded
pub struct MockExchange {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
    received: Arc<Mutex<Vec<String>>>,
    push_tx: broadcast::Sender<Message>,
}

impl MockExchange {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let received = Arc::new(Mutex::new(Vec::new()));
        let (push_tx, _) = broadcast::channel(64);

        {
            let shutdown = shutdown.clone();
            let received = received.clone();
            let push_tx = push_tx.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        result = listener.accept() => {
                            let Ok((stream, _)) = result else { break };
                            let shutdown = shutdown.clone();
                            let received = received.clone();
                            let push_rx = push_tx.subscribe();
                            let conn = Self::handle_connection(stream, shutdown, received, push_rx);
                            tokio::spawn(conn);
                        }
                        _ = shutdown.notified() => break,
                    }
                }
            });
        }

        Self {
            addr,
            shutdown,
            received,
            push_tx,
        }
    }

    async fn handle_connection(
        stream: tokio::net::TcpStream,
        shutdown: Arc<Notify>,
        received: Arc<Mutex<Vec<String>>>,
        mut push_rx: broadcast::Receiver<Message>,
    ) {
        let Ok(ws_stream) = accept_async(stream).await else {
            return;
        };
        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    let text = match msg {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => continue,
                    };
                    received.lock().push(text.clone());
                    let reply = match text.as_str() {
                        "Ping" => Some(Message::Binary(gzip("Pong"))),
                        BYBIT_PING => Some(Message::Text(BYBIT_PONG.to_string())),
                        _ => None,
                    };
                    if let Some(reply) = reply {
                        if write.send(reply).await.is_err() {
                            break;
                        }
                    }
                }
                pushed = push_rx.recv() => match pushed {
                    Ok(frame) => {
                        if write.send(frame).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = shutdown.notified() => break,
            }
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn received(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    /// Whether any received text frame contains `needle`
    pub fn saw(&self, needle: &str) -> bool {
        self.received.lock().iter().any(|f| f.contains(needle))
    }

    pub fn push(&self, frame: Message) {
        let _ = self.push_tx.send(frame);
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockExchange {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

/// BingX ticker frame, GZIP-compressed like the real feed
pub fn bingx_ticker(native: &str, bid: f64, ask: f64, ts: u64) -> Message {
    let json = format!(
        r#"{{"code":0,"dataType":"{native}@ticker","data":{{"e":"24hTicker","E":{ts},"s":"{native}","b":"{bid}","a":"{ask}"}}}}"#
    );
    Message::Binary(gzip(&json))
}

pub fn bybit_ticker(native: &str, bid: f64, ask: f64, ts: u64) -> Message {
    let json = format!(
        r#"{{"topic":"tickers.{native}","type":"snapshot","ts":{ts},"data":{{"symbol":"{native}","bid1Price":"{bid}","ask1Price":"{ask}"}}}}"#
    );
    Message::Text(json)
}

/// Config pointing both exchanges at local mocks with fast timers
pub fn local_config(bingx_url: &str, bybit_url: &str) -> MonitorConfig {
    let mut config = MonitorConfig::default();
    config.exchanges.bingx.url = bingx_url.to_string();
    config.exchanges.bybit.url = bybit_url.to_string();
    config.websocket.ping_interval = 0.2;
    config.websocket.pong_timeout = 2.0;
    config.websocket.reconnect_delay = 0.1;
    config.websocket.connect_timeout = 2.0;
    config
}

pub fn tick(exchange: Exchange, symbol: &str, price: f64, ts: u64) -> Tick {
    Tick::new(exchange, symbol, price, price, ts).unwrap()
}

pub fn update(z: f64, gross: f64, net: f64, ts: u64) -> SpreadUpdate {
    SpreadUpdate {
        sample: SpreadSample {
            symbol: "BTC/USDT".into(),
            timestamp: ts,
            bingx_price: 100.0,
            bybit_price: 100.0,
            gross_spread_pct: gross,
            net_spread_pct: net,
        },
        z_score: z,
        mean: 0.0,
        std: 1.0,
        window_len: 20,
    }
}

pub fn bus() -> Arc<EventBus> {
    Arc::new(EventBus::new())
}

/// Poll `check` every 10ms until it holds or `timeout` elapses
pub async fn wait_until(timeout: std::time::Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    check()
}
