//! Common test utilities for wsfeed integration tests
//!
//! A local WebSocket server whose heartbeat behaviour can be chosen per test.

#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
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

/// How the mock answers client frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Echo text/binary frames back
    Echo,
    /// Answer the literal "Ping" with a GZIP-compressed "Pong" binary frame
    GzipPong,
    /// Read everything, answer nothing
    Silent,
}

/// A simple mock WebSocket server for testing
pub struct MockWsServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
    received: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
    push_tx: broadcast::Sender<Message>,
}

impl MockWsServer {
    pub async fn start() -> Self {
        Self::start_with(Behavior::Echo).await
    }

    /// Create and start a new mock WebSocket server
    pub async fn start_with(behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let received = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let (push_tx, _) = broadcast::channel(64);

        {
            let shutdown = shutdown.clone();
            let received = received.clone();
            let connections = connections.clone();
            let push_tx = push_tx.clone();

            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        result = listener.accept() => {
                            match result {
                                Ok((stream, _)) => {
                                    connections.fetch_add(1, Ordering::SeqCst);
                                    let shutdown = shutdown.clone();
                                    let received = received.clone();
                                    let push_rx = push_tx.subscribe();
                                    tokio::spawn(Self::handle_connection(
                                        stream, behavior, shutdown, received, push_rx,
                                    ));
                                }
                                Err(e) => {
                                    eprintln!("Accept error: {}", e);
                                    break;
                                }
                            }
                        }
                        _ = shutdown.notified() => {
                            break;
                        }
                    }
                }
            });
        }

        Self {
            addr,
            shutdown,
            received,
            connections,
            push_tx,
        }
    }

    async fn handle_connection(
        stream: tokio::net::TcpStream,
        behavior: Behavior,
        shutdown: Arc<Notify>,
        received: Arc<Mutex<Vec<String>>>,
        mut push_rx: broadcast::Receiver<Message>,
    ) {
        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    let msg = match msg {
                        Some(Ok(msg)) => msg,
                        Some(Err(_)) | None => break,
                    };
                    if msg.is_close() {
                        break;
                    }
                    if let Message::Text(text) = &msg {
                        received.lock().push(text.clone());
                    }
                    let reply = match behavior {
                        Behavior::Echo if msg.is_text() || msg.is_binary() => Some(msg),
                        Behavior::GzipPong if msg == Message::Text("Ping".into()) => {
                            Some(Message::Binary(gzip("Pong")))
                        }
                        _ => None,
                    };
                    if let Some(reply) = reply {
                        if write.send(reply).await.is_err() {
                            break;
                        }
                    }
                }
                pushed = push_rx.recv() => {
                    match pushed {
                        Ok(frame) => {
                            if write.send(frame).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = shutdown.notified() => {
                    break;
                }
            }
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Text frames received from clients so far
    pub fn received(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    /// Number of accepted TCP connections
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Send a frame to every connected client
    pub fn push(&self, frame: Message) {
        let _ = self.push_tx.send(frame);
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

/// A `ws://` URL nothing listens on
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}", addr)
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
