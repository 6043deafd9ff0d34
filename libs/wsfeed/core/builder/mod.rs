pub mod states;

use crate::core::config::SessionConfig;
use crate::core::session::FeedSession;
use crate::traits::*;
use states::*;
use std::sync::Arc;
use std::time::Duration;

/// Type-state builder for [`FeedSession`]
///
/// The URL and the frame handler are required; `spawn()` only exists once
/// both are set. Everything else has a default.
pub struct SessionBuilder<U, H>
where
    U: UrlState,
    H: HandlerState,
{
    _state: TypeState<U, H>,
    name: Option<String>,
    url: Option<String>,
    handler: Option<Arc<dyn FrameHandler>>,
    heartbeat: Option<(Duration, WsMessage)>,
    pong_timeout: Duration,
    connect_timeout: Duration,
    stable_after: Option<Duration>,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
}

impl SessionBuilder<NoUrl, NoHandler> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            name: None,
            url: None,
            handler: None,
            heartbeat: None,
            pong_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            stable_after: None,
            reconnect_strategy: None,
        }
    }
}

impl Default for SessionBuilder<NoUrl, NoHandler> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: UrlState, H: HandlerState> SessionBuilder<U, H> {
    fn retype<U2: UrlState, H2: HandlerState>(self) -> SessionBuilder<U2, H2> {
        SessionBuilder {
            _state: TypeState::new(),
            name: self.name,
            url: self.url,
            handler: self.handler,
            heartbeat: self.heartbeat,
            pong_timeout: self.pong_timeout,
            connect_timeout: self.connect_timeout,
            stable_after: self.stable_after,
            reconnect_strategy: self.reconnect_strategy,
        }
    }

    /// Name used in log prefixes and status details
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn heartbeat(mut self, interval: Duration, payload: WsMessage) -> Self {
        self.heartbeat = Some((interval, payload));
        self
    }

    /// Maximum wait for a heartbeat acknowledgment
    ///
    /// Only enforced when a heartbeat is configured.
    pub fn pong_timeout(mut self, timeout: Duration) -> Self {
        self.pong_timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Uptime after which a dropped connection no longer counts towards the
    /// consecutive-failure budget. Defaults to the heartbeat interval.
    pub fn stable_after(mut self, duration: Duration) -> Self {
        self.stable_after = Some(duration);
        self
    }

    pub fn reconnect_strategy(mut self, strategy: impl ReconnectionStrategy + 'static) -> Self {
        self.reconnect_strategy = Some(Box::new(strategy));
        self
    }
}

// URL setting
impl<H: HandlerState> SessionBuilder<NoUrl, H> {
    pub fn url(mut self, url: impl Into<String>) -> SessionBuilder<HasUrl, H> {
        self.url = Some(url.into());
        self.retype()
    }
}

// Handler setting
impl<U: UrlState> SessionBuilder<U, NoHandler> {
    pub fn handler<F: FrameHandler>(mut self, handler: Arc<F>) -> SessionBuilder<U, HasHandler> {
        self.handler = Some(handler as Arc<dyn FrameHandler>);
        self.retype()
    }
}

// Spawn method - only available when all required fields are set
impl SessionBuilder<HasUrl, HasHandler> {
    /// Validate the configuration and start the session task
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(self) -> Result<FeedSession> {
        let (url, handler) = match (self.url, self.handler) {
            (Some(url), Some(handler)) => (url, handler),
            _ => {
                return Err(FeedError::Configuration(
                    "url and handler are required".into(),
                ))
            }
        };

        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(FeedError::Configuration(format!(
                "url must use ws:// or wss://, got {}",
                url
            )));
        }
        if self.connect_timeout.is_zero() {
            return Err(FeedError::Configuration("connect_timeout must be > 0".into()));
        }
        if let Some((interval, _)) = &self.heartbeat {
            if interval.is_zero() {
                return Err(FeedError::Configuration("heartbeat interval must be > 0".into()));
            }
            if self.pong_timeout.is_zero() {
                return Err(FeedError::Configuration("pong_timeout must be > 0".into()));
            }
        }
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(FeedError::Configuration(
                "spawn() must be called from within a Tokio runtime".into(),
            ));
        }

        let stable_after = self.stable_after.unwrap_or_else(|| {
            self.heartbeat
                .as_ref()
                .map(|(interval, _)| *interval)
                .unwrap_or(Duration::from_secs(30))
        });

        let reconnect_strategy = self.reconnect_strategy.unwrap_or_else(|| {
            Box::new(ExponentialBackoff::new(
                Duration::from_secs(5),
                2.0,
                Duration::from_secs(300),
                Some(10),
            ))
        });

        let config = SessionConfig {
            name: self.name.unwrap_or_else(|| url.clone()),
            url,
            // Without a heartbeat there is nothing to time out on
            pong_timeout: if self.heartbeat.is_some() {
                self.pong_timeout
            } else {
                Duration::MAX
            },
            heartbeat: self.heartbeat,
            connect_timeout: self.connect_timeout,
            stable_after,
            reconnect_strategy,
        };

        Ok(FeedSession::spawn(config, handler))
    }
}
