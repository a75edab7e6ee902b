//! Event source transport and the reconnecting link loop.

use crate::ingest::{EventIngestor, LinkState};
use crate::ledger::ProcessedEventLedger;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{future, StreamExt};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;
use visage_core::{ImpulseSink, LinkConfig};

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("invalid event source url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to connect: {0}")]
    Connect(#[source] tokio_tungstenite::tungstenite::Error),

    #[error("transport error: {0}")]
    Transport(#[source] tokio_tungstenite::tungstenite::Error),

    #[error("event source unavailable: {0}")]
    Unavailable(String),
}

/// Text frames from one connection. The stream ending means the connection
/// closed.
pub type MessageStream = BoxStream<'static, Result<String, LinkError>>;

#[async_trait]
pub trait EventSource: Send + Sync {
    async fn connect(&self) -> Result<MessageStream, LinkError>;

    /// Where this source connects to, for logs.
    fn describe(&self) -> String;
}

/// WebSocket event source. Text and binary frames both carry JSON.
#[derive(Debug, Clone)]
pub struct WsSource {
    url: Url,
}

impl WsSource {
    pub fn new(url: &str) -> Result<Self, LinkError> {
        let url = Url::parse(url).map_err(|source| LinkError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl EventSource for WsSource {
    async fn connect(&self) -> Result<MessageStream, LinkError> {
        let (ws, _) = connect_async(self.url.as_str())
            .await
            .map_err(LinkError::Connect)?;

        let frames = ws.filter_map(|msg| {
            future::ready(match msg {
                Ok(Message::Text(text)) => Some(Ok(text)),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => Some(Ok(text)),
                    Err(_) => {
                        tracing::debug!("Dropped non-UTF-8 binary frame");
                        None
                    }
                },
                Ok(_) => None,
                Err(e) => Some(Err(LinkError::Transport(e))),
            })
        });
        Ok(frames.boxed())
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}

/// One logical connection to an event source, reconnecting forever at a
/// fixed delay.
pub struct EventLink<E, S> {
    source: E,
    ingestor: EventIngestor<S>,
    reconnect_delay: Duration,
}

impl<E, S> EventLink<E, S>
where
    E: EventSource,
    S: ImpulseSink,
{
    pub fn new(source: E, sink: S, config: &LinkConfig) -> Self {
        let ledger = ProcessedEventLedger::new(config.ledger_capacity, config.ledger_retain);
        Self {
            source,
            ingestor: EventIngestor::new(sink, ledger),
            reconnect_delay: config.reconnect_delay(),
        }
    }

    pub fn subscribe_state(&self) -> watch::Receiver<LinkState> {
        self.ingestor.subscribe_state()
    }

    /// Connect, ingest until the connection drops, wait, repeat. Never
    /// returns; stop it by dropping or cancelling the task it runs in.
    pub async fn run(mut self) {
        loop {
            self.ingestor.on_connecting();
            tracing::info!("Connecting to event source at {}...", self.source.describe());

            match self.source.connect().await {
                Ok(stream) => {
                    self.ingestor.on_connect();
                    self.pump(stream).await;
                }
                Err(e) => tracing::warn!("Event source connect failed: {}", e),
            }

            self.ingestor.on_disconnect();
            tracing::info!(
                "Reconnecting to event source in {}ms",
                self.reconnect_delay.as_millis()
            );
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    async fn pump(&mut self, mut stream: MessageStream) {
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(text) => {
                    self.ingestor.on_message(&text);
                }
                Err(e) => {
                    tracing::warn!("Event link error: {}", e);
                    return;
                }
            }
        }
    }
}
