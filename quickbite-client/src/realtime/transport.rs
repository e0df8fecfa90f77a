use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote endpoint could not be reached
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    /// Subscribing to a topic failed on an otherwise live connection
    #[error("subscription to {topic} failed: {reason}")]
    SubscribeFailed { topic: String, reason: String },
    /// An established connection dropped mid-stream
    #[error("connection closed: {0}")]
    Closed(String),
}

/// Represents a push transport the realtime channel can open connections
/// over. Delivery is at-most-once, and ordering is only guaranteed within a
/// topic.
///
/// Reconnection cadence belongs to the transport: the channel waits
/// [PushTransport::retry_delay] between attempts and layers no backoff of its
/// own on top.
#[async_trait]
pub trait PushTransport: Send + Sync + 'static {
    type Connection: TransportConnection;

    /// Opens a new connection to the push endpoint.
    async fn connect(&self) -> Result<Self::Connection, TransportError>;

    /// The fixed delay between reconnection attempts.
    fn retry_delay(&self) -> Duration {
        Duration::from_secs(5)
    }
}

/// A live connection. Dropping it closes the connection and removes any
/// subscriptions it holds.
#[async_trait]
pub trait TransportConnection: Send + 'static {
    /// Subscribes this connection to a topic.
    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    /// The next raw message payload, or [None] once the connection is closed.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;
}
