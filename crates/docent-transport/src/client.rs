//! Pub/sub client capability

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Delivery guarantee requested for a publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum QoS {
    /// Fire and forget
    #[default]
    AtMostOnce,
    /// Acknowledged delivery
    AtLeastOnce,
}

/// Options for a single publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublishOptions {
    pub qos: QoS,
    /// Ask the broker to keep this as the topic's last value
    pub retain: bool,
}

impl PublishOptions {
    /// Options used for every state report: `{ qos: 1, retain: true }`
    pub fn retained() -> Self {
        Self {
            qos: QoS::AtLeastOnce,
            retain: true,
        }
    }
}

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Not connected")]
    NotConnected,

    #[error("Publish to '{topic}' rejected: {reason}")]
    PublishRejected { topic: String, reason: String },

    #[error("Subscription limit reached ({0})")]
    SubscriptionLimit(usize),

    #[error("Codec error: {0}")]
    Codec(#[from] crate::codec::CodecError),
}

/// A message received on a subscribed topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub topic: String,
    pub payload: Vec<u8>,
    /// True when replayed from the broker's retained store on subscribe
    pub retained: bool,
}

/// Unique subscription identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Closer = Box<dyn FnOnce(SubscriptionId) + Send>;

/// Handle to one subscription
///
/// Messages arrive in publish order. Closing (or dropping) the handle
/// unsubscribes this registration only.
pub struct Subscription {
    id: SubscriptionId,
    topic: String,
    receiver: mpsc::Receiver<Delivery>,
    closer: Option<Closer>,
}

impl Subscription {
    /// Build a handle; `closer` runs once when the handle is closed or dropped
    pub fn new(
        id: SubscriptionId,
        topic: impl Into<String>,
        receiver: mpsc::Receiver<Delivery>,
        closer: impl FnOnce(SubscriptionId) + Send + 'static,
    ) -> Self {
        Self {
            id,
            topic: topic.into(),
            receiver,
            closer: Some(Box::new(closer)),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for the next message; `None` once the transport side is gone
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.receiver.recv().await
    }

    /// Take an already delivered message without waiting
    pub fn try_recv(&mut self) -> Option<Delivery> {
        self.receiver.try_recv().ok()
    }

    /// Unsubscribe
    pub fn close(mut self) {
        self.unsubscribe();
    }

    fn unsubscribe(&mut self) {
        if let Some(closer) = self.closer.take() {
            closer(self.id);
            self.receiver.close();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("open", &self.closer.is_some())
            .finish()
    }
}

/// Pub/sub client capability consumed by the exhibit runtime
#[async_trait]
pub trait PubSubClient: Send + Sync {
    /// Whether the client currently has a broker connection
    fn is_connected(&self) -> bool;

    /// Subscribe to an exact topic
    async fn subscribe(&self, topic: &str) -> Result<Subscription, TransportError>;

    /// Publish a payload
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        options: PublishOptions,
    ) -> Result<(), TransportError>;
}
