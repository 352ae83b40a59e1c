//! In-process broker
//!
//! Exact-topic routing with a retained store: a retained publish replaces the
//! topic's stored value (an empty retained payload clears it) and every new
//! subscriber immediately receives the stored value.

use crate::client::{
    Delivery, PubSubClient, PublishOptions, Subscription, SubscriptionId, TransportError,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, trace, warn};

/// Broker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Per-subscription delivery buffer; messages beyond it are dropped
    pub subscription_buffer_size: usize,
    /// Maximum concurrent subscriptions across all topics
    pub max_subscriptions: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            subscription_buffer_size: 64,
            max_subscriptions: 256,
        }
    }
}

struct Subscriber {
    id: SubscriptionId,
    sender: mpsc::Sender<Delivery>,
}

#[derive(Default)]
struct BrokerState {
    subscribers: HashMap<String, Vec<Subscriber>>,
    retained: HashMap<String, Vec<u8>>,
}

impl BrokerState {
    fn subscription_count(&self) -> usize {
        self.subscribers.values().map(Vec::len).sum()
    }

    fn remove(&mut self, topic: &str, id: SubscriptionId) -> bool {
        let Some(subscribers) = self.subscribers.get_mut(topic) else {
            return false;
        };
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        let removed = subscribers.len() != before;
        if subscribers.is_empty() {
            self.subscribers.remove(topic);
        }
        removed
    }
}

/// In-process pub/sub broker
pub struct MemoryBroker {
    config: BrokerConfig,
    state: Arc<Mutex<BrokerState>>,
    connected: AtomicBool,
    published: AtomicU64,
}

impl MemoryBroker {
    /// Create a connected broker
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(BrokerState::default())),
            connected: AtomicBool::new(true),
            published: AtomicU64::new(0),
        }
    }

    /// Simulate connection loss or recovery
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
        debug!(connected, "Broker connection changed");
    }

    /// Retained value of a topic
    pub fn retained(&self, topic: &str) -> Option<Vec<u8>> {
        self.state.lock().retained.get(topic).cloned()
    }

    /// Number of live subscriptions on a topic
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.state.lock()
            .subscribers
            .get(topic)
            .map_or(0, Vec::len)
    }

    /// Total accepted publishes
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new(BrokerConfig::default())
    }
}

#[async_trait]
impl PubSubClient for MemoryBroker {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        let (sender, receiver) = mpsc::channel(self.config.subscription_buffer_size.max(1));
        let id = SubscriptionId::new();

        {
            let mut state = self.state.lock();
            if state.subscription_count() >= self.config.max_subscriptions {
                return Err(TransportError::SubscriptionLimit(self.config.max_subscriptions));
            }

            if let Some(payload) = state.retained.get(topic) {
                let delivery = Delivery {
                    topic: topic.to_string(),
                    payload: payload.clone(),
                    retained: true,
                };
                // Fresh channel with capacity >= 1, cannot be full
                let _ = sender.try_send(delivery);
            }

            state
                .subscribers
                .entry(topic.to_string())
                .or_default()
                .push(Subscriber { id, sender });
        }

        debug!(topic, %id, "Subscribed");

        let state = Arc::downgrade(&self.state);
        let owned_topic = topic.to_string();
        Ok(Subscription::new(id, topic, receiver, move |id| {
            if let Some(state) = state.upgrade() {
                if state.lock().remove(&owned_topic, id) {
                    debug!(topic = %owned_topic, %id, "Unsubscribed");
                }
            }
        }))
    }

    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        options: PublishOptions,
    ) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        let mut state = self.state.lock();

        if options.retain {
            if payload.is_empty() {
                state.retained.remove(topic);
            } else {
                state.retained.insert(topic.to_string(), payload.clone());
            }
        }

        if let Some(subscribers) = state.subscribers.get_mut(topic) {
            subscribers.retain(|subscriber| {
                let delivery = Delivery {
                    topic: topic.to_string(),
                    payload: payload.clone(),
                    retained: false,
                };
                match subscriber.sender.try_send(delivery) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        warn!(topic, id = %subscriber.id, "Subscriber buffer full, message dropped");
                        true
                    }
                    Err(TrySendError::Closed(_)) => false,
                }
            });
        }

        drop(state);

        self.published.fetch_add(1, Ordering::Relaxed);
        trace!(topic, bytes = payload.len(), retain = options.retain, qos = ?options.qos, "Published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broker_config_default() {
        let config = BrokerConfig::default();
        assert_eq!(config.subscription_buffer_size, 64);
        assert_eq!(config.max_subscriptions, 256);
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers_in_order() {
        let broker = MemoryBroker::default();
        let mut sub = broker.subscribe("cmd/dev/all/go-idle").await.unwrap();

        for n in 0..3u8 {
            broker
                .publish("cmd/dev/all/go-idle", vec![n], PublishOptions::default())
                .await
                .unwrap();
        }

        for n in 0..3u8 {
            let delivery = sub.recv().await.unwrap();
            assert_eq!(delivery.payload, vec![n]);
            assert!(!delivery.retained);
        }
        assert_eq!(broker.published_count(), 3);
    }

    #[tokio::test]
    async fn test_exact_topic_routing() {
        let broker = MemoryBroker::default();
        let mut summit = broker.subscribe("cmd/dev/summit/goto-beat").await.unwrap();
        let _basecamp = broker.subscribe("cmd/dev/basecamp/goto-beat").await.unwrap();

        broker
            .publish("cmd/dev/basecamp/goto-beat", b"x".to_vec(), PublishOptions::default())
            .await
            .unwrap();

        assert!(summit.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_retained_replayed_to_late_subscriber() {
        let broker = MemoryBroker::default();
        broker
            .publish("state/basecamp", b"first".to_vec(), PublishOptions::retained())
            .await
            .unwrap();
        broker
            .publish("state/basecamp", b"second".to_vec(), PublishOptions::retained())
            .await
            .unwrap();

        let mut sub = broker.subscribe("state/basecamp").await.unwrap();
        let delivery = sub.recv().await.unwrap();
        assert_eq!(delivery.payload, b"second");
        assert!(delivery.retained);
    }

    #[tokio::test]
    async fn test_non_retained_not_stored() {
        let broker = MemoryBroker::default();
        broker
            .publish("state/summit", b"ack".to_vec(), PublishOptions::default())
            .await
            .unwrap();
        assert!(broker.retained("state/summit").is_none());
    }

    #[tokio::test]
    async fn test_empty_retained_clears() {
        let broker = MemoryBroker::default();
        broker
            .publish("state/summit", b"v".to_vec(), PublishOptions::retained())
            .await
            .unwrap();
        broker
            .publish("state/summit", Vec::new(), PublishOptions::retained())
            .await
            .unwrap();
        assert!(broker.retained("state/summit").is_none());
    }

    #[tokio::test]
    async fn test_close_removes_only_own_subscription() {
        let broker = MemoryBroker::default();
        let first = broker.subscribe("state/summit").await.unwrap();
        let mut second = broker.subscribe("state/summit").await.unwrap();
        assert_eq!(broker.subscriber_count("state/summit"), 2);

        first.close();
        assert_eq!(broker.subscriber_count("state/summit"), 1);

        broker
            .publish("state/summit", b"v".to_vec(), PublishOptions::default())
            .await
            .unwrap();
        assert_eq!(second.recv().await.unwrap().payload, b"v");
    }

    #[tokio::test]
    async fn test_drop_on_plain_thread_unsubscribes() {
        let broker = MemoryBroker::default();
        let sub = broker.subscribe("state/basecamp").await.unwrap();
        let _other = broker.subscribe("state/basecamp").await.unwrap();

        // The closer takes the broker lock synchronously, outside any runtime
        std::thread::spawn(move || drop(sub)).join().unwrap();
        assert_eq!(broker.subscriber_count("state/basecamp"), 1);

        broker
            .publish("state/basecamp", b"v".to_vec(), PublishOptions::retained())
            .await
            .unwrap();
        assert_eq!(broker.retained("state/basecamp").as_deref(), Some(&b"v"[..]));
    }

    #[tokio::test]
    async fn test_disconnected_rejects() {
        let broker = MemoryBroker::default();
        broker.set_connected(false);

        assert!(matches!(
            broker.subscribe("state/summit").await,
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(
            broker
                .publish("state/summit", b"v".to_vec(), PublishOptions::retained())
                .await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_subscription_limit() {
        let broker = MemoryBroker::new(BrokerConfig {
            max_subscriptions: 1,
            ..Default::default()
        });
        let _first = broker.subscribe("a").await.unwrap();
        assert!(matches!(
            broker.subscribe("b").await,
            Err(TransportError::SubscriptionLimit(1))
        ));
    }

    #[tokio::test]
    async fn test_full_buffer_drops() {
        let broker = MemoryBroker::new(BrokerConfig {
            subscription_buffer_size: 1,
            ..Default::default()
        });
        let mut sub = broker.subscribe("t").await.unwrap();

        for n in 0..3u8 {
            broker.publish("t", vec![n], PublishOptions::default()).await.unwrap();
        }

        assert_eq!(sub.recv().await.unwrap().payload, vec![0]);
        assert_eq!(broker.subscriber_count("t"), 1);
    }
}
