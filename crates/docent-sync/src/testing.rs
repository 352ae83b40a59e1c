//! Test doubles shared by the runtime tests

use crate::content::{ContentFetcher, ExhibitContent, FetchError};
use async_trait::async_trait;
use docent_core::ExhibitKind;
use docent_transport::{MemoryBroker, PubSubClient, PublishOptions, Subscription, TransportError};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Fetcher that holds every request until a permit is released
pub struct GatedFetcher {
    inner: Arc<dyn ContentFetcher>,
    gate: Semaphore,
    calls: Mutex<Vec<(ExhibitKind, Option<String>)>>,
}

impl GatedFetcher {
    pub fn new(inner: Arc<dyn ContentFetcher>) -> Self {
        Self {
            inner,
            gate: Semaphore::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Let `n` pending or future fetches complete
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub fn calls(&self) -> Vec<(ExhibitKind, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentFetcher for GatedFetcher {
    async fn fetch(
        &self,
        exhibit: ExhibitKind,
        tour_id: Option<&str>,
    ) -> Result<ExhibitContent, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((exhibit, tour_id.map(str::to_string)));
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
        self.inner.fetch(exhibit, tour_id).await
    }
}

/// Connected client whose broker rejects every operation
pub struct RejectingClient;

#[async_trait]
impl PubSubClient for RejectingClient {
    fn is_connected(&self) -> bool {
        true
    }

    async fn subscribe(&self, _topic: &str) -> Result<Subscription, TransportError> {
        Err(TransportError::SubscriptionLimit(0))
    }

    async fn publish(
        &self,
        topic: &str,
        _payload: Vec<u8>,
        _options: PublishOptions,
    ) -> Result<(), TransportError> {
        Err(TransportError::PublishRejected {
            topic: topic.to_string(),
            reason: "quota exceeded".to_string(),
        })
    }
}

/// Decode the retained value of `topic`
pub fn retained_state(broker: &MemoryBroker, topic: &str) -> Value {
    let payload = broker.retained(topic).expect("nothing retained");
    serde_json::from_slice(&payload).unwrap()
}
