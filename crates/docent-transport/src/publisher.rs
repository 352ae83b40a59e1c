//! Docent-side command publishing
//!
//! Commands are fire-and-forget: no retain, QoS 0. A retained command would
//! be replayed to every exhibit that reboots later.

use crate::client::{PubSubClient, PublishOptions, TransportError};
use docent_core::{Command, ExhibitKind, Topic};
use std::sync::Arc;
use tracing::debug;

/// Publishes commands on the exhibit topic scheme
#[derive(Clone)]
pub struct CommandPublisher {
    client: Arc<dyn PubSubClient>,
}

impl CommandPublisher {
    pub fn new(client: Arc<dyn PubSubClient>) -> Self {
        Self { client }
    }

    /// Broadcast `load-tour` to every exhibit
    pub async fn load_tour(&self, tour_id: impl Into<String>) -> Result<(), TransportError> {
        self.broadcast(&Command::LoadTour {
            tour_id: tour_id.into(),
        })
        .await
    }

    /// Broadcast `go-idle` to every exhibit
    pub async fn go_idle(&self, reason: Option<String>) -> Result<(), TransportError> {
        self.broadcast(&Command::GoIdle { reason }).await
    }

    /// Broadcast `end-tour` to every exhibit
    pub async fn end_tour(&self) -> Result<(), TransportError> {
        self.broadcast(&Command::EndTour).await
    }

    /// Send `goto-beat` to one exhibit
    pub async fn goto_beat(
        &self,
        exhibit: ExhibitKind,
        beat_id: impl Into<String>,
    ) -> Result<(), TransportError> {
        let command = Command::GotoBeat {
            beat_id: beat_id.into(),
        };
        let topic = Topic::command(exhibit, command.kind());
        let payload = command.to_payload(exhibit.profile().goto_beat_field);
        self.send(&topic, payload).await
    }

    async fn broadcast(&self, command: &Command) -> Result<(), TransportError> {
        let topic = Topic::Broadcast(command.kind());
        // Broadcast bodies carry no beat field
        self.send(&topic, command.to_payload("")).await
    }

    async fn send(&self, topic: &Topic, payload: Vec<u8>) -> Result<(), TransportError> {
        let topic = topic.to_string();
        debug!(topic = %topic, "Publishing command");
        self.client
            .publish(&topic, payload, PublishOptions::default())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBroker;
    use docent_core::CommandKind;

    #[tokio::test]
    async fn test_commands_land_on_contract_topics() {
        let broker = Arc::new(MemoryBroker::default());
        let publisher = CommandPublisher::new(broker.clone());

        let mut load = broker.subscribe("cmd/dev/all/load-tour").await.unwrap();
        let mut idle = broker.subscribe("cmd/dev/all/go-idle").await.unwrap();
        let mut end = broker.subscribe("cmd/dev/all/end-tour").await.unwrap();
        let mut goto = broker.subscribe("cmd/dev/summit/goto-beat").await.unwrap();

        publisher.load_tour("t1").await.unwrap();
        publisher.go_idle(None).await.unwrap();
        publisher.end_tour().await.unwrap();
        publisher
            .goto_beat(ExhibitKind::Summit, "case-study-2")
            .await
            .unwrap();

        let summit = ExhibitKind::Summit.profile();
        let delivery = load.recv().await.unwrap();
        assert_eq!(
            Command::parse(CommandKind::LoadTour, summit, &delivery.payload).unwrap(),
            Command::LoadTour {
                tour_id: "t1".to_string()
            }
        );
        assert!(idle.recv().await.is_some());
        assert!(end.recv().await.is_some());

        let delivery = goto.recv().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&delivery.payload).unwrap();
        assert_eq!(body["body"]["beat_id"], "case-study-2");
    }

    #[tokio::test]
    async fn test_commands_are_not_retained() {
        let broker = Arc::new(MemoryBroker::default());
        let publisher = CommandPublisher::new(broker.clone());

        publisher.load_tour("t1").await.unwrap();
        assert!(broker.retained("cmd/dev/all/load-tour").is_none());
    }
}
