//! Volume bridge
//!
//! Follows `state/{exhibit}` and keeps a [`GainGraph`] in step with the
//! reported volume fields. The bridge only reads; it never publishes, so it
//! cannot feed back into the state it follows.

use crate::graph::GainGraph;
use docent_core::{ExhibitKind, Topic};
use docent_transport::{PubSubClient, Subscription, TransportError};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info_span, warn};

/// Running volume bridge for one exhibit
pub struct VolumeBridge {
    task: JoinHandle<()>,
}

impl VolumeBridge {
    /// Subscribe to the exhibit's state topic and start applying updates
    ///
    /// A retained state is applied as soon as it is replayed.
    pub async fn spawn(
        client: Arc<dyn PubSubClient>,
        exhibit: ExhibitKind,
        graph: Arc<RwLock<GainGraph>>,
    ) -> Result<Self, TransportError> {
        let topic = Topic::State(exhibit).to_string();
        let subscription = client.subscribe(&topic).await?;

        let span = info_span!("volume_bridge", exhibit = %exhibit);
        let task = tokio::spawn(follow(subscription, graph).instrument(span));
        Ok(Self { task })
    }

    /// Stop following state updates
    pub async fn stop(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}

async fn follow(mut subscription: Subscription, graph: Arc<RwLock<GainGraph>>) {
    while let Some(delivery) = subscription.recv().await {
        if delivery.payload.is_empty() {
            continue;
        }
        match serde_json::from_slice::<Value>(&delivery.payload) {
            Ok(state) => {
                graph.write().apply_state(&state);
            }
            Err(e) => warn!(topic = %delivery.topic, error = %e, "Ignoring malformed state"),
        }
    }
    debug!("State subscription closed");
}
