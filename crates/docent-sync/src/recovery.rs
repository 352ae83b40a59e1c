//! Boot-time recovery from the retained state topic
//!
//! The broker keeps the last report on `state/{exhibit}`. On boot an exhibit
//! subscribes once, takes the first message (the retained value, if any),
//! unsubscribes and rebuilds its in-memory state from it. Later messages on
//! that topic are never consumed.

use crate::error::RecoveryError;
use docent_core::state::is_sentinel_slide;
use docent_core::{ExhibitKind, ExhibitNavigationState, ReportedState, Topic};
use docent_transport::{Codec, PubSubClient};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// State rebuilt from a retained report
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveredState {
    pub reported: ReportedState,
    /// `None` when the retained slide was a sentinel or did not decode
    pub navigation: Option<ExhibitNavigationState>,
}

/// One-shot retained state reader
///
/// `recover_once` consumes the manager, so a second recovery needs a new one.
pub struct RecoveryManager {
    client: Arc<dyn PubSubClient>,
    exhibit: ExhibitKind,
    timeout: Duration,
    codec: Codec,
}

impl RecoveryManager {
    pub fn new(client: Arc<dyn PubSubClient>, exhibit: ExhibitKind, timeout: Duration) -> Self {
        Self {
            client,
            exhibit,
            timeout,
            codec: Codec::Json,
        }
    }

    /// Read the retained state, if the broker has one
    ///
    /// Returns `Ok(None)` when nothing arrives within the timeout or the
    /// retained value is empty.
    pub async fn recover_once(self) -> Result<Option<RecoveredState>, RecoveryError> {
        let topic = Topic::State(self.exhibit).to_string();
        let mut subscription = self.client.subscribe(&topic).await?;

        let first = tokio::time::timeout(self.timeout, subscription.recv()).await;
        subscription.close();

        let delivery = match first {
            Ok(Some(delivery)) => delivery,
            Ok(None) => {
                debug!(topic = %topic, "Subscription closed before any state arrived");
                return Ok(None);
            }
            Err(_) => {
                debug!(topic = %topic, timeout = ?self.timeout, "No retained state");
                return Ok(None);
            }
        };

        if delivery.payload.is_empty() {
            debug!(topic = %topic, "Retained state was cleared");
            return Ok(None);
        }

        let value: Value = self.codec.decode(&delivery.payload)?;
        let recovered = self.rebuild(&value)?;
        info!(
            topic = %topic,
            slide = %recovered.reported.slide,
            "Recovered retained state"
        );
        Ok(Some(recovered))
    }

    fn rebuild(&self, value: &Value) -> Result<RecoveredState, RecoveryError> {
        let profile = self.exhibit.profile();
        let reported = ReportedState::from_wire(profile, value)?;

        let navigation = if is_sentinel_slide(&reported.slide) {
            None
        } else {
            match profile.decode_beat(&reported.slide) {
                Ok(state) => Some(state),
                Err(e) => {
                    warn!(slide = %reported.slide, error = %e, "Retained slide did not decode");
                    None
                }
            }
        };

        Ok(RecoveredState {
            reported,
            navigation,
        })
    }
}
