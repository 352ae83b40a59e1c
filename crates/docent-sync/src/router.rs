//! Command routing
//!
//! Subscribes to an exhibit's command topics and hands parsed commands to its
//! synchronizer. One task per topic; a malformed message is logged and
//! dropped without affecting later ones.

use crate::error::Result;
use crate::synchronizer::SyncHandle;
use docent_core::{Command, CommandKind, ExhibitProfile, Topic};
use docent_transport::{PubSubClient, Subscription};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

/// Mounted command subscriptions for one exhibit
pub struct CommandRouter {
    tasks: Vec<JoinHandle<()>>,
}

impl CommandRouter {
    /// Subscribe to every command topic and start routing
    ///
    /// If any subscription fails, the ones already made are released.
    pub async fn mount(client: Arc<dyn PubSubClient>, handle: SyncHandle) -> Result<Self> {
        let exhibit = handle.exhibit();
        let mut subscriptions = Vec::new();

        for topic in Topic::command_topics(exhibit) {
            let Some(kind) = topic.command_kind() else {
                continue;
            };
            let subscription = client.subscribe(&topic.to_string()).await?;
            subscriptions.push((kind, subscription));
        }

        let tasks = subscriptions
            .into_iter()
            .map(|(kind, subscription)| {
                let span = info_span!("route", exhibit = %exhibit, command = %kind);
                tokio::spawn(
                    route(kind, exhibit.profile(), subscription, handle.clone()).instrument(span),
                )
            })
            .collect();

        info!(exhibit = %exhibit, "Command router mounted");
        Ok(Self { tasks })
    }

    /// Stop routing and release every subscription
    pub async fn unmount(mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
            let _ = task.await;
        }
        debug!("Command router unmounted");
    }
}

impl Drop for CommandRouter {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn route(
    kind: CommandKind,
    profile: &'static ExhibitProfile,
    mut subscription: Subscription,
    handle: SyncHandle,
) {
    while let Some(delivery) = subscription.recv().await {
        let command = match Command::parse(kind, profile, &delivery.payload) {
            Ok(command) => command,
            Err(e) => {
                warn!(topic = %delivery.topic, error = %e, "Dropping malformed command");
                continue;
            }
        };

        debug!(topic = %delivery.topic, ?command, "Routing command");
        if handle.dispatch(command).await.is_err() {
            debug!("Synchronizer stopped, ending route");
            break;
        }
    }
}
