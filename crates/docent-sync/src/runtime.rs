//! Exhibit runtime
//!
//! Wires one exhibit together: synchronizer, command router and boot-time
//! recovery. Recovery runs alongside the router, so commands arriving during
//! recovery are handled immediately and a late recovery result is discarded.

use crate::config::RuntimeConfig;
use crate::content::ContentFetcher;
use crate::controller::Controller;
use crate::error::{ErrorCallback, Result};
use crate::recovery::RecoveryManager;
use crate::router::CommandRouter;
use crate::synchronizer::{SyncHandle, Synchronizer};
use docent_core::ExhibitKind;
use docent_transport::PubSubClient;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{Instrument, info, info_span, warn};

/// Outcome of boot-time recovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// Retained state was applied
    Restored,
    /// Retained state arrived after a command and was dropped
    Superseded,
    /// Nothing usable was retained
    Empty,
    /// Recovery was disabled or failed
    Skipped,
}

/// A mounted exhibit
pub struct ExhibitRuntime {
    exhibit: ExhibitKind,
    handle: SyncHandle,
    router: CommandRouter,
    synchronizer: JoinHandle<()>,
    recovery: Option<JoinHandle<RecoveryOutcome>>,
}

impl ExhibitRuntime {
    /// Start the synchronizer, mount the router and begin recovery
    pub async fn mount(
        config: RuntimeConfig,
        client: Arc<dyn PubSubClient>,
        fetcher: Arc<dyn ContentFetcher>,
        on_error: Option<ErrorCallback>,
    ) -> Result<Self> {
        let exhibit = config.exhibit;
        let mut builder = Synchronizer::builder(exhibit)
            .config(config.sync.clone())
            .client(client.clone())
            .fetcher(fetcher);
        if let Some(callback) = on_error {
            builder = builder.on_error(callback);
        }
        let (handle, synchronizer) = builder.spawn()?;

        let router = match CommandRouter::mount(client.clone(), handle.clone()).await {
            Ok(router) => router,
            Err(e) => {
                let _ = handle.shutdown().await;
                return Err(e);
            }
        };

        let recovery = config.recover_on_mount.then(|| {
            let manager = RecoveryManager::new(client, exhibit, config.recovery_timeout());
            let span = info_span!("recovery", exhibit = %exhibit);
            tokio::spawn(recover(manager, handle.clone()).instrument(span))
        });

        info!(exhibit = %exhibit, recover = config.recover_on_mount, "Exhibit mounted");
        Ok(Self {
            exhibit,
            handle,
            router,
            synchronizer,
            recovery,
        })
    }

    pub fn exhibit(&self) -> ExhibitKind {
        self.exhibit
    }

    /// Handle to this exhibit's synchronizer
    pub fn handle(&self) -> &SyncHandle {
        &self.handle
    }

    /// New local navigation controller
    pub fn controller(&self) -> Controller {
        Controller::new(self.handle.clone())
    }

    /// Wait for boot-time recovery to finish
    pub async fn wait_recovered(&mut self) -> RecoveryOutcome {
        match self.recovery.take() {
            Some(task) => task.await.unwrap_or(RecoveryOutcome::Skipped),
            None => RecoveryOutcome::Skipped,
        }
    }

    /// Stop routing, recovery and the synchronizer
    pub async fn unmount(self) {
        let Self {
            exhibit,
            handle,
            router,
            synchronizer,
            recovery,
        } = self;

        if let Some(task) = recovery {
            task.abort();
        }
        router.unmount().await;
        let _ = handle.shutdown().await;
        let _ = synchronizer.await;
        info!(exhibit = %exhibit, "Exhibit unmounted");
    }
}

async fn recover(manager: RecoveryManager, handle: SyncHandle) -> RecoveryOutcome {
    match manager.recover_once().await {
        Ok(Some(state)) => match handle.restore(state).await {
            Ok(true) => RecoveryOutcome::Restored,
            Ok(false) => RecoveryOutcome::Superseded,
            Err(_) => RecoveryOutcome::Skipped,
        },
        Ok(None) => RecoveryOutcome::Empty,
        Err(e) => {
            warn!(error = %e, "Recovery failed, starting idle");
            RecoveryOutcome::Skipped
        }
    }
}
