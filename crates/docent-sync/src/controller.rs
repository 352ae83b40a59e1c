//! Local navigation controller
//!
//! Moves an exhibit's cursor for its own rendering. These moves are local:
//! they update the synchronizer's navigation state but never report it.

use crate::error::Result;
use crate::synchronizer::SyncHandle;
use docent_core::{ExhibitNavigationState, Navigator};
use tracing::debug;

/// Cursor control for one exhibit
pub struct Controller {
    navigator: Navigator,
    handle: SyncHandle,
}

impl Controller {
    pub fn new(handle: SyncHandle) -> Self {
        Self {
            navigator: Navigator::new(handle.exhibit().profile()),
            handle,
        }
    }

    /// Register how many beats a moment has
    pub fn register(&mut self, moment_id: &str, beat_count: usize) -> Result<()> {
        self.navigator.register(moment_id, beat_count)?;
        Ok(())
    }

    pub fn unregister(&mut self, moment_id: &str) -> bool {
        self.navigator.unregister(moment_id)
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Advance one beat
    pub async fn next(&self) -> Result<ExhibitNavigationState> {
        let target = self.navigator.next(&self.handle.navigation());
        self.move_to(target).await
    }

    /// Go back one beat
    pub async fn prev(&self) -> Result<ExhibitNavigationState> {
        let target = self.navigator.prev(&self.handle.navigation());
        self.move_to(target).await
    }

    /// Jump to a beat, clamped to the moment's registered count
    pub async fn go_to(&self, moment_id: &str, beat_idx: usize) -> Result<ExhibitNavigationState> {
        let target = self.navigator.go_to(moment_id, beat_idx)?;
        self.move_to(target).await
    }

    async fn move_to(&self, target: ExhibitNavigationState) -> Result<ExhibitNavigationState> {
        debug!(moment = %target.moment_id, beat = target.beat_idx, "Local navigation");
        self.handle.set_navigation(target.clone()).await?;
        self.handle.flush().await?;
        Ok(target)
    }
}
