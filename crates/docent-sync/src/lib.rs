//! Docent Sync - Per-exhibit runtime
//!
//! Each exhibit runs one [`Synchronizer`] that owns its navigation cursor and
//! its reported state. Around it:
//!
//! - [`CommandRouter`] subscribes to the exhibit's command topics and hands
//!   parsed commands to the synchronizer
//! - [`RecoveryManager`] reads the retained `state/{exhibit}` value once at
//!   boot so a restarted exhibit resumes where it was
//! - [`Controller`] moves the cursor locally without reporting
//!
//! [`ExhibitRuntime`] mounts all of them for one exhibit.
//!
//! # Example
//!
//! ```ignore
//! use docent_sync::{ExhibitRuntime, RuntimeConfig, StaticContent};
//!
//! let runtime = ExhibitRuntime::mount(
//!     RuntimeConfig::for_exhibit(ExhibitKind::Basecamp),
//!     client,
//!     Arc::new(StaticContent::new()),
//!     None,
//! )
//! .await?;
//! println!("{:?}", runtime.handle().reported());
//! ```

pub mod config;
pub mod content;
pub mod controller;
pub mod error;
pub mod recovery;
pub mod router;
pub mod runtime;
pub mod synchronizer;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::{ConfigError, RuntimeConfig, SyncConfig};
pub use content::{ContentFetcher, ExhibitContent, FetchError, StaticContent};
pub use controller::Controller;
pub use error::{ErrorCallback, RecoveryError, Result, SyncError};
pub use recovery::{RecoveredState, RecoveryManager};
pub use router::CommandRouter;
pub use runtime::{ExhibitRuntime, RecoveryOutcome};
pub use synchronizer::{SyncHandle, Synchronizer, SynchronizerBuilder};
