//! Error types for the exhibit runtime

use docent_core::{NavigationError, StateError};
use docent_transport::{CodecError, TransportError};
use std::sync::Arc;
use thiserror::Error;

/// Synchronizer and router errors
#[derive(Debug, Error)]
pub enum SyncError {
    /// The synchronizer task has stopped
    #[error("Synchronizer stopped")]
    Stopped,

    /// A required collaborator was not supplied to the builder
    #[error("Missing dependency: {0}")]
    MissingDependency(&'static str),

    /// The transport rejected a state report
    #[error("Publish to '{topic}' failed: {source}")]
    Publish {
        topic: String,
        #[source]
        source: TransportError,
    },

    /// Subscribing or another transport operation failed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// State could not be encoded
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Local navigation request was invalid
    #[error(transparent)]
    Navigation(#[from] NavigationError),
}

/// Boot-time recovery errors
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Invalid retained state: {0}")]
    State(#[from] StateError),
}

/// Callback receiving publish failures
pub type ErrorCallback = Arc<dyn Fn(&SyncError) + Send + Sync>;

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, SyncError>;
