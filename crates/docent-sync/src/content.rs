//! Exhibit content fetching
//!
//! Content (copy, media manifests, tour data) is owned by an external
//! service. The runtime only needs "give me the content for this exhibit and
//! tour" and a failure signal.

use async_trait::async_trait;
use docent_core::ExhibitKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Content loaded for an exhibit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExhibitContent {
    pub exhibit: ExhibitKind,
    /// `None` for exhibits whose content is not tour scoped
    pub tour_id: Option<String>,
    pub data: Value,
}

/// Content fetch errors
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("No content for tour '{0}'")]
    NotFound(String),

    #[error("Content service unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid content: {0}")]
    Invalid(String),
}

/// External content-fetch collaborator
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch content; `tour_id` is `None` for the no-tour variant
    async fn fetch(
        &self,
        exhibit: ExhibitKind,
        tour_id: Option<&str>,
    ) -> Result<ExhibitContent, FetchError>;
}

/// In-memory content source
///
/// Serves fixed documents per tour id, optionally after a delay. Used by the
/// CLI simulation and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticContent {
    tours: HashMap<String, Value>,
    untoured: Option<Value>,
    delay: Duration,
}

impl StaticContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `data` for `tour_id`
    pub fn with_tour(mut self, tour_id: impl Into<String>, data: Value) -> Self {
        self.tours.insert(tour_id.into(), data);
        self
    }

    /// Serve `data` for no-tour fetches
    pub fn with_untoured(mut self, data: Value) -> Self {
        self.untoured = Some(data);
        self
    }

    /// Delay every response
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl ContentFetcher for StaticContent {
    async fn fetch(
        &self,
        exhibit: ExhibitKind,
        tour_id: Option<&str>,
    ) -> Result<ExhibitContent, FetchError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let data = match tour_id {
            Some(tour_id) => self
                .tours
                .get(tour_id)
                .cloned()
                .ok_or_else(|| FetchError::NotFound(tour_id.to_string()))?,
            None => self
                .untoured
                .clone()
                .ok_or_else(|| FetchError::NotFound("<none>".to_string()))?,
        };

        Ok(ExhibitContent {
            exhibit,
            tour_id: tour_id.map(str::to_string),
            data,
        })
    }
}
