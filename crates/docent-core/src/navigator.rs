//! Local slide navigation
//!
//! Rendering code moves through beats with `next`/`prev`/`go_to` without
//! involving the pub/sub layer. Moments register how many beats they have
//! once their content is known; positions are clamped to those counts.

use crate::exhibit::ExhibitProfile;
use crate::state::ExhibitNavigationState;
use std::collections::HashMap;
use thiserror::Error;

/// Navigation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("Unknown moment: {0}")]
    UnknownMoment(String),

    #[error("Moment has no registered beats: {0}")]
    NotRegistered(String),
}

/// Beat-count aware cursor arithmetic for one exhibit
#[derive(Debug, Clone)]
pub struct Navigator {
    profile: &'static ExhibitProfile,
    beat_counts: HashMap<&'static str, usize>,
}

impl Navigator {
    pub fn new(profile: &'static ExhibitProfile) -> Self {
        Self {
            profile,
            beat_counts: HashMap::new(),
        }
    }

    /// Register the beat count of a moment
    pub fn register(&mut self, moment_id: &str, beat_count: usize) -> Result<(), NavigationError> {
        let moment = self
            .profile
            .moments
            .iter()
            .find(|m| **m == moment_id)
            .ok_or_else(|| NavigationError::UnknownMoment(moment_id.to_string()))?;

        if beat_count == 0 {
            self.beat_counts.remove(moment);
        } else {
            self.beat_counts.insert(*moment, beat_count);
        }
        Ok(())
    }

    /// Forget a moment's beat count
    pub fn unregister(&mut self, moment_id: &str) -> bool {
        self.beat_counts.remove(moment_id).is_some()
    }

    /// Registered beat count of a moment
    pub fn beat_count(&self, moment_id: &str) -> Option<usize> {
        self.beat_counts.get(moment_id).copied()
    }

    /// Clamp a position to the registered beat count of its moment
    pub fn clamp(&self, state: &ExhibitNavigationState) -> ExhibitNavigationState {
        match self.beat_count(&state.moment_id) {
            Some(count) => ExhibitNavigationState::new(
                state.moment_id.clone(),
                state.beat_idx.min(count - 1),
            ),
            None => state.clone(),
        }
    }

    /// Position of an explicit jump
    pub fn go_to(
        &self,
        moment_id: &str,
        beat_idx: usize,
    ) -> Result<ExhibitNavigationState, NavigationError> {
        if !self.profile.is_moment(moment_id) {
            return Err(NavigationError::UnknownMoment(moment_id.to_string()));
        }
        let count = self
            .beat_count(moment_id)
            .ok_or_else(|| NavigationError::NotRegistered(moment_id.to_string()))?;

        Ok(ExhibitNavigationState::new(
            moment_id,
            beat_idx.min(count - 1),
        ))
    }

    /// Next beat, rolling into the next registered moment
    pub fn next(&self, current: &ExhibitNavigationState) -> ExhibitNavigationState {
        let current = self.clamp(current);
        if let Some(count) = self.beat_count(&current.moment_id) {
            if current.beat_idx + 1 < count {
                return ExhibitNavigationState::new(current.moment_id, current.beat_idx + 1);
            }
        }

        let start = self
            .profile
            .moment_index(&current.moment_id)
            .map_or(0, |i| i + 1);
        self.profile.moments[start.min(self.profile.moments.len())..]
            .iter()
            .find(|m| self.beat_counts.contains_key(*m))
            .map(|m| ExhibitNavigationState::new(*m, 0))
            .unwrap_or(current)
    }

    /// Previous beat, rolling back into the last beat of the previous moment
    pub fn prev(&self, current: &ExhibitNavigationState) -> ExhibitNavigationState {
        let current = self.clamp(current);
        if current.beat_idx > 0 {
            return ExhibitNavigationState::new(current.moment_id, current.beat_idx - 1);
        }

        let end = self
            .profile
            .moment_index(&current.moment_id)
            .unwrap_or(0);
        self.profile.moments[..end]
            .iter()
            .rev()
            .find_map(|m| {
                self.beat_count(m)
                    .map(|count| ExhibitNavigationState::new(*m, count - 1))
            })
            .unwrap_or(current)
    }
}
