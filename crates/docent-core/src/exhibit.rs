//! Exhibit kinds and their static profiles
//!
//! Every exhibit kind has a fixed set of moments, a wire field naming
//! convention and a content-fetch flavour. These differ between exhibits
//! and must be preserved as-is; the docent tablet relies on them.

use crate::beat::{BeatError, decode_beat_id, encode_beat_id, first_beat_id};
use crate::state::ExhibitNavigationState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Physical exhibit kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExhibitKind {
    #[serde(rename = "basecamp")]
    Basecamp,
    #[serde(rename = "overlook-wall", alias = "overlook")]
    Overlook,
    #[serde(rename = "summit")]
    Summit,
    #[serde(rename = "welcome-wall")]
    WelcomeWall,
}

/// Exhibit lookup errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExhibitError {
    #[error("Unknown exhibit: {0}")]
    Unknown(String),
}

impl ExhibitKind {
    /// All exhibit kinds
    pub const ALL: [ExhibitKind; 4] = [
        ExhibitKind::Basecamp,
        ExhibitKind::Overlook,
        ExhibitKind::Summit,
        ExhibitKind::WelcomeWall,
    ];

    /// Identifier used in topic names
    pub fn topic_id(&self) -> &'static str {
        match self {
            Self::Basecamp => "basecamp",
            Self::Overlook => "overlook-wall",
            Self::Summit => "summit",
            Self::WelcomeWall => "welcome-wall",
        }
    }

    /// Static profile for this exhibit
    pub fn profile(&self) -> &'static ExhibitProfile {
        match self {
            Self::Basecamp => &BASECAMP,
            Self::Overlook => &OVERLOOK,
            Self::Summit => &SUMMIT,
            Self::WelcomeWall => &WELCOME_WALL,
        }
    }
}

impl fmt::Display for ExhibitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.topic_id())
    }
}

impl FromStr for ExhibitKind {
    type Err = ExhibitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basecamp" => Ok(Self::Basecamp),
            "overlook" | "overlook-wall" => Ok(Self::Overlook),
            "summit" => Ok(Self::Summit),
            "welcome-wall" => Ok(Self::WelcomeWall),
            other => Err(ExhibitError::Unknown(other.to_string())),
        }
    }
}

/// Static description of one exhibit kind
#[derive(Debug)]
pub struct ExhibitProfile {
    /// Exhibit kind
    pub kind: ExhibitKind,
    /// Valid moments in presentation order; the first is the idle moment
    pub moments: &'static [&'static str],
    /// Moment shown once a tour has loaded
    pub tour_start: &'static str,
    /// Name of the beat field in the reported state (`slide` or `beat-id`)
    pub state_beat_field: &'static str,
    /// Name of the beat field in `goto-beat` command bodies
    pub goto_beat_field: &'static str,
    /// Whether content is fetched per tour (false = no-tour fetch)
    pub tour_scoped_content: bool,
}

impl ExhibitProfile {
    /// Moment shown while idle
    pub fn idle_moment(&self) -> &'static str {
        self.moments[0]
    }

    /// Check moment membership
    pub fn is_moment(&self, moment_id: &str) -> bool {
        self.moments.contains(&moment_id)
    }

    /// Position of a moment in presentation order
    pub fn moment_index(&self, moment_id: &str) -> Option<usize> {
        self.moments.iter().position(|m| *m == moment_id)
    }

    /// Navigation state while idle
    pub fn idle_navigation(&self) -> ExhibitNavigationState {
        ExhibitNavigationState::new(self.idle_moment(), 0)
    }

    /// Navigation state right after a tour loads
    pub fn tour_start_navigation(&self) -> ExhibitNavigationState {
        ExhibitNavigationState::new(self.tour_start, 0)
    }

    /// Decode a wire beat id against this exhibit's moments
    pub fn decode_beat(&self, raw: &str) -> Result<ExhibitNavigationState, BeatError> {
        decode_beat_id(raw, self.moments)
    }

    /// Encode a navigation state as a wire beat id
    pub fn encode_beat(&self, state: &ExhibitNavigationState) -> Result<String, BeatError> {
        encode_beat_id(&state.moment_id, state.beat_idx)
    }

    /// Wire id of the first beat of a freshly loaded tour
    pub fn tour_start_beat(&self) -> String {
        first_beat_id(self.tour_start)
    }
}

static BASECAMP: ExhibitProfile = ExhibitProfile {
    kind: ExhibitKind::Basecamp,
    moments: &["ambient", "welcome", "problem", "possibilities", "ascend"],
    tour_start: "welcome",
    state_beat_field: "slide",
    goto_beat_field: "beat-id",
    tour_scoped_content: true,
};

static OVERLOOK: ExhibitProfile = ExhibitProfile {
    kind: ExhibitKind::Overlook,
    moments: &["ambient", "overview", "case-study", "horizon"],
    tour_start: "overview",
    state_beat_field: "slide",
    goto_beat_field: "beat-id",
    tour_scoped_content: true,
};

static SUMMIT: ExhibitProfile = ExhibitProfile {
    kind: ExhibitKind::Summit,
    moments: &["ambient", "journey", "case-study", "solutions", "summit"],
    tour_start: "journey",
    state_beat_field: "beat-id",
    goto_beat_field: "beat_id",
    tour_scoped_content: true,
};

static WELCOME_WALL: ExhibitProfile = ExhibitProfile {
    kind: ExhibitKind::WelcomeWall,
    moments: &["ambient", "welcome"],
    tour_start: "welcome",
    state_beat_field: "beat-id",
    goto_beat_field: "beat-id",
    tour_scoped_content: false,
};
