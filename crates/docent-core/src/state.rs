//! Navigation and reported state
//!
//! Two pieces of state exist per exhibit:
//!
//! - [`ExhibitNavigationState`] - the local UI cursor, never sent on the wire
//! - [`ReportedState`] - the externally reported state published (retained)
//!   on `state/{exhibit}`
//!
//! Reported state is only ever changed through [`merge`], a shallow merge of
//! a [`StatePatch`] over the previous value.

use crate::exhibit::ExhibitProfile;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Slide reported while no tour is active
pub const SLIDE_IDLE: &str = "idle";
/// Slide reported while tour content is being fetched
pub const SLIDE_LOADING: &str = "loading";
/// Slide reported when tour content could not be fetched
pub const SLIDE_ERROR: &str = "error";

/// Wire field for the tour identifier
pub const FIELD_TOUR_ID: &str = "tour-id";
/// Wire field for the master volume level
pub const FIELD_VOLUME_LEVEL: &str = "volume-level";
/// Wire field for the master mute flag
pub const FIELD_VOLUME_MUTED: &str = "volume-muted";

/// Whether a slide value is a status sentinel rather than a beat id
pub fn is_sentinel_slide(slide: &str) -> bool {
    matches!(slide, SLIDE_IDLE | SLIDE_LOADING | SLIDE_ERROR)
}

/// Local navigation cursor (0-indexed beat within a moment)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExhibitNavigationState {
    pub moment_id: String,
    pub beat_idx: usize,
}

impl ExhibitNavigationState {
    pub fn new(moment_id: impl Into<String>, beat_idx: usize) -> Self {
        Self {
            moment_id: moment_id.into(),
            beat_idx,
        }
    }
}

/// Reported state decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("Reported state is not a JSON object")]
    NotAnObject,

    #[error("Invalid field '{field}': expected {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
}

/// Externally reported exhibit state
#[derive(Debug, Clone, PartialEq)]
pub struct ReportedState {
    /// Beat id or status sentinel (`slide` or `beat-id` on the wire)
    pub slide: String,
    /// Active tour; `None` means idle/ambient
    pub tour_id: Option<String>,
    /// Master volume level (0.0 - 1.0)
    pub volume_level: f64,
    /// Master mute flag
    pub volume_muted: bool,
}

impl Default for ReportedState {
    fn default() -> Self {
        Self::idle()
    }
}

impl ReportedState {
    /// Idle default used before anything was reported
    pub fn idle() -> Self {
        Self {
            slide: SLIDE_IDLE.to_string(),
            tour_id: None,
            volume_level: 1.0,
            volume_muted: false,
        }
    }

    /// Whether this state describes an idle exhibit
    pub fn is_idle(&self) -> bool {
        self.tour_id.is_none()
    }

    /// Encode as the flat wire object for `profile`
    pub fn to_wire(&self, profile: &ExhibitProfile) -> Value {
        let mut object = Map::new();
        object.insert(
            profile.state_beat_field.to_string(),
            Value::String(self.slide.clone()),
        );
        object.insert(
            FIELD_TOUR_ID.to_string(),
            self.tour_id.clone().map(Value::String).unwrap_or(Value::Null),
        );
        object.insert(FIELD_VOLUME_LEVEL.to_string(), Value::from(self.volume_level));
        object.insert(FIELD_VOLUME_MUTED.to_string(), Value::Bool(self.volume_muted));
        Value::Object(object)
    }

    /// Decode a wire object for `profile`
    ///
    /// Missing fields take their idle defaults; present fields of the wrong
    /// type are rejected.
    pub fn from_wire(profile: &ExhibitProfile, value: &Value) -> Result<Self, StateError> {
        let object = value.as_object().ok_or(StateError::NotAnObject)?;
        let mut state = Self::idle();

        if let Some(slide) = object.get(profile.state_beat_field) {
            state.slide = slide
                .as_str()
                .ok_or(StateError::InvalidField {
                    field: profile.state_beat_field,
                    expected: "a string",
                })?
                .to_string();
        }

        match object.get(FIELD_TOUR_ID) {
            None | Some(Value::Null) => {}
            Some(Value::String(tour_id)) => state.tour_id = Some(tour_id.clone()),
            Some(_) => {
                return Err(StateError::InvalidField {
                    field: FIELD_TOUR_ID,
                    expected: "a string or null",
                });
            }
        }

        if let Some(level) = object.get(FIELD_VOLUME_LEVEL) {
            state.volume_level = level.as_f64().ok_or(StateError::InvalidField {
                field: FIELD_VOLUME_LEVEL,
                expected: "a number",
            })?;
        }

        if let Some(muted) = object.get(FIELD_VOLUME_MUTED) {
            state.volume_muted = muted.as_bool().ok_or(StateError::InvalidField {
                field: FIELD_VOLUME_MUTED,
                expected: "a boolean",
            })?;
        }

        Ok(state)
    }
}

/// Partial update of [`ReportedState`]; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub slide: Option<String>,
    /// `Some(None)` clears the tour
    pub tour_id: Option<Option<String>>,
    pub volume_level: Option<f64>,
    pub volume_muted: Option<bool>,
}

impl StatePatch {
    /// Empty patch
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slide(mut self, slide: impl Into<String>) -> Self {
        self.slide = Some(slide.into());
        self
    }

    pub fn tour_id(mut self, tour_id: Option<String>) -> Self {
        self.tour_id = Some(tour_id);
        self
    }

    pub fn volume(mut self, level: f64, muted: bool) -> Self {
        self.volume_level = Some(level);
        self.volume_muted = Some(muted);
        self
    }

    /// Whether applying this patch changes nothing
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Shallow merge of `patch` over `old`
pub fn merge(old: &ReportedState, patch: &StatePatch) -> ReportedState {
    ReportedState {
        slide: patch.slide.clone().unwrap_or_else(|| old.slide.clone()),
        tour_id: patch.tour_id.clone().unwrap_or_else(|| old.tour_id.clone()),
        volume_level: patch.volume_level.unwrap_or(old.volume_level),
        volume_muted: patch.volume_muted.unwrap_or(old.volume_muted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exhibit::ExhibitKind;
    use serde_json::json;

    fn touring() -> ReportedState {
        ReportedState {
            slide: "welcome-1".to_string(),
            tour_id: Some("t1".to_string()),
            volume_level: 1.0,
            volume_muted: false,
        }
    }

    #[test]
    fn test_empty_patch_is_identity() {
        let old = touring();
        assert!(StatePatch::new().is_empty());
        assert_eq!(merge(&old, &StatePatch::new()), old);
    }

    #[test]
    fn test_merge_preserves_unspecified_fields() {
        let merged = merge(&touring(), &StatePatch::new().slide("welcome-2"));
        assert_eq!(
            merged,
            ReportedState {
                slide: "welcome-2".to_string(),
                ..touring()
            }
        );
    }

    #[test]
    fn test_merge_can_clear_tour() {
        let merged = merge(&touring(), &StatePatch::new().tour_id(None));
        assert!(merged.is_idle());
        assert_eq!(merged.slide, "welcome-1");
    }

    #[test]
    fn test_wire_field_names() {
        let basecamp = touring().to_wire(ExhibitKind::Basecamp.profile());
        assert_eq!(
            basecamp,
            json!({"slide": "welcome-1", "tour-id": "t1", "volume-level": 1.0, "volume-muted": false})
        );

        let summit = ReportedState::idle().to_wire(ExhibitKind::Summit.profile());
        assert_eq!(
            summit,
            json!({"beat-id": "idle", "tour-id": null, "volume-level": 1.0, "volume-muted": false})
        );
    }

    #[test]
    fn test_from_wire() {
        let profile = ExhibitKind::Basecamp.profile();
        let value = json!({"slide": "welcome-3", "tour-id": "t1", "volume-level": 1, "volume-muted": false});
        let state = ReportedState::from_wire(profile, &value).unwrap();
        assert_eq!(state.slide, "welcome-3");
        assert_eq!(state.tour_id.as_deref(), Some("t1"));
        assert_eq!(state.volume_level, 1.0);

        let sparse = ReportedState::from_wire(profile, &json!({})).unwrap();
        assert_eq!(sparse, ReportedState::idle());
    }

    #[test]
    fn test_from_wire_rejects_bad_types() {
        let profile = ExhibitKind::Basecamp.profile();
        assert_eq!(
            ReportedState::from_wire(profile, &json!([])),
            Err(StateError::NotAnObject)
        );
        assert!(matches!(
            ReportedState::from_wire(profile, &json!({"volume-muted": "yes"})),
            Err(StateError::InvalidField { field: FIELD_VOLUME_MUTED, .. })
        ));
        assert!(ReportedState::from_wire(profile, &json!({"tour-id": 4})).is_err());
    }

    #[test]
    fn test_sentinels() {
        assert!(is_sentinel_slide("idle"));
        assert!(is_sentinel_slide("loading"));
        assert!(is_sentinel_slide("error"));
        assert!(!is_sentinel_slide("welcome-1"));
    }
}
