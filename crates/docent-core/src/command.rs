//! Command envelopes
//!
//! Every command is a JSON object of the form `{ "body": { ... } }`. The body
//! shape depends on the command; it is parsed once at the topic boundary into
//! the closed [`Command`] set so the rest of the system never sees raw JSON.

use crate::exhibit::ExhibitProfile;
use crate::topic::CommandKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// JSON command envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub body: T,
}

#[derive(Debug, Deserialize)]
struct LoadTourBody {
    #[serde(rename = "tour-id")]
    tour_id: String,
}

#[derive(Debug, Deserialize)]
struct GoIdleBody {
    #[serde(default)]
    reason: Option<String>,
}

/// Command parsing errors
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Malformed {command} payload: {source}")]
    Malformed {
        command: CommandKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing string field '{field}' in {command} body")]
    MissingField {
        command: CommandKind,
        field: &'static str,
    },

    #[error("Empty field '{field}' in {command} body")]
    EmptyField {
        command: CommandKind,
        field: &'static str,
    },
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    LoadTour { tour_id: String },
    GoIdle { reason: Option<String> },
    EndTour,
    GotoBeat { beat_id: String },
}

impl Command {
    /// Command kind (and therefore topic segment)
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::LoadTour { .. } => CommandKind::LoadTour,
            Self::GoIdle { .. } => CommandKind::GoIdle,
            Self::EndTour => CommandKind::EndTour,
            Self::GotoBeat { .. } => CommandKind::GotoBeat,
        }
    }

    /// Parse a payload received on the topic for `kind`
    ///
    /// `goto-beat` bodies use the exhibit-specific beat field name.
    pub fn parse(
        kind: CommandKind,
        profile: &ExhibitProfile,
        payload: &[u8],
    ) -> Result<Self, CommandError> {
        let malformed = |source| CommandError::Malformed {
            command: kind,
            source,
        };

        match kind {
            CommandKind::LoadTour => {
                let envelope: Envelope<LoadTourBody> =
                    serde_json::from_slice(payload).map_err(malformed)?;
                if envelope.body.tour_id.is_empty() {
                    return Err(CommandError::EmptyField {
                        command: kind,
                        field: "tour-id",
                    });
                }
                Ok(Self::LoadTour {
                    tour_id: envelope.body.tour_id,
                })
            }
            CommandKind::GoIdle => {
                let envelope: Envelope<GoIdleBody> =
                    serde_json::from_slice(payload).map_err(malformed)?;
                Ok(Self::GoIdle {
                    reason: envelope.body.reason,
                })
            }
            CommandKind::EndTour => {
                let _: Envelope<Map<String, Value>> =
                    serde_json::from_slice(payload).map_err(malformed)?;
                Ok(Self::EndTour)
            }
            CommandKind::GotoBeat => {
                let envelope: Envelope<Map<String, Value>> =
                    serde_json::from_slice(payload).map_err(malformed)?;
                let field = profile.goto_beat_field;
                let beat_id = envelope
                    .body
                    .get(field)
                    .and_then(Value::as_str)
                    .ok_or(CommandError::MissingField {
                        command: kind,
                        field,
                    })?;
                if beat_id.is_empty() {
                    return Err(CommandError::EmptyField {
                        command: kind,
                        field,
                    });
                }
                Ok(Self::GotoBeat {
                    beat_id: beat_id.to_string(),
                })
            }
        }
    }

    /// Encode as a JSON envelope
    ///
    /// `goto_beat_field` names the beat field of a `goto-beat` body and is
    /// ignored for the broadcast commands.
    pub fn to_payload(&self, goto_beat_field: &str) -> Vec<u8> {
        let body = match self {
            Self::LoadTour { tour_id } => serde_json::json!({ "tour-id": tour_id }),
            Self::GoIdle { reason } => match reason {
                Some(reason) => serde_json::json!({ "reason": reason }),
                None => serde_json::json!({}),
            },
            Self::EndTour => serde_json::json!({}),
            Self::GotoBeat { beat_id } => {
                let mut body = Map::new();
                body.insert(goto_beat_field.to_string(), Value::String(beat_id.clone()));
                Value::Object(body)
            }
        };

        serde_json::json!({ "body": body }).to_string().into_bytes()
    }
}
