//! Payload encoding/decoding
//!
//! All protocol payloads are JSON.

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Serialization codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Codec {
    /// JSON encoding
    #[default]
    Json,
}

impl Codec {
    /// Encode a payload
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        match self {
            Self::Json => serde_json::to_vec(value).map_err(|e| CodecError::Encode(e.to_string())),
        }
    }

    /// Decode a payload
    pub fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError> {
        match self {
            Self::Json => {
                serde_json::from_slice(data).map_err(|e| CodecError::Decode(e.to_string()))
            }
        }
    }
}

/// Codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Decoding failed: {0}")]
    Decode(String),
}
