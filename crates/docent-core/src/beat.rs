//! Beat identifier codec
//!
//! A beat is addressed on the wire as `"{moment}-{n}"` where `n` is the
//! 1-indexed beat number. Internally beats are 0-indexed, so the codec
//! shifts by one in each direction.
//!
//! Moment identifiers may contain dashes themselves (`case-study`), so the
//! decoder splits on the *last* dash.

use crate::state::ExhibitNavigationState;
use thiserror::Error;

/// Beat decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BeatError {
    #[error("Missing '-' separator in beat id: {0}")]
    MissingSeparator(String),

    #[error("Invalid beat number: {0}")]
    InvalidBeatNumber(String),

    #[error("Unknown moment: {0}")]
    UnknownMoment(String),

    #[error("Beat index out of range: {0}")]
    BeatOutOfRange(usize),
}

/// Encode a navigation position as a wire beat id
///
/// Fails only for `usize::MAX`, whose 1-indexed number does not fit.
pub fn encode_beat_id(moment_id: &str, beat_idx: usize) -> Result<String, BeatError> {
    let beat_number = beat_idx
        .checked_add(1)
        .ok_or(BeatError::BeatOutOfRange(beat_idx))?;
    Ok(format!("{}-{}", moment_id, beat_number))
}

/// Wire id of a moment's first beat
pub fn first_beat_id(moment_id: &str) -> String {
    format!("{}-1", moment_id)
}

/// Decode a wire beat id against an exhibit's moment set
pub fn decode_beat_id(
    raw: &str,
    valid_moments: &[&str],
) -> Result<ExhibitNavigationState, BeatError> {
    let (moment_id, beat_number) = raw
        .rsplit_once('-')
        .ok_or_else(|| BeatError::MissingSeparator(raw.to_string()))?;

    let beat_number: usize = beat_number
        .parse()
        .ok()
        .filter(|n| *n >= 1)
        .ok_or_else(|| BeatError::InvalidBeatNumber(beat_number.to_string()))?;

    if !valid_moments.contains(&moment_id) {
        return Err(BeatError::UnknownMoment(moment_id.to_string()));
    }

    Ok(ExhibitNavigationState::new(moment_id, beat_number - 1))
}
