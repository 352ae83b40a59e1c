//! Beat codec command

use docent_core::{ExhibitKind, NavigationError, encode_beat_id};

pub fn encode(
    moment: &str,
    beat_idx: usize,
    exhibit: Option<ExhibitKind>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(exhibit) = exhibit {
        if !exhibit.profile().is_moment(moment) {
            return Err(NavigationError::UnknownMoment(moment.to_string()).into());
        }
    }

    println!("{}", encode_beat_id(moment, beat_idx)?);
    Ok(())
}

pub fn decode(beat_id: &str, exhibit: ExhibitKind) -> Result<(), Box<dyn std::error::Error>> {
    let state = exhibit.profile().decode_beat(beat_id)?;

    println!("Exhibit:    {}", exhibit);
    println!("Moment:     {}", state.moment_id);
    println!("Beat index: {}", state.beat_idx);
    Ok(())
}
