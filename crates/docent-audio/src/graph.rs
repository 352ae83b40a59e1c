//! Multiplicative gain graph
//!
//! A master stage feeds named channels (narration, music, effects...). Each
//! stage has a gain and a mute flag:
//!
//! ```text
//! effective(channel) = master_gain (0 if master muted)
//!                    × channel_gain
//!                    × (0 if channel muted else 1)
//! ```

use docent_core::state::{FIELD_VOLUME_LEVEL, FIELD_VOLUME_MUTED};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Per-channel gain stage
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Channel {
    /// Gain: 0.0 (silent) to 1.0 (full). Values > 1.0 amplify.
    pub gain: f32,
    pub muted: bool,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            gain: 1.0,
            muted: false,
        }
    }
}

/// Master gain followed by independent channels
#[derive(Clone, Debug)]
pub struct GainGraph {
    master_gain: f32,
    master_muted: bool,
    channels: HashMap<String, Channel>,
}

impl Default for GainGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl GainGraph {
    /// Unmuted graph at full master gain with no channels
    pub fn new() -> Self {
        Self {
            master_gain: 1.0,
            master_muted: false,
            channels: HashMap::new(),
        }
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }

    pub fn master_muted(&self) -> bool {
        self.master_muted
    }

    /// Set the master gain, clamped to [0, 1]
    pub fn set_master_gain(&mut self, gain: f32) {
        self.master_gain = if gain.is_nan() { 0.0 } else { gain.clamp(0.0, 1.0) };
    }

    pub fn set_master_muted(&mut self, muted: bool) {
        self.master_muted = muted;
    }

    /// Add (or reset) a channel at unity gain
    pub fn add_channel(&mut self, name: impl Into<String>) {
        self.channels.insert(name.into(), Channel::default());
    }

    pub fn remove_channel(&mut self, name: &str) -> bool {
        self.channels.remove(name).is_some()
    }

    pub fn channel(&self, name: &str) -> Option<Channel> {
        self.channels.get(name).copied()
    }

    /// Set a channel's gain; returns false for unknown channels
    pub fn set_channel_gain(&mut self, name: &str, gain: f32) -> bool {
        match self.channels.get_mut(name) {
            Some(channel) => {
                channel.gain = gain.max(0.0);
                true
            }
            None => false,
        }
    }

    /// Mute or unmute a channel; returns false for unknown channels
    pub fn mute_channel(&mut self, name: &str, muted: bool) -> bool {
        match self.channels.get_mut(name) {
            Some(channel) => {
                channel.muted = muted;
                true
            }
            None => false,
        }
    }

    /// Effective gain of a channel, or `None` if it does not exist
    pub fn effective_gain(&self, name: &str) -> Option<f32> {
        let channel = self.channels.get(name)?;
        let master = if self.master_muted { 0.0 } else { self.master_gain };
        let mute_factor = if channel.muted { 0.0 } else { 1.0 };
        Some(master * channel.gain * mute_factor)
    }

    /// Scale a buffer of samples by a channel's effective gain
    ///
    /// Unknown channels are silenced.
    pub fn process(&self, name: &str, samples: &mut [f32]) {
        let gain = self.effective_gain(name).unwrap_or(0.0);
        if gain == 1.0 {
            return;
        }
        for sample in samples.iter_mut() {
            *sample *= gain;
        }
    }

    /// Apply the volume fields of a reported state message
    ///
    /// Only fields of the expected type are applied; anything else is left
    /// alone. Returns true if the graph changed.
    pub fn apply_state(&mut self, state: &Value) -> bool {
        let before = (self.master_gain, self.master_muted);

        if let Some(muted) = state.get(FIELD_VOLUME_MUTED).and_then(Value::as_bool) {
            self.set_master_muted(muted);
        }
        if let Some(level) = state.get(FIELD_VOLUME_LEVEL).and_then(Value::as_f64) {
            self.set_master_gain(level as f32);
        }

        let changed = before != (self.master_gain, self.master_muted);
        if changed {
            debug!(
                gain = self.master_gain,
                muted = self.master_muted,
                "Master volume updated"
            );
        } else {
            trace!("Volume unchanged");
        }
        changed
    }
}
