//! The twelve fixed drum voices.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const NUM_VOICES: usize = 12;

/// Identifier of one of the fixed percussion voices.
///
/// Serialized with the lowercase keys used in saved pattern files
/// (`"kick"`, `"hihat"`, `"openhat"`, ...).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum VoiceId {
    Kick,
    Snare,
    HiHat,
    Tom,
    OpenHat,
    Crash,
    Ride,
    Clap,
    Cowbell,
    Shaker,
    HiTom,
    LoTom,
}

impl VoiceId {
    /// All voices in canonical row order.
    pub const ALL: [VoiceId; NUM_VOICES] = [
        VoiceId::Kick,
        VoiceId::Snare,
        VoiceId::HiHat,
        VoiceId::Tom,
        VoiceId::OpenHat,
        VoiceId::Crash,
        VoiceId::Ride,
        VoiceId::Clap,
        VoiceId::Cowbell,
        VoiceId::Shaker,
        VoiceId::HiTom,
        VoiceId::LoTom,
    ];

    /// Row index of this voice in a pattern grid.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Wire key used in pattern files.
    pub fn key(self) -> &'static str {
        match self {
            VoiceId::Kick => "kick",
            VoiceId::Snare => "snare",
            VoiceId::HiHat => "hihat",
            VoiceId::Tom => "tom",
            VoiceId::OpenHat => "openhat",
            VoiceId::Crash => "crash",
            VoiceId::Ride => "ride",
            VoiceId::Clap => "clap",
            VoiceId::Cowbell => "cowbell",
            VoiceId::Shaker => "shaker",
            VoiceId::HiTom => "hitom",
            VoiceId::LoTom => "lotom",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            VoiceId::Kick => "Kick",
            VoiceId::Snare => "Snare",
            VoiceId::HiHat => "Hi-hat",
            VoiceId::Tom => "Tom",
            VoiceId::OpenHat => "Open Hat",
            VoiceId::Crash => "Crash",
            VoiceId::Ride => "Ride",
            VoiceId::Clap => "Clap",
            VoiceId::Cowbell => "Cowbell",
            VoiceId::Shaker => "Shaker",
            VoiceId::HiTom => "Hi Tom",
            VoiceId::LoTom => "Lo Tom",
        }
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Error returned when parsing an unknown voice key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVoice(pub String);

impl fmt::Display for UnknownVoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown voice: {}", self.0)
    }
}

impl std::error::Error for UnknownVoice {}

impl FromStr for VoiceId {
    type Err = UnknownVoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VoiceId::ALL
            .iter()
            .copied()
            .find(|v| v.key() == s)
            .ok_or_else(|| UnknownVoice(s.to_string()))
    }
}

/// The narrow seam between the pattern engine and the synthesis engine.
///
/// Implementations must return promptly: the sequencer calls
/// `trigger_step` from its tick path and never waits on the result.
pub trait VoiceTrigger {
    fn trigger(&mut self, voice: VoiceId);

    /// Every voice active on one step. Outputs with a clock should start
    /// them together.
    fn trigger_step(&mut self, voices: &[VoiceId]) {
        for &voice in voices {
            self.trigger(voice);
        }
    }

    /// Playback is about to start. Outputs that idle may start waking up.
    fn wake(&mut self) {}
}

impl<T: VoiceTrigger + ?Sized> VoiceTrigger for &mut T {
    fn trigger(&mut self, voice: VoiceId) {
        (**self).trigger(voice)
    }

    fn trigger_step(&mut self, voices: &[VoiceId]) {
        (**self).trigger_step(voices)
    }

    fn wake(&mut self) {
        (**self).wake()
    }
}

impl VoiceTrigger for Vec<VoiceId> {
    fn trigger(&mut self, voice: VoiceId) {
        self.push(voice);
    }
}
