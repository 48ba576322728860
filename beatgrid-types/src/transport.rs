//! Transport state and tempo helpers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const MIN_BPM: u16 = 60;
pub const MAX_BPM: u16 = 200;
pub const DEFAULT_BPM: u16 = 120;

/// Clamp any requested tempo into the supported range.
pub fn clamp_bpm(bpm: i32) -> u16 {
    bpm.clamp(MIN_BPM as i32, MAX_BPM as i32) as u16
}

/// Duration of one sixteenth note: `(60 / bpm / 4) * 1000` ms.
pub fn step_duration(bpm: u16) -> Duration {
    Duration::from_secs_f64(60.0 / bpm.max(1) as f64 / 4.0)
}

/// Duration of one beat in milliseconds.
pub fn beat_duration_ms(bpm: u16) -> f64 {
    60_000.0 / bpm.max(1) as f64
}

/// Loose genre label for a tempo.
pub fn tempo_genre(bpm: u16) -> &'static str {
    match bpm {
        0..=69 => "Ballad/Slow",
        70..=89 => "Hip-Hop/R&B",
        90..=109 => "Funk/Reggae",
        110..=129 => "Pop/Rock",
        130..=149 => "Dance/House",
        150..=169 => "Techno/Trance",
        170..=189 => "Drum & Bass",
        _ => "Hardcore/Gabber",
    }
}

/// Named tempo presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TempoPreset {
    Slow,
    Moderate,
    Fast,
    VeryFast,
}

impl TempoPreset {
    pub fn bpm(self) -> u16 {
        match self {
            TempoPreset::Slow => 80,
            TempoPreset::Moderate => 120,
            TempoPreset::Fast => 140,
            TempoPreset::VeryFast => 180,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "slow" => Some(TempoPreset::Slow),
            "moderate" => Some(TempoPreset::Moderate),
            "fast" => Some(TempoPreset::Fast),
            "veryfast" => Some(TempoPreset::VeryFast),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlayState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// `{ isPlaying, currentStep, bpm }` plus the paused/stopped distinction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportState {
    pub play_state: PlayState,
    pub current_step: usize,
    pub bpm: u16,
}

impl TransportState {
    pub fn is_playing(&self) -> bool {
        self.play_state == PlayState::Playing
    }
}

impl Default for TransportState {
    fn default() -> Self {
        Self {
            play_state: PlayState::Stopped,
            current_step: 0,
            bpm: DEFAULT_BPM,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_duration_at_120_is_125ms() {
        assert_eq!(step_duration(120).as_millis(), 125);
        assert_eq!(step_duration(60).as_millis(), 250);
    }

    #[test]
    fn clamp_limits() {
        assert_eq!(clamp_bpm(10), MIN_BPM);
        assert_eq!(clamp_bpm(500), MAX_BPM);
        assert_eq!(clamp_bpm(-3), MIN_BPM);
        assert_eq!(clamp_bpm(133), 133);
    }

    #[test]
    fn genres() {
        assert_eq!(tempo_genre(60), "Ballad/Slow");
        assert_eq!(tempo_genre(120), "Pop/Rock");
        assert_eq!(tempo_genre(175), "Drum & Bass");
        assert_eq!(tempo_genre(200), "Hardcore/Gabber");
    }

    #[test]
    fn presets() {
        assert_eq!(TempoPreset::from_name("veryfast").map(TempoPreset::bpm), Some(180));
        assert_eq!(TempoPreset::from_name("glacial"), None);
    }
}
