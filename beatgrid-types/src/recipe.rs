//! Fixed synthesis recipes for each voice.

use serde::{Deserialize, Serialize};

use crate::voice::VoiceId;

/// Oscillator waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// Amplitude envelope parameters, in seconds (sustain is a level).
///
/// Rendered as a three-phase shape: linear rise to peak over `attack`,
/// exponential fall to `sustain` over `decay`, then a linear ramp to
/// silence at the end of the voice. `release` is kept for reference;
/// the terminal ramp stands in for it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Envelope {
    pub const fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self { attack, decay, sustain, release }
    }
}

/// Peak level reached at the end of the attack phase.
pub const ENVELOPE_PEAK: f32 = 0.8;

/// How a voice produces sound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SynthModel {
    /// Oscillator or filtered noise shaped by an envelope.
    Tone {
        waveform: Waveform,
        noise: bool,
        metallic: bool,
        envelope: Envelope,
    },
    /// Several short bandpassed noise bursts (hand clap).
    MultiAttack { attacks: u8, attack_delay: f32 },
}

/// Immutable synthesis parameters for one voice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceRecipe {
    pub voice: VoiceId,
    /// Base frequency in Hz (oscillator pitch or filter center).
    pub frequency: f32,
    /// Length of the one-shot in seconds.
    pub duration: f32,
    pub model: SynthModel,
}

impl VoiceRecipe {
    const fn tone(
        voice: VoiceId,
        frequency: f32,
        duration: f32,
        waveform: Waveform,
        noise: bool,
        metallic: bool,
        envelope: Envelope,
    ) -> Self {
        Self {
            voice,
            frequency,
            duration,
            model: SynthModel::Tone { waveform, noise, metallic, envelope },
        }
    }

    pub fn is_noise(&self) -> bool {
        matches!(self.model, SynthModel::Tone { noise: true, .. } | SynthModel::MultiAttack { .. })
    }

    pub fn is_metallic(&self) -> bool {
        matches!(self.model, SynthModel::Tone { metallic: true, .. })
    }

    /// Recipe table lookup.
    pub fn for_voice(voice: VoiceId) -> &'static VoiceRecipe {
        &RECIPES[voice.index()]
    }
}

use Waveform::*;

/// Recipes in canonical voice order.
pub static RECIPES: [VoiceRecipe; 12] = [
    VoiceRecipe::tone(VoiceId::Kick, 60.0, 0.5, Sine, false, false, Envelope::new(0.01, 0.3, 0.1, 0.2)),
    VoiceRecipe::tone(VoiceId::Snare, 200.0, 0.2, Square, true, false, Envelope::new(0.01, 0.1, 0.05, 0.1)),
    VoiceRecipe::tone(VoiceId::HiHat, 8000.0, 0.1, Square, true, false, Envelope::new(0.01, 0.05, 0.02, 0.05)),
    VoiceRecipe::tone(VoiceId::Tom, 150.0, 0.4, Sine, false, false, Envelope::new(0.01, 0.2, 0.1, 0.2)),
    VoiceRecipe::tone(VoiceId::OpenHat, 10000.0, 0.3, Square, true, false, Envelope::new(0.01, 0.1, 0.3, 0.2)),
    VoiceRecipe::tone(VoiceId::Crash, 12000.0, 1.2, Square, true, true, Envelope::new(0.01, 0.3, 0.2, 0.9)),
    VoiceRecipe::tone(VoiceId::Ride, 6000.0, 0.8, Sawtooth, true, true, Envelope::new(0.01, 0.2, 0.3, 0.5)),
    VoiceRecipe {
        voice: VoiceId::Clap,
        frequency: 1000.0,
        duration: 0.15,
        model: SynthModel::MultiAttack { attacks: 3, attack_delay: 0.01 },
    },
    VoiceRecipe::tone(VoiceId::Cowbell, 800.0, 0.3, Triangle, false, true, Envelope::new(0.01, 0.15, 0.1, 0.15)),
    VoiceRecipe::tone(VoiceId::Shaker, 15000.0, 0.08, Square, true, false, Envelope::new(0.01, 0.03, 0.02, 0.04)),
    VoiceRecipe::tone(VoiceId::HiTom, 220.0, 0.35, Sine, false, false, Envelope::new(0.01, 0.15, 0.1, 0.2)),
    VoiceRecipe::tone(VoiceId::LoTom, 100.0, 0.5, Sine, false, false, Envelope::new(0.01, 0.25, 0.15, 0.25)),
];
