//! Voice Synthesis Engine.
//!
//! Every trigger renders a fresh one-shot from the voice's recipe and hands it
//! to the backend at the current context time. Recipes are never mutated;
//! the only state carried between triggers is the noise RNG, the reverb's
//! impulse response, per-voice levels and any loaded sample overrides.

use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;

use beatgrid_types::{
    Envelope, SynthModel, VoiceId, VoiceRecipe, VoiceTrigger, Waveform, ENVELOPE_PEAK, NUM_VOICES,
};

use crate::backend::{AudioBackend, ContextState};
use crate::dsp::filter::{self, FilterKind};
use crate::dsp::noise::white_noise;
use crate::dsp::reverb::{self, Convolver};
use crate::dsp::{Oscillator, ParamTimeline};
use crate::wav;

/// Bandpass Q for metallic noise voices.
pub const METALLIC_Q: f32 = 10.0;
/// Highpass resonance for plain noise voices, in dB.
pub const HIGHPASS_Q: f32 = 1.0;
pub const CLAP_Q: f32 = 5.0;

/// How far ahead of the context clock a step is scheduled, in seconds.
pub const SCHEDULE_LOOKAHEAD: f64 = 0.05;

const CLAP_BASE_VOLUME: f32 = 0.6;
const CLAP_VOLUME_STEP: f32 = 0.1;
const CLAP_ATTACK_SECS: f64 = 0.01;
const CLAP_FLOOR: f32 = 0.01;

fn frames(secs: f64, sample_rate: u32) -> usize {
    (secs * sample_rate as f64).round() as usize
}

/// Three-phase amplitude shape: linear rise to the peak, exponential fall to
/// sustain, linear fade to silence at the end of the voice.
pub fn envelope_timeline(envelope: &Envelope, duration: f32) -> ParamTimeline {
    let attack = envelope.attack as f64;
    let decay_end = attack + envelope.decay as f64;
    let mut gain = ParamTimeline::new(0.0);
    gain.set_value_at(0.0, 0.0)
        .linear_ramp_to(ENVELOPE_PEAK, attack)
        .exponential_ramp_to(envelope.sustain, decay_end)
        .linear_ramp_to(0.0, duration as f64);
    gain
}

/// Pitch drop for struck membranes; metallic voices wobble down, up, down.
pub fn pitch_timeline(frequency: f32, duration: f32, metallic: bool) -> ParamTimeline {
    let d = duration as f64;
    let mut freq = ParamTimeline::new(frequency);
    freq.set_value_at(frequency, 0.0);
    if metallic {
        freq.exponential_ramp_to(frequency * 0.8, d * 0.1)
            .exponential_ramp_to(frequency * 1.2, d * 0.3)
            .exponential_ramp_to(frequency * 0.9, d);
    } else {
        freq.exponential_ramp_to(frequency * 0.1, d);
    }
    freq
}

pub struct SynthEngine {
    backend: Box<dyn AudioBackend>,
    rng: StdRng,
    reverb: Convolver,
    samples: Vec<Option<Vec<f32>>>,
    gains: [f32; NUM_VOICES],
    master_gain: f32,
}

impl SynthEngine {
    pub fn new(backend: Box<dyn AudioBackend>) -> Self {
        Self::with_rng(backend, StdRng::from_os_rng())
    }

    /// Engine with a caller-supplied RNG, for reproducible renders.
    pub fn with_rng(backend: Box<dyn AudioBackend>, mut rng: StdRng) -> Self {
        let reverb = Convolver::decaying_room(&mut rng, backend.sample_rate());
        Self {
            backend,
            rng,
            reverb,
            samples: vec![None; NUM_VOICES],
            gains: [1.0; NUM_VOICES],
            master_gain: 1.0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.backend.sample_rate()
    }

    /// True while the backend can still produce sound.
    pub fn is_ready(&self) -> bool {
        self.backend.state() != ContextState::Closed
    }

    pub fn set_master_gain(&mut self, gain: f32) {
        self.master_gain = gain.clamp(0.0, 1.0);
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }

    pub fn set_voice_gain(&mut self, voice: VoiceId, gain: f32) {
        self.gains[voice.index()] = gain.clamp(0.0, 1.0);
    }

    pub fn voice_gain(&self, voice: VoiceId) -> f32 {
        self.gains[voice.index()]
    }

    /// Play `path` instead of the synthesized timbre for `voice`.
    pub fn load_sample(&mut self, voice: VoiceId, path: &Path) -> Result<(), String> {
        let samples = wav::read_mono(path, self.sample_rate())?;
        log::info!(target: "synth", "{} now plays {} ({} frames)", voice, path.display(), samples.len());
        self.samples[voice.index()] = Some(samples);
        Ok(())
    }

    pub fn clear_sample(&mut self, voice: VoiceId) {
        self.samples[voice.index()] = None;
    }

    pub fn has_sample(&self, voice: VoiceId) -> bool {
        self.samples[voice.index()].is_some()
    }

    /// Synthesize and emit one hit of `voice`. Never blocks on playback.
    ///
    /// A suspended context is asked to resume first; the hit is emitted
    /// without waiting for that to complete. A closed context drops the hit.
    pub fn trigger(&mut self, voice: VoiceId) {
        self.trigger_step(&[voice]);
    }

    /// Emit every voice of one step at a shared start time.
    ///
    /// The start time is read from the context clock once, before anything
    /// is rendered, and pushed `SCHEDULE_LOOKAHEAD` ahead so render time
    /// does not stagger voices that belong together.
    pub fn trigger_step(&mut self, voices: &[VoiceId]) {
        if voices.is_empty() || !self.ensure_running() {
            return;
        }

        let when = self.backend.current_time() + SCHEDULE_LOOKAHEAD;
        for &voice in voices {
            let samples = self.render(voice);
            let gain = self.gains[voice.index()] * self.master_gain;
            if let Err(e) = self.backend.play_buffer(samples, when, gain) {
                log::warn!(target: "synth", "failed to play {}: {}", voice, e);
            }
        }
    }

    /// Resume a suspended context. False when the context is closed.
    fn ensure_running(&self) -> bool {
        match self.backend.state() {
            ContextState::Running => true,
            ContextState::Suspended => {
                if let Err(e) = self.backend.resume() {
                    log::warn!(target: "synth", "resume failed: {}", e);
                }
                true
            }
            ContextState::Closed => {
                log::warn!(target: "synth", "audio unavailable, dropping hit");
                false
            }
        }
    }

    /// Offline render of one hit, before per-voice and master gain.
    pub fn render(&mut self, voice: VoiceId) -> Vec<f32> {
        if let Some(sample) = &self.samples[voice.index()] {
            return sample.clone();
        }
        let recipe = VoiceRecipe::for_voice(voice);
        match recipe.model {
            SynthModel::Tone { waveform, noise, metallic, envelope } => {
                self.render_tone(recipe, waveform, noise, metallic, &envelope)
            }
            SynthModel::MultiAttack { attacks, attack_delay } => {
                self.render_multi_attack(recipe, attacks, attack_delay)
            }
        }
    }

    fn render_tone(
        &mut self,
        recipe: &VoiceRecipe,
        waveform: Waveform,
        noise: bool,
        metallic: bool,
        envelope: &Envelope,
    ) -> Vec<f32> {
        let sr = self.sample_rate();
        let len = frames(recipe.duration as f64, sr);

        let source = if noise {
            let white = white_noise(&mut self.rng, len);
            let (kind, q) = if metallic {
                (FilterKind::BandPass, METALLIC_Q)
            } else {
                (FilterKind::HighPass, HIGHPASS_Q)
            };
            filter::apply(kind, &white, recipe.frequency, q, sr)
        } else {
            let freq = pitch_timeline(recipe.frequency, recipe.duration, metallic);
            Oscillator::new(waveform).render(&freq, len, sr)
        };

        let amp = envelope_timeline(envelope, recipe.duration).render(len, sr);
        let dry: Vec<f32> = source.iter().zip(&amp).map(|(s, a)| s * a).collect();

        if metallic {
            reverb::mix_wet(&dry, &mut self.reverb)
        } else {
            dry
        }
    }

    fn render_multi_attack(&mut self, recipe: &VoiceRecipe, attacks: u8, attack_delay: f32) -> Vec<f32> {
        let sr = self.sample_rate();
        let burst_len = frames(recipe.duration as f64, sr);
        let spacing = frames(attack_delay as f64, sr);
        let mut out = vec![0.0f32; burst_len + spacing * attacks.saturating_sub(1) as usize];

        for i in 0..attacks {
            let white = white_noise(&mut self.rng, burst_len);
            let burst = filter::apply(FilterKind::BandPass, &white, recipe.frequency, CLAP_Q, sr);

            let volume = CLAP_BASE_VOLUME + CLAP_VOLUME_STEP * i as f32;
            let mut gain = ParamTimeline::new(0.0);
            gain.set_value_at(0.0, 0.0)
                .linear_ramp_to(volume, CLAP_ATTACK_SECS)
                .exponential_ramp_to(CLAP_FLOOR, recipe.duration as f64);
            let amp = gain.render(burst_len, sr);

            let start = spacing * i as usize;
            for (o, (s, a)) in out[start..].iter_mut().zip(burst.iter().zip(&amp)) {
                *o += s * a;
            }
        }
        out
    }
}

impl VoiceTrigger for SynthEngine {
    fn trigger(&mut self, voice: VoiceId) {
        SynthEngine::trigger(self, voice);
    }

    fn trigger_step(&mut self, voices: &[VoiceId]) {
        SynthEngine::trigger_step(self, voices);
    }

    fn wake(&mut self) {
        if self.backend.state() == ContextState::Suspended {
            if let Err(e) = self.backend.resume() {
                log::warn!(target: "synth", "resume failed: {}", e);
            }
        }
    }
}
