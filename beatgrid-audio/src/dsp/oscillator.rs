use std::f32::consts::TAU;

use beatgrid_types::Waveform;

use super::param::ParamTimeline;

/// One cycle of `waveform` at normalized phase `phase` in `[0, 1)`.
///
/// Every shape starts at zero and rises, so a fresh oscillator does not
/// click on its first sample (square excepted).
pub fn waveform_sample(waveform: Waveform, phase: f32) -> f32 {
    match waveform {
        Waveform::Sine => (TAU * phase).sin(),
        Waveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Sawtooth => 2.0 * ((phase + 0.5) % 1.0) - 1.0,
        Waveform::Triangle => 4.0 * (((phase + 0.75) % 1.0) - 0.5).abs() - 1.0,
    }
}

/// Single-use oscillator driven by a frequency timeline.
pub struct Oscillator {
    waveform: Waveform,
    phase: f32,
}

impl Oscillator {
    pub fn new(waveform: Waveform) -> Self {
        Self { waveform, phase: 0.0 }
    }

    /// Render `len` samples, consuming the oscillator.
    pub fn render(mut self, frequency: &ParamTimeline, len: usize, sample_rate: u32) -> Vec<f32> {
        let sr = sample_rate as f32;
        let freqs = frequency.render(len, sample_rate);
        let mut out = Vec::with_capacity(len);
        for f in freqs {
            out.push(waveform_sample(self.waveform, self.phase));
            self.phase = (self.phase + f / sr).rem_euclid(1.0);
        }
        out
    }
}
