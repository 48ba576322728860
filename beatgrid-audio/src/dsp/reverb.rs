//! Short convolution reverb for metallic voices.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use super::noise::decaying_noise;

pub const IMPULSE_SECS: f32 = 0.5;
pub const IMPULSE_DECAY: f32 = 0.3;
pub const DRY_LEVEL: f32 = 0.7;
pub const WET_LEVEL: f32 = 0.3;

// Impulse normalization, matching the convention of browser convolvers.
const GAIN_CALIBRATION: f32 = 0.001_25;
const GAIN_CALIBRATION_SAMPLE_RATE: f32 = 44_100.0;
const MIN_POWER: f32 = 0.000_125;

/// Scale applied to an impulse response so its loudness does not depend on
/// its length or energy.
pub fn normalization_scale(impulse: &[f32], sample_rate: u32) -> f32 {
    if impulse.is_empty() {
        return 1.0;
    }
    let power = impulse.iter().map(|s| s * s).sum::<f32>() / impulse.len() as f32;
    let mut power = power.sqrt();
    if !power.is_finite() || power < MIN_POWER {
        power = MIN_POWER;
    }
    (1.0 / power) * GAIN_CALIBRATION * (GAIN_CALIBRATION_SAMPLE_RATE / sample_rate as f32)
}

/// Transforms and impulse spectrum for one FFT size.
struct Kernel {
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    spectrum: Vec<Complex<f32>>,
}

/// FFT convolver over a fixed, normalized impulse response.
///
/// Plans and the impulse spectrum are cached per FFT size, so repeated
/// renders of the same voice only pay for two transforms.
pub struct Convolver {
    impulse: Vec<f32>,
    kernels: HashMap<usize, Kernel>,
}

impl Convolver {
    pub fn new(impulse: Vec<f32>, sample_rate: u32) -> Self {
        let scale = normalization_scale(&impulse, sample_rate);
        Self::unscaled(impulse.into_iter().map(|s| s * scale).collect())
    }

    fn unscaled(impulse: Vec<f32>) -> Self {
        Self { impulse, kernels: HashMap::new() }
    }

    /// A convolver over `IMPULSE_SECS` of decaying noise.
    pub fn decaying_room<R: Rng + ?Sized>(rng: &mut R, sample_rate: u32) -> Self {
        let len = (sample_rate as f32 * IMPULSE_SECS) as usize;
        Self::new(decaying_noise(rng, len, IMPULSE_DECAY), sample_rate)
    }

    pub fn impulse_len(&self) -> usize {
        self.impulse.len()
    }

    /// Full linear convolution: `input.len() + impulse_len() - 1` samples.
    pub fn process(&mut self, input: &[f32]) -> Vec<f32> {
        if input.is_empty() || self.impulse.is_empty() {
            return input.to_vec();
        }
        let out_len = input.len() + self.impulse.len() - 1;
        let n = out_len.next_power_of_two();

        let impulse = &self.impulse;
        let kernel = self.kernels.entry(n).or_insert_with(|| {
            let mut planner = FftPlanner::new();
            let forward = planner.plan_fft_forward(n);
            let inverse = planner.plan_fft_inverse(n);
            let mut spectrum = zero_padded(impulse, n);
            forward.process(&mut spectrum);
            Kernel { forward, inverse, spectrum }
        });

        let mut buf = zero_padded(input, n);
        kernel.forward.process(&mut buf);
        for (x, h) in buf.iter_mut().zip(&kernel.spectrum) {
            *x *= *h;
        }
        kernel.inverse.process(&mut buf);

        let norm = 1.0 / n as f32;
        buf.into_iter().take(out_len).map(|c| c.re * norm).collect()
    }
}

fn zero_padded(samples: &[f32], n: usize) -> Vec<Complex<f32>> {
    let mut buf: Vec<Complex<f32>> = samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
    buf.resize(n, Complex::new(0.0, 0.0));
    buf
}

/// Mix `dry` with its convolution at `DRY_LEVEL : WET_LEVEL`.
/// The result carries the reverb tail past the end of the dry signal.
pub fn mix_wet(dry: &[f32], convolver: &mut Convolver) -> Vec<f32> {
    let wet = convolver.process(dry);
    let mut out: Vec<f32> = wet.iter().map(|w| w * WET_LEVEL).collect();
    for (o, d) in out.iter_mut().zip(dry) {
        *o += d * DRY_LEVEL;
    }
    out
}
