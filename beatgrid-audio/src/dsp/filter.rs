use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterKind {
    HighPass,
    BandPass,
}

/// Linear Q for a highpass whose resonance is given in dB.
pub fn resonance_q(q_db: f32) -> f32 {
    10f32.powf(q_db / 20.0)
}

/// Filter `input` through a second-order section centered at `frequency`.
///
/// `q` follows browser filter nodes: for a bandpass it is the linear Q and
/// the center frequency passes at unity gain; for a highpass it is the
/// resonance in dB. The cutoff is pulled just under Nyquist when the
/// requested frequency is out of range for `sample_rate`; on a degenerate
/// configuration the input passes through unchanged.
pub fn apply(kind: FilterKind, input: &[f32], frequency: f32, q: f32, sample_rate: u32) -> Vec<f32> {
    let fs = sample_rate as f32;
    let f0 = frequency.clamp(10.0, fs * 0.49);
    let (filter_type, q_linear) = match kind {
        FilterKind::HighPass => (Type::HighPass, resonance_q(q)),
        FilterKind::BandPass => (Type::BandPass, q),
    };

    let mut coeffs = match Coefficients::<f32>::from_params(filter_type, fs.hz(), f0.hz(), q_linear) {
        Ok(c) => c,
        Err(e) => {
            log::warn!(target: "synth", "filter {:?} at {} Hz rejected: {:?}", kind, f0, e);
            return input.to_vec();
        }
    };
    // biquad's bandpass peaks at Q; bring the center back to 0 dB.
    if kind == FilterKind::BandPass {
        coeffs.b0 /= q_linear;
        coeffs.b2 /= q_linear;
    }

    let mut section = DirectForm2Transposed::<f32>::new(coeffs);
    input.iter().map(|&x| section.run(x)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rms(s: &[f32]) -> f32 {
        (s.iter().map(|x| x * x).sum::<f32>() / s.len() as f32).sqrt()
    }

    fn sine(freq: f32, sr: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (std::f32::consts::TAU * freq * i as f32 / sr as f32).sin())
            .collect()
    }

    #[test]
    fn highpass_attenuates_lows() {
        let low = sine(50.0, 44_100, 44_100);
        let out = apply(FilterKind::HighPass, &low, 8_000.0, 1.0, 44_100);
        assert!(rms(&out[4_410..]) < 0.01);
    }

    #[test]
    fn bandpass_keeps_center() {
        let center = sine(1_000.0, 44_100, 44_100);
        let out = apply(FilterKind::BandPass, &center, 1_000.0, 5.0, 44_100);
        let ratio = rms(&out[4_410..]) / rms(&center[4_410..]);
        assert!(ratio > 0.9 && ratio < 1.1, "ratio {}", ratio);
    }

    #[test]
    fn narrow_bandpass_peaks_at_unity() {
        let center = sine(6_000.0, 48_000, 48_000);
        let out = apply(FilterKind::BandPass, &center, 6_000.0, 10.0, 48_000);
        let peak = out[4_800..].iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.9 && peak < 1.05, "peak {}", peak);
    }

    #[test]
    fn highpass_q_is_in_db() {
        assert!((resonance_q(0.0) - 1.0).abs() < 1e-6);
        assert!((resonance_q(1.0) - 1.122).abs() < 1e-3);

        // At the cutoff a highpass passes Q times the input.
        let cutoff = sine(2_000.0, 44_100, 44_100);
        let out = apply(FilterKind::HighPass, &cutoff, 2_000.0, 1.0, 44_100);
        let ratio = rms(&out[4_410..]) / rms(&cutoff[4_410..]);
        assert!((ratio - 1.122).abs() < 0.03, "ratio {}", ratio);
    }

    #[test]
    fn above_nyquist_is_clamped() {
        let noise: Vec<f32> = (0..1000).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        let out = apply(FilterKind::HighPass, &noise, 15_000.0, 1.0, 22_050);
        assert_eq!(out.len(), noise.len());
        assert!(out.iter().all(|s| s.is_finite()));
    }
}
