use rand::Rng;

/// Uniform white noise in `[-1, 1]`.
pub fn white_noise<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Vec<f32> {
    (0..len).map(|_| rng.random_range(-1.0f32..=1.0)).collect()
}

/// Exponentially decaying noise burst used as a reverb impulse response.
///
/// Sample `i` of `len` is `noise * ((len - i) / len) ^ decay`.
pub fn decaying_noise<R: Rng + ?Sized>(rng: &mut R, len: usize, decay: f32) -> Vec<f32> {
    let n = len as f32;
    (0..len)
        .map(|i| {
            let remaining = (n - i as f32) / n;
            rng.random_range(-1.0f32..=1.0) * remaining.powf(decay)
        })
        .collect()
}
