//! Random groove generation with per-voice metric bias.
//!
//! Positions are counted from the start of the pattern, so multi-measure
//! patterns repeat the one-measure bias (crash alone favors only step 0).

use rand::Rng;

use beatgrid_types::{PatternGrid, VoiceId};

/// Probability that `voice` is active at step `i`.
///
/// Ride is two-stage (see [`random_cell`]); this returns its overall rate.
pub fn cell_probability(voice: VoiceId, i: usize) -> f64 {
    let pos = i + 1;
    match voice {
        VoiceId::Kick => {
            if pos % 4 == 1 {
                0.9
            } else {
                0.1
            }
        }
        VoiceId::Snare => {
            if pos % 8 == 5 {
                0.9
            } else {
                0.15
            }
        }
        VoiceId::HiHat => {
            if i % 2 == 0 {
                0.8
            } else {
                0.3
            }
        }
        VoiceId::OpenHat => 0.1,
        VoiceId::Crash => {
            if i == 0 {
                0.4
            } else if pos % 16 == 1 {
                0.3
            } else {
                0.05
            }
        }
        VoiceId::Ride => {
            if i % 2 == 0 {
                0.3 * 0.7
            } else {
                0.3 * 0.2
            }
        }
        VoiceId::Clap => {
            if pos % 8 == 5 {
                0.3
            } else {
                0.08
            }
        }
        VoiceId::Cowbell => 0.12,
        VoiceId::Shaker => 0.25,
        VoiceId::HiTom => 0.08,
        VoiceId::LoTom => 0.06,
        VoiceId::Tom => 0.1,
    }
}

/// Draw one cell.
pub fn random_cell<R: Rng + ?Sized>(rng: &mut R, voice: VoiceId, i: usize) -> bool {
    match voice {
        // The ride section is switched on per cell first, then thinned to
        // favor even steps.
        VoiceId::Ride => {
            if rng.random_bool(0.3) {
                rng.random_bool(if i % 2 == 0 { 0.7 } else { 0.2 })
            } else {
                false
            }
        }
        _ => rng.random_bool(cell_probability(voice, i)),
    }
}

/// A fresh grid of `length` steps.
pub fn random_grid<R: Rng + ?Sized>(rng: &mut R, length: usize) -> PatternGrid {
    let mut grid = PatternGrid::new(length);
    for voice in VoiceId::ALL {
        for (i, cell) in grid.row_mut(voice).iter_mut().enumerate() {
            *cell = random_cell(rng, voice, i);
        }
    }
    grid
}
