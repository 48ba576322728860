//! The basic 4/4 groove loaded at startup.

use beatgrid_types::{Measures, PatternGrid, PatternSnapshot, VoiceId, DEFAULT_BPM, STEPS_PER_MEASURE};

fn steps(active: &[usize]) -> Vec<bool> {
    let mut row = vec![false; STEPS_PER_MEASURE];
    for &i in active {
        row[i] = true;
    }
    row
}

/// One measure: kick on 0/6/8, snare on the backbeats, eighth-note hats,
/// shaker on the offbeats.
pub fn default_pattern() -> PatternGrid {
    PatternGrid::from_rows(
        [
            (VoiceId::Kick, steps(&[0, 6, 8])),
            (VoiceId::Snare, steps(&[4, 12])),
            (VoiceId::HiHat, steps(&[0, 2, 4, 6, 8, 10, 12, 14])),
            (VoiceId::Tom, steps(&[11])),
            (VoiceId::OpenHat, steps(&[15])),
            (VoiceId::Crash, steps(&[0])),
            (VoiceId::Cowbell, steps(&[14])),
            (VoiceId::Shaker, steps(&[1, 3, 5, 7, 9, 11, 13, 15])),
        ],
        STEPS_PER_MEASURE,
    )
}

/// The default groove as an importable snapshot at 120 bpm.
pub fn default_snapshot() -> PatternSnapshot {
    PatternSnapshot {
        pattern: default_pattern(),
        bpm: DEFAULT_BPM,
        pattern_length: Some(STEPS_PER_MEASURE),
        measures: Some(Measures::One),
    }
}
