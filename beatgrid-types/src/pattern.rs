//! Step grid types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::voice::{VoiceId, NUM_VOICES};

pub const STEPS_PER_MEASURE: usize = 16;

/// Pattern length in measures. Only 1, 2, 4 and 8 are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Measures {
    #[default]
    One = 1,
    Two = 2,
    Four = 4,
    Eight = 8,
}

impl Measures {
    pub fn count(self) -> usize {
        self as usize
    }

    /// Number of steps in a pattern of this many measures.
    pub fn steps(self) -> usize {
        self.count() * STEPS_PER_MEASURE
    }

    pub fn from_count(count: u8) -> Option<Self> {
        match count {
            1 => Some(Measures::One),
            2 => Some(Measures::Two),
            4 => Some(Measures::Four),
            8 => Some(Measures::Eight),
            _ => None,
        }
    }
}

impl From<Measures> for u8 {
    fn from(m: Measures) -> u8 {
        m as u8
    }
}

impl TryFrom<u8> for Measures {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Measures::from_count(value).ok_or_else(|| format!("invalid measure count {}", value))
    }
}

impl fmt::Display for Measures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.count())
    }
}

/// One boolean row per voice, every row the same length.
///
/// Serialized as a map from voice key to a boolean array, the shape used by
/// pattern files. Unknown voice keys are dropped when reading; missing
/// voices come back as empty rows and are padded by [`PatternGrid::resized`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Vec<bool>>", into = "BTreeMap<String, Vec<bool>>")]
pub struct PatternGrid {
    rows: Vec<Vec<bool>>, // [NUM_VOICES][length]
}

impl PatternGrid {
    /// An all-`false` grid with `length` steps per voice.
    pub fn new(length: usize) -> Self {
        Self {
            rows: (0..NUM_VOICES).map(|_| vec![false; length]).collect(),
        }
    }

    /// Build a grid from explicit rows. Rows are normalized to `length`.
    pub fn from_rows<I>(rows: I, length: usize) -> Self
    where
        I: IntoIterator<Item = (VoiceId, Vec<bool>)>,
    {
        let mut grid = Self { rows: vec![Vec::new(); NUM_VOICES] };
        for (voice, row) in rows {
            grid.rows[voice.index()] = row;
        }
        grid.resized(length)
    }

    /// Length of the longest row. Equal to every row's length for a
    /// normalized grid.
    pub fn length(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Whether every row has exactly `length` cells.
    pub fn is_uniform(&self, length: usize) -> bool {
        self.rows.iter().all(|r| r.len() == length)
    }

    pub fn row(&self, voice: VoiceId) -> &[bool] {
        &self.rows[voice.index()]
    }

    /// Cells of one row. The row length is fixed by the grid.
    pub fn row_mut(&mut self, voice: VoiceId) -> &mut [bool] {
        &mut self.rows[voice.index()]
    }

    pub fn get(&self, voice: VoiceId, step: usize) -> Option<bool> {
        self.rows[voice.index()].get(step).copied()
    }

    pub fn get_mut(&mut self, voice: VoiceId, step: usize) -> Option<&mut bool> {
        self.rows[voice.index()].get_mut(step)
    }

    /// Voices with an active cell at `step`, in canonical order.
    pub fn active_at(&self, step: usize) -> impl Iterator<Item = VoiceId> + '_ {
        VoiceId::ALL
            .into_iter()
            .filter(move |v| self.rows[v.index()].get(step).copied().unwrap_or(false))
    }

    pub fn clear(&mut self) {
        for row in &mut self.rows {
            row.fill(false);
        }
    }

    pub fn active_count(&self) -> usize {
        self.rows.iter().flatten().filter(|&&on| on).count()
    }

    /// A new grid of `length` steps: the overlapping prefix of every row is
    /// copied, the rest is `false`, anything past `length` is discarded.
    pub fn resized(&self, length: usize) -> Self {
        let mut grid = Self::new(length);
        for (dst, src) in grid.rows.iter_mut().zip(&self.rows) {
            let n = src.len().min(length);
            dst[..n].copy_from_slice(&src[..n]);
        }
        grid
    }
}

impl Default for PatternGrid {
    fn default() -> Self {
        Self::new(STEPS_PER_MEASURE)
    }
}

impl From<BTreeMap<String, Vec<bool>>> for PatternGrid {
    fn from(map: BTreeMap<String, Vec<bool>>) -> Self {
        let mut rows = vec![Vec::new(); NUM_VOICES];
        for (key, row) in map {
            if let Ok(voice) = key.parse::<VoiceId>() {
                rows[voice.index()] = row;
            }
        }
        Self { rows }
    }
}

impl From<PatternGrid> for BTreeMap<String, Vec<bool>> {
    fn from(grid: PatternGrid) -> Self {
        VoiceId::ALL
            .into_iter()
            .zip(grid.rows)
            .map(|(voice, row)| (voice.key().to_string(), row))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_steps() {
        assert_eq!(Measures::One.steps(), 16);
        assert_eq!(Measures::Two.steps(), 32);
        assert_eq!(Measures::Four.steps(), 64);
        assert_eq!(Measures::Eight.steps(), 128);
        assert_eq!(Measures::from_count(3), None);
    }

    #[test]
    fn row_edits_keep_grid_uniform() {
        let mut grid = PatternGrid::new(32);
        grid.row_mut(VoiceId::Snare).fill(true);
        grid.row_mut(VoiceId::Kick)[31] = true;
        assert!(grid.is_uniform(32));
        assert_eq!(grid.row(VoiceId::Snare).len(), 32);
        assert_eq!(grid.active_count(), 33);
    }

    #[test]
    fn measures_serde_as_number() {
        assert_eq!(serde_json::to_string(&Measures::Four).unwrap(), "4");
        let m: Measures = serde_json::from_str("2").unwrap();
        assert_eq!(m, Measures::Two);
        assert!(serde_json::from_str::<Measures>("3").is_err());
    }

    #[test]
    fn new_grid_is_empty_and_uniform() {
        let grid = PatternGrid::new(32);
        assert!(grid.is_uniform(32));
        assert_eq!(grid.active_count(), 0);
        assert_eq!(grid.length(), 32);
    }

    #[test]
    fn resize_copies_prefix_and_pads() {
        let mut grid = PatternGrid::new(16);
        *grid.get_mut(VoiceId::Kick, 0).unwrap() = true;
        *grid.get_mut(VoiceId::Kick, 15).unwrap() = true;

        let longer = grid.resized(32);
        assert!(longer.is_uniform(32));
        assert_eq!(longer.get(VoiceId::Kick, 0), Some(true));
        assert_eq!(longer.get(VoiceId::Kick, 15), Some(true));
        assert!(longer.row(VoiceId::Kick)[16..].iter().all(|&c| !c));

        let mut shorter = longer.clone();
        *shorter.get_mut(VoiceId::Snare, 20).unwrap() = true;
        let shorter = shorter.resized(16);
        assert!(shorter.is_uniform(16));
        assert_eq!(shorter.get(VoiceId::Snare, 20), None);
        assert_eq!(shorter.get(VoiceId::Kick, 15), Some(true));
    }

    #[test]
    fn active_at_lists_voices_in_order() {
        let mut grid = PatternGrid::new(16);
        *grid.get_mut(VoiceId::HiHat, 4).unwrap() = true;
        *grid.get_mut(VoiceId::Kick, 4).unwrap() = true;
        let active: Vec<VoiceId> = grid.active_at(4).collect();
        assert_eq!(active, vec![VoiceId::Kick, VoiceId::HiHat]);
        assert_eq!(grid.active_at(99).count(), 0);
    }

    #[test]
    fn serde_map_shape_drops_unknown_voices() {
        let json = r#"{"kick":[true,false],"cymbal":[true,true]}"#;
        let grid: PatternGrid = serde_json::from_str(json).unwrap();
        assert_eq!(grid.row(VoiceId::Kick), &[true, false]);
        assert!(grid.row(VoiceId::Snare).is_empty());

        let normalized = grid.resized(16);
        let out = serde_json::to_value(&normalized).unwrap();
        let map = out.as_object().unwrap();
        assert_eq!(map.len(), NUM_VOICES);
        assert_eq!(map["hihat"].as_array().unwrap().len(), 16);
    }
}
