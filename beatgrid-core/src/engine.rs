//! Pattern Engine: the step grid, transport and tempo.
//!
//! `PatternEngine` is plain state. It knows nothing about timers; the
//! sequencer thread owns the clock and calls [`PatternEngine::tick`] once
//! per step while the transport is playing.

use std::time::Duration;

use rand::Rng;

use beatgrid_types::{
    clamp_bpm, step_duration, Measures, PatternGrid, PatternSnapshot, PlayState, TempoPreset,
    TransportState, VoiceId, VoiceTrigger, DEFAULT_BPM, STEPS_PER_MEASURE,
};

use crate::default_pattern::default_snapshot;
use crate::error::GridError;
use crate::random::random_grid;

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    pub step: usize,
    pub voices: Vec<VoiceId>,
}

#[derive(Debug, Clone)]
pub struct PatternEngine {
    grid: PatternGrid,
    transport: TransportState,
    measures: Measures,
}

impl Default for PatternEngine {
    fn default() -> Self {
        Self::new(Measures::One, DEFAULT_BPM)
    }
}

impl PatternEngine {
    /// Stopped, empty grid.
    pub fn new(measures: Measures, bpm: u16) -> Self {
        Self {
            grid: PatternGrid::new(measures.steps()),
            transport: TransportState {
                bpm: clamp_bpm(i32::from(bpm)),
                ..TransportState::default()
            },
            measures,
        }
    }

    /// Stopped, holding the default groove at 120 bpm.
    pub fn with_default_pattern() -> Self {
        let mut engine = Self::default();
        engine.import_pattern(default_snapshot());
        engine
    }

    pub fn grid(&self) -> &PatternGrid {
        &self.grid
    }

    pub fn transport(&self) -> TransportState {
        self.transport
    }

    pub fn measures(&self) -> Measures {
        self.measures
    }

    pub fn pattern_length(&self) -> usize {
        self.measures.steps()
    }

    pub fn bpm(&self) -> u16 {
        self.transport.bpm
    }

    pub fn current_step(&self) -> usize {
        self.transport.current_step
    }

    pub fn play_state(&self) -> PlayState {
        self.transport.play_state
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    /// Interval between ticks at the current tempo.
    pub fn step_duration(&self) -> Duration {
        step_duration(self.transport.bpm)
    }

    /// Fraction of the loop completed.
    pub fn progress(&self) -> f32 {
        let done = self.transport.current_step + usize::from(self.is_playing());
        done as f32 / self.pattern_length() as f32
    }

    // ── Transport ────────────────────────────────────────────────

    /// Start or resume from the retained step. Returns false if already
    /// playing.
    pub fn play(&mut self) -> bool {
        if self.is_playing() {
            return false;
        }
        self.transport.play_state = PlayState::Playing;
        log::debug!(target: "sequencer", "play from step {}", self.transport.current_step);
        true
    }

    /// Hold position. Returns false unless playing.
    pub fn pause(&mut self) -> bool {
        if !self.is_playing() {
            return false;
        }
        self.transport.play_state = PlayState::Paused;
        true
    }

    /// Stop and rewind to step 0.
    pub fn stop(&mut self) {
        self.transport.play_state = PlayState::Stopped;
        self.transport.current_step = 0;
    }

    /// Clamp and apply a tempo. Returns false when the clamped value is
    /// already current.
    pub fn set_bpm(&mut self, bpm: i32) -> bool {
        let bpm = clamp_bpm(bpm);
        if bpm == self.transport.bpm {
            return false;
        }
        self.transport.bpm = bpm;
        log::debug!(target: "sequencer", "bpm -> {}", bpm);
        true
    }

    pub fn adjust_bpm(&mut self, delta: i32) -> bool {
        self.set_bpm(i32::from(self.transport.bpm) + delta)
    }

    pub fn apply_preset(&mut self, preset: TempoPreset) -> bool {
        self.set_bpm(i32::from(preset.bpm()))
    }

    /// Play the current step's active voices, then advance.
    /// Does nothing unless playing.
    pub fn tick(&mut self, voices: &mut dyn VoiceTrigger) -> Option<Tick> {
        if !self.is_playing() {
            return None;
        }
        let step = self.transport.current_step;
        let active: Vec<VoiceId> = self.grid.active_at(step).collect();
        if !active.is_empty() {
            voices.trigger_step(&active);
        }
        self.transport.current_step = (step + 1) % self.pattern_length();
        Some(Tick { step, voices: active })
    }

    // ── Grid ─────────────────────────────────────────────────────

    /// Flip one cell. Out-of-range steps are ignored; returns whether a
    /// cell changed.
    pub fn toggle_step(&mut self, voice: VoiceId, index: usize) -> bool {
        self.try_toggle_step(voice, index).is_ok()
    }

    /// Flip one cell, returning its new value.
    pub fn try_toggle_step(&mut self, voice: VoiceId, index: usize) -> Result<bool, GridError> {
        let len = self.pattern_length();
        let cell = self
            .grid
            .get_mut(voice, index)
            .ok_or(GridError::IndexOutOfRange { voice, index, len })?;
        *cell = !*cell;
        Ok(*cell)
    }

    pub fn clear_pattern(&mut self) {
        self.grid.clear();
    }

    pub fn generate_random_pattern<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.grid = random_grid(rng, self.pattern_length());
    }

    /// Resize to `measures`, keeping the overlapping prefix. Stops playback
    /// and rewinds. Returns false when `measures` is already current.
    pub fn change_pattern_length(&mut self, measures: Measures) -> bool {
        if measures == self.measures {
            return false;
        }
        if self.is_playing() {
            self.stop();
        }
        self.measures = measures;
        self.grid = self.grid.resized(measures.steps());
        self.transport.current_step = 0;
        log::debug!(target: "sequencer", "pattern length -> {} steps", measures.steps());
        true
    }

    // ── Snapshots ────────────────────────────────────────────────

    pub fn export_pattern(&self) -> PatternSnapshot {
        PatternSnapshot {
            pattern: self.grid.clone(),
            bpm: self.transport.bpm,
            pattern_length: Some(self.pattern_length()),
            measures: Some(self.measures),
        }
    }

    /// Replace the grid and tempo from a snapshot.
    ///
    /// The declared length is applied first (`measures`, else
    /// `patternLength`), then the incoming rows are fitted to it.
    pub fn import_pattern(&mut self, snapshot: PatternSnapshot) {
        let declared = snapshot.measures.or_else(|| {
            snapshot
                .pattern_length
                .filter(|len| len % STEPS_PER_MEASURE == 0)
                .and_then(|len| u8::try_from(len / STEPS_PER_MEASURE).ok())
                .and_then(Measures::from_count)
        });
        if let Some(measures) = declared {
            self.change_pattern_length(measures);
        }

        let len = self.pattern_length();
        if !snapshot.pattern.is_uniform(len) {
            log::warn!(
                target: "sequencer",
                "imported rows do not match {} steps; fitting them",
                len
            );
        }
        self.grid = snapshot.pattern.resized(len);
        self.set_bpm(i32::from(snapshot.bpm));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_initial_state() {
        let engine = PatternEngine::default();
        assert_eq!(engine.play_state(), PlayState::Stopped);
        assert_eq!(engine.current_step(), 0);
        assert_eq!(engine.bpm(), 120);
        assert_eq!(engine.pattern_length(), 16);
        assert_eq!(engine.grid().active_count(), 0);
    }

    #[test]
    fn test_transport_transitions() {
        let mut engine = PatternEngine::with_default_pattern();
        let mut sink: Vec<VoiceId> = Vec::new();
        assert!(engine.play());
        assert!(!engine.play());
        engine.tick(&mut sink);
        engine.tick(&mut sink);
        assert!(engine.pause());
        assert_eq!(engine.play_state(), PlayState::Paused);
        assert_eq!(engine.current_step(), 2);
        assert!(engine.tick(&mut sink).is_none());

        assert!(engine.play());
        assert_eq!(engine.current_step(), 2);
        engine.stop();
        assert_eq!(engine.play_state(), PlayState::Stopped);
        assert_eq!(engine.current_step(), 0);
        assert!(!engine.pause());
    }

    #[test]
    fn test_tick_plays_then_advances() {
        let mut engine = PatternEngine::with_default_pattern();
        let mut sink: Vec<VoiceId> = Vec::new();
        engine.play();
        let first = engine.tick(&mut sink).unwrap();
        assert_eq!(first.step, 0);
        assert_eq!(first.voices, vec![VoiceId::Kick, VoiceId::HiHat, VoiceId::Crash]);
        assert_eq!(sink, first.voices);
        assert_eq!(engine.current_step(), 1);
    }

    #[derive(Default)]
    struct StepLog(Vec<Vec<VoiceId>>);

    impl VoiceTrigger for StepLog {
        fn trigger(&mut self, voice: VoiceId) {
            self.0.push(vec![voice]);
        }

        fn trigger_step(&mut self, voices: &[VoiceId]) {
            self.0.push(voices.to_vec());
        }
    }

    #[test]
    fn test_tick_hands_over_whole_step() {
        let mut engine = PatternEngine::with_default_pattern();
        let mut log = StepLog::default();
        engine.play();
        engine.tick(&mut log);
        engine.tick(&mut log);
        assert_eq!(
            log.0,
            vec![vec![VoiceId::Kick, VoiceId::HiHat, VoiceId::Crash], vec![VoiceId::Shaker]]
        );
    }

    #[test]
    fn test_full_loop_at_120() {
        let mut engine = PatternEngine::with_default_pattern();
        let mut sink: Vec<VoiceId> = Vec::new();
        engine.play();
        assert_eq!(engine.step_duration(), Duration::from_millis(125));
        for _ in 0..16 {
            engine.tick(&mut sink);
        }
        assert_eq!(engine.current_step(), 0);
        assert!(engine.is_playing());
        assert_eq!(sink.len(), engine.grid().active_count());
    }

    #[test]
    fn test_set_bpm_clamps_and_is_idempotent() {
        let mut engine = PatternEngine::default();
        assert!(engine.set_bpm(500));
        assert_eq!(engine.bpm(), 200);
        assert!(!engine.set_bpm(500));
        assert!(!engine.set_bpm(200));
        assert!(engine.set_bpm(10));
        assert_eq!(engine.bpm(), 60);
        assert!(engine.adjust_bpm(5));
        assert_eq!(engine.bpm(), 65);
        assert!(engine.apply_preset(TempoPreset::VeryFast));
        assert_eq!(engine.bpm(), 180);
    }

    #[test]
    fn test_toggle_is_an_involution() {
        let mut engine = PatternEngine::with_default_pattern();
        let before = engine.grid().clone();
        for voice in VoiceId::ALL {
            for i in 0..16 {
                assert!(engine.toggle_step(voice, i));
                assert!(engine.toggle_step(voice, i));
            }
        }
        assert_eq!(engine.grid(), &before);
    }

    #[test]
    fn test_toggle_out_of_range() {
        let mut engine = PatternEngine::default();
        assert!(!engine.toggle_step(VoiceId::Kick, 16));
        assert_eq!(
            engine.try_toggle_step(VoiceId::Snare, 99),
            Err(GridError::IndexOutOfRange { voice: VoiceId::Snare, index: 99, len: 16 })
        );
        assert_eq!(engine.try_toggle_step(VoiceId::Snare, 3), Ok(true));
        assert_eq!(engine.grid().active_count(), 1);
    }

    #[test]
    fn test_clear_pattern() {
        let mut engine = PatternEngine::with_default_pattern();
        engine.clear_pattern();
        assert_eq!(engine.grid().active_count(), 0);
        assert!(engine.grid().is_uniform(16));
    }

    #[test]
    fn test_random_pattern_keeps_length() {
        let mut engine = PatternEngine::new(Measures::Four, 120);
        let mut rng = StdRng::seed_from_u64(3);
        engine.generate_random_pattern(&mut rng);
        assert!(engine.grid().is_uniform(64));
        assert!(engine.grid().active_count() > 0);
    }

    #[test]
    fn test_measures_lengths() {
        let mut engine = PatternEngine::default();
        assert_eq!(engine.pattern_length(), 16);
        engine.change_pattern_length(Measures::Eight);
        assert_eq!(engine.pattern_length(), 128);
        assert!(engine.grid().is_uniform(128));
    }

    #[test]
    fn test_length_change_round_trip_keeps_overlap() {
        let mut engine = PatternEngine::new(Measures::Two, 120);
        let mut rng = StdRng::seed_from_u64(11);
        engine.generate_random_pattern(&mut rng);
        let original = engine.grid().clone();

        assert!(engine.change_pattern_length(Measures::One));
        assert!(engine.change_pattern_length(Measures::Two));
        for voice in VoiceId::ALL {
            assert_eq!(&engine.grid().row(voice)[..16], &original.row(voice)[..16]);
            assert!(engine.grid().row(voice)[16..].iter().all(|on| !on));
        }
    }

    #[test]
    fn test_length_change_stops_and_rewinds() {
        let mut engine = PatternEngine::with_default_pattern();
        let mut sink: Vec<VoiceId> = Vec::new();
        engine.play();
        engine.tick(&mut sink);
        assert!(!engine.change_pattern_length(Measures::One));
        assert!(engine.is_playing());

        assert!(engine.change_pattern_length(Measures::Four));
        assert_eq!(engine.play_state(), PlayState::Stopped);
        assert_eq!(engine.current_step(), 0);
    }

    #[test]
    fn test_export_import_round_trip() {
        let mut source = PatternEngine::new(Measures::Two, 120);
        let mut rng = StdRng::seed_from_u64(8);
        source.generate_random_pattern(&mut rng);
        source.set_bpm(97);

        let json = serde_json::to_string(&source.export_pattern()).unwrap();
        let snapshot: PatternSnapshot = serde_json::from_str(&json).unwrap();

        let mut fresh = PatternEngine::default();
        fresh.import_pattern(snapshot);
        assert_eq!(fresh.grid(), source.grid());
        assert_eq!(fresh.bpm(), 97);
        assert_eq!(fresh.measures(), Measures::Two);
    }

    #[test]
    fn test_import_resizes_before_applying_cells() {
        let mut engine = PatternEngine::default();
        let mut row = vec![false; 32];
        row[31] = true;
        let snapshot = PatternSnapshot {
            pattern: PatternGrid::from_rows([(VoiceId::Clap, row)], 32),
            bpm: 130,
            pattern_length: Some(32),
            measures: Some(Measures::Two),
        };
        engine.import_pattern(snapshot);
        assert_eq!(engine.pattern_length(), 32);
        assert_eq!(engine.grid().get(VoiceId::Clap, 31), Some(true));
        assert_eq!(engine.bpm(), 130);
    }

    #[test]
    fn test_import_fits_mismatched_rows() {
        let mut engine = PatternEngine::default();
        let json = r#"{"pattern":{"kick":[true,false,true],"snare":[true,true,true,true,true,true,true,true,true,true,true,true,true,true,true,true,true,true],"gong":[true]},"bpm":90}"#;
        let snapshot: PatternSnapshot = serde_json::from_str(json).unwrap();
        engine.import_pattern(snapshot);
        assert!(engine.grid().is_uniform(16));
        assert_eq!(engine.grid().get(VoiceId::Kick, 2), Some(true));
        assert_eq!(engine.grid().get(VoiceId::Kick, 3), Some(false));
        assert_eq!(engine.grid().row(VoiceId::Snare).iter().filter(|on| **on).count(), 16);
        assert_eq!(engine.bpm(), 90);
    }

    #[test]
    fn test_import_uses_pattern_length_without_measures() {
        let mut engine = PatternEngine::default();
        let snapshot = PatternSnapshot {
            pattern: PatternGrid::new(64),
            bpm: 120,
            pattern_length: Some(64),
            measures: None,
        };
        engine.import_pattern(snapshot);
        assert_eq!(engine.measures(), Measures::Four);
    }

    #[test]
    fn test_progress() {
        let mut engine = PatternEngine::with_default_pattern();
        assert_eq!(engine.progress(), 0.0);
        engine.play();
        let mut sink: Vec<VoiceId> = Vec::new();
        for _ in 0..3 {
            engine.tick(&mut sink);
        }
        assert_eq!(engine.progress(), 0.25);
    }
}
