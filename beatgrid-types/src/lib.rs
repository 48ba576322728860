//! # beatgrid-types
//!
//! Shared type definitions for the beatgrid drum machine.
//! Plain data used by the synthesis engine, the pattern engine and
//! persistence; no behavior beyond small helpers.

pub mod pattern;
pub mod recipe;
pub mod snapshot;
pub mod transport;
pub mod voice;

pub use pattern::{Measures, PatternGrid, STEPS_PER_MEASURE};
pub use recipe::{Envelope, SynthModel, VoiceRecipe, Waveform, ENVELOPE_PEAK};
pub use snapshot::{PatternSnapshot, SavedPatternRecord, RECORD_APP, RECORD_VERSION};
pub use transport::{
    beat_duration_ms, clamp_bpm, step_duration, tempo_genre, PlayState, TempoPreset,
    TransportState, DEFAULT_BPM, MAX_BPM, MIN_BPM,
};
pub use voice::{UnknownVoice, VoiceId, VoiceTrigger, NUM_VOICES};
