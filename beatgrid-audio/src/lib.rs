//! # beatgrid-audio
//!
//! The Voice Synthesis Engine. `SynthEngine` turns a `VoiceId` into a freshly
//! rendered one-shot and schedules it on an `AudioBackend`:
//!
//! - `CpalBackend` plays on an output device.
//! - `NullBackend` stands in when no device could be opened.
//! - `TestBackend` records what was scheduled, for tests.

pub mod backend;
pub mod cpal_backend;
pub mod dsp;
pub mod synth;
pub mod wav;

pub use backend::{AudioBackend, BackendError, BackendResult, ContextState, NullBackend, TestBackend, TestOp};
pub use cpal_backend::CpalBackend;
pub use synth::SynthEngine;
