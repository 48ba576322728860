//! # beatgrid-core
//!
//! The Pattern Engine and everything around it: the step grid and transport,
//! the sequencer thread that drives ticks, pattern persistence and
//! configuration. Independent of any UI; voices are reached only through the
//! `VoiceTrigger` seam.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use beatgrid_audio::{CpalBackend, SynthEngine};
//! use beatgrid_core::config::Config;
//! use beatgrid_core::engine::PatternEngine;
//! use beatgrid_core::sequencer::SequencerHandle;
//!
//! // 1. Defaults from config
//! let config = Config::load();
//!
//! // 2. One synthesis engine, one pattern engine
//! let backend = CpalBackend::open(config.output_device(), config.sample_rate())?;
//! let synth = SynthEngine::new(Box::new(backend));
//! let engine = PatternEngine::with_default_pattern();
//!
//! // 3. Hand both to the sequencer thread and drive it through the handle
//! let mut sequencer = SequencerHandle::spawn(engine, Box::new(synth));
//! sequencer.play();
//!
//! // 4. Drain SequencerFeedback for step/transport updates
//! for msg in sequencer.drain_feedback() { /* ... */ }
//! ```
//!
//! ## Module Overview
//!
//! - [`engine`]: `PatternEngine` with grid, transport, tempo, import/export
//! - [`sequencer`]: `SequencerHandle` and the step clock thread, driven by
//!   `SequencerCmd` / `SequencerFeedback` over channels
//! - [`random`]: per-voice random groove rules
//! - [`default_pattern`]: the startup groove
//! - [`storage`]: named patterns, preset slots, pattern files
//! - [`config`]: TOML configuration (embedded defaults + user override)
//! - [`error`]: `GridError`, `StorageError`

pub mod config;
pub mod default_pattern;
pub mod engine;
pub mod error;
pub mod random;
pub mod sequencer;
pub mod storage;

pub use engine::{PatternEngine, Tick};
pub use error::{GridError, StorageError};
pub use sequencer::{SequencerCmd, SequencerFeedback, SequencerHandle};
pub use storage::{PatternStorage, StorageInfo};
