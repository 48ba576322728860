//! DSP building blocks for one-shot drum synthesis.
//!
//! Everything here renders into plain `Vec<f32>` buffers at a given sample
//! rate. Nothing is reused between renders except the reverb's cached
//! impulse spectrum.

pub mod filter;
pub mod noise;
pub mod oscillator;
pub mod param;
pub mod reverb;

pub use filter::FilterKind;
pub use oscillator::Oscillator;
pub use param::ParamTimeline;
pub use reverb::Convolver;
