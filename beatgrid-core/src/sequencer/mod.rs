//! The step-advance loop as a cancellable task behind a command channel.

pub mod commands;
pub mod handle;
mod thread;

pub use commands::{SequencerCmd, SequencerFeedback};
pub use handle::{SequencerHandle, SequencerReadState};
