//! Audio backend trait: the platform seam under the synthesis engine.
//!
//! `AudioBackend` captures what the synthesis engine needs from an audio
//! platform (a clock, a sample rate, a suspend/resume lifecycle, and a way to
//! schedule a rendered buffer) independently of how sound reaches a device.
//! This enables unit testing of trigger logic without an output device.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Result type for backend operations.
pub type BackendResult<T = ()> = Result<T, BackendError>;

/// Error from a backend operation.
#[derive(Debug, Clone)]
pub struct BackendError(pub String);

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(e: std::io::Error) -> Self {
        BackendError(e.to_string())
    }
}

/// Lifecycle of the audio context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Running,
    Suspended,
    Closed,
}

/// Semantic-level audio platform trait.
///
/// Implementations own the device (or pretend to). `play_buffer` must not
/// block on playback: it hands the buffer over and returns.
pub trait AudioBackend: Send {
    fn state(&self) -> ContextState;

    /// Ask a suspended context to start running again. May complete after
    /// this call returns.
    fn resume(&self) -> BackendResult;

    fn sample_rate(&self) -> u32;

    /// Seconds on the context clock.
    fn current_time(&self) -> f64;

    /// Schedule a mono buffer to start at `when` (context clock seconds).
    /// Times in the past start immediately.
    fn play_buffer(&self, samples: Vec<f32>, when: f64, gain: f32) -> BackendResult;
}

impl<T: AudioBackend + Sync + ?Sized> AudioBackend for Arc<T> {
    fn state(&self) -> ContextState {
        (**self).state()
    }

    fn resume(&self) -> BackendResult {
        (**self).resume()
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn current_time(&self) -> f64 {
        (**self).current_time()
    }

    fn play_buffer(&self, samples: Vec<f32>, when: f64, gain: f32) -> BackendResult {
        (**self).play_buffer(samples, when, gain)
    }
}

// ─── Null Backend ───────────────────────────────────────────────────

/// Stand-in used when no output device could be opened. Always closed, so
/// triggers degrade to logged no-ops.
pub struct NullBackend {
    sample_rate: u32,
}

impl NullBackend {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

impl AudioBackend for NullBackend {
    fn state(&self) -> ContextState {
        ContextState::Closed
    }

    fn resume(&self) -> BackendResult {
        Err(BackendError("no audio device".to_string()))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        0.0
    }

    fn play_buffer(&self, _samples: Vec<f32>, _when: f64, _gain: f32) -> BackendResult {
        Err(BackendError("no audio device".to_string()))
    }
}

// ─── Test Backend ───────────────────────────────────────────────────

/// An operation recorded by `TestBackend` for assertion in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum TestOp {
    Resume,
    PlayBuffer {
        samples: Vec<f32>,
        when: f64,
        gain: f32,
    },
}

/// A test backend that records all operations into a vector for assertions.
/// Uses `Mutex` for interior mutability so the backend is `Send + Sync`
/// (needed for `Arc<TestBackend>` sharing with the sequencer thread).
pub struct TestBackend {
    ops: Mutex<Vec<TestOp>>,
    state: Mutex<ContextState>,
    time: Mutex<f64>,
    drift: Mutex<f64>,
    sample_rate: u32,
}

impl TestBackend {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            ops: Mutex::new(Vec::new()),
            state: Mutex::new(ContextState::Running),
            time: Mutex::new(0.0),
            drift: Mutex::new(0.0),
            sample_rate,
        }
    }

    /// A backend that starts suspended, like a context created before any
    /// user gesture.
    pub fn suspended(sample_rate: u32) -> Self {
        let backend = Self::new(sample_rate);
        backend.set_state(ContextState::Suspended);
        backend
    }

    pub fn set_state(&self, state: ContextState) {
        *self.state.lock().unwrap() = state;
    }

    pub fn set_time(&self, time: f64) {
        *self.time.lock().unwrap() = time;
    }

    /// Return all recorded operations.
    pub fn operations(&self) -> Vec<TestOp> {
        self.ops.lock().unwrap().clone()
    }

    /// Advance the clock by `seconds` after every `current_time` read.
    pub fn set_clock_drift(&self, seconds: f64) {
        *self.drift.lock().unwrap() = seconds;
    }

    /// Count operations matching a predicate.
    pub fn count<F: Fn(&TestOp) -> bool>(&self, f: F) -> usize {
        self.ops.lock().unwrap().iter().filter(|op| f(op)).count()
    }

    /// Start times of every scheduled buffer, in call order.
    pub fn play_times(&self) -> Vec<f64> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter_map(|op| match op {
                TestOp::PlayBuffer { when, .. } => Some(*when),
                _ => None,
            })
            .collect()
    }
}

impl AudioBackend for TestBackend {
    fn state(&self) -> ContextState {
        *self.state.lock().unwrap()
    }

    fn resume(&self) -> BackendResult {
        self.ops.lock().unwrap().push(TestOp::Resume);
        let mut state = self.state.lock().unwrap();
        match *state {
            ContextState::Closed => Err(BackendError("context closed".to_string())),
            _ => {
                *state = ContextState::Running;
                Ok(())
            }
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        let mut time = self.time.lock().unwrap();
        let now = *time;
        *time += *self.drift.lock().unwrap();
        now
    }

    fn play_buffer(&self, samples: Vec<f32>, when: f64, gain: f32) -> BackendResult {
        self.ops
            .lock()
            .unwrap()
            .push(TestOp::PlayBuffer { samples, when, gain });
        Ok(())
    }
}
