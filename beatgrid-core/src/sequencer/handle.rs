//! SequencerHandle: control-side interface to the sequencer thread.
//!
//! Owns the command/feedback channels. The pattern engine, the voice output
//! and the step clock live on the sequencer thread.

use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;
use rand::rngs::StdRng;
use rand::SeedableRng;

use beatgrid_types::{
    Measures, PatternSnapshot, PlayState, TempoPreset, TransportState, VoiceId, VoiceTrigger,
};

use super::commands::{SequencerCmd, SequencerFeedback};
use super::thread::SequencerThread;
use crate::engine::PatternEngine;

const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// Sequencer-owned read state, kept current from feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerReadState {
    pub play_state: PlayState,
    pub bpm: u16,
    pub measures: Measures,
    /// Most recently played step.
    pub last_step: Option<usize>,
}

pub struct SequencerHandle {
    cmd_tx: Sender<SequencerCmd>,
    feedback_rx: Receiver<SequencerFeedback>,
    read_state: SequencerReadState,
    join_handle: Option<JoinHandle<()>>,
}

impl SequencerHandle {
    /// Move `engine` and `voices` onto a new sequencer thread.
    pub fn spawn(engine: PatternEngine, voices: Box<dyn VoiceTrigger + Send>) -> Self {
        Self::spawn_with_rng(engine, voices, StdRng::from_os_rng())
    }

    /// As [`spawn`](Self::spawn), with the RNG used for random patterns.
    pub fn spawn_with_rng(engine: PatternEngine, voices: Box<dyn VoiceTrigger + Send>, rng: StdRng) -> Self {
        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
        let (feedback_tx, feedback_rx) = mpsc::channel();
        let read_state = SequencerReadState {
            play_state: engine.play_state(),
            bpm: engine.bpm(),
            measures: engine.measures(),
            last_step: None,
        };

        let join_handle = thread::Builder::new()
            .name("beatgrid-sequencer".to_string())
            .spawn(move || {
                SequencerThread::new(engine, voices, rng, cmd_rx, feedback_tx).run();
            })
            .map_err(|e| log::error!(target: "sequencer", "failed to spawn sequencer thread: {}", e))
            .ok();

        Self {
            cmd_tx,
            feedback_rx,
            read_state,
            join_handle,
        }
    }

    /// Send a command to the sequencer thread.
    pub fn send_cmd(&self, cmd: SequencerCmd) -> Result<(), String> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| "Sequencer thread disconnected".to_string())
    }

    /// Fire-and-forget: send a command and log if the thread is gone.
    fn send(&self, cmd: SequencerCmd) {
        if let Err(e) = self.send_cmd(cmd) {
            log::warn!(target: "sequencer", "command dropped: {}", e);
        }
    }

    pub fn drain_feedback(&mut self) -> Vec<SequencerFeedback> {
        let mut out = Vec::new();
        while let Ok(msg) = self.feedback_rx.try_recv() {
            self.apply_feedback(&msg);
            out.push(msg);
        }
        out
    }

    /// Block up to `timeout` for the next feedback message.
    pub fn recv_feedback(&mut self, timeout: Duration) -> Option<SequencerFeedback> {
        let msg = self.feedback_rx.recv_timeout(timeout).ok()?;
        self.apply_feedback(&msg);
        Some(msg)
    }

    fn apply_feedback(&mut self, feedback: &SequencerFeedback) {
        match feedback {
            SequencerFeedback::StepPlayed { step, .. } => self.read_state.last_step = Some(*step),
            SequencerFeedback::TransportChanged(state) => {
                self.read_state.play_state = *state;
                if *state == PlayState::Stopped {
                    self.read_state.last_step = None;
                }
            }
            SequencerFeedback::BpmChanged(bpm) => self.read_state.bpm = *bpm,
            SequencerFeedback::PatternLengthChanged(measures) => {
                self.read_state.measures = *measures;
                self.read_state.last_step = None;
            }
        }
    }

    /// State as of the last drained feedback.
    pub fn read_state(&self) -> SequencerReadState {
        self.read_state
    }

    // ── Transport ─────────────────────────────────────────────────

    pub fn play(&self) {
        self.send(SequencerCmd::Play);
    }

    pub fn pause(&self) {
        self.send(SequencerCmd::Pause);
    }

    pub fn stop(&self) {
        self.send(SequencerCmd::Stop);
    }

    pub fn set_bpm(&self, bpm: i32) {
        self.send(SequencerCmd::SetBpm { bpm });
    }

    pub fn adjust_bpm(&self, delta: i32) {
        self.send(SequencerCmd::AdjustBpm { delta });
    }

    pub fn apply_preset(&self, preset: TempoPreset) {
        self.send(SequencerCmd::ApplyPreset { preset });
    }

    // ── Grid ──────────────────────────────────────────────────────

    pub fn toggle_step(&self, voice: VoiceId, index: usize) {
        self.send(SequencerCmd::ToggleStep { voice, index });
    }

    pub fn clear_pattern(&self) {
        self.send(SequencerCmd::ClearPattern);
    }

    pub fn generate_random_pattern(&self) {
        self.send(SequencerCmd::RandomizePattern);
    }

    pub fn change_pattern_length(&self, measures: Measures) {
        self.send(SequencerCmd::ChangePatternLength { measures });
    }

    pub fn import_pattern(&self, snapshot: PatternSnapshot) {
        self.send(SequencerCmd::ImportPattern { snapshot });
    }

    /// Audition one voice now, independent of the grid.
    pub fn play_voice(&self, voice: VoiceId) {
        self.send(SequencerCmd::PlayVoice { voice });
    }

    // ── Queries ───────────────────────────────────────────────────

    pub fn export_pattern(&self) -> Result<PatternSnapshot, String> {
        let (reply, rx) = mpsc::channel();
        self.send_cmd(SequencerCmd::ExportPattern { reply })?;
        rx.recv_timeout(REPLY_TIMEOUT)
            .map_err(|_| "Sequencer did not answer export".to_string())
    }

    pub fn transport(&self) -> Result<TransportState, String> {
        let (reply, rx) = mpsc::channel();
        self.send_cmd(SequencerCmd::QueryTransport { reply })?;
        rx.recv_timeout(REPLY_TIMEOUT)
            .map_err(|_| "Sequencer did not answer transport query".to_string())
    }
}

impl Drop for SequencerHandle {
    fn drop(&mut self) {
        let _ = self.send_cmd(SequencerCmd::Shutdown);
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}
