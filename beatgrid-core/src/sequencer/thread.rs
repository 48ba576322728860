//! The sequencer thread: owns the pattern engine, the voice output and the
//! step clock.
//!
//! The step clock is a fixed interval. While playing, the next tick is due
//! one step duration after the previous one was due; a tempo change restarts
//! the interval from the moment it is applied.

use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};
use rand::rngs::StdRng;

use beatgrid_types::{Measures, PlayState, VoiceTrigger};

use super::commands::{SequencerCmd, SequencerFeedback};
use crate::engine::PatternEngine;

/// Everything a command may change that the clock or the feedback channel
/// cares about.
#[derive(Clone, Copy, PartialEq, Eq)]
struct Observed {
    play_state: PlayState,
    bpm: u16,
    measures: Measures,
}

impl Observed {
    fn of(engine: &PatternEngine) -> Self {
        Self {
            play_state: engine.play_state(),
            bpm: engine.bpm(),
            measures: engine.measures(),
        }
    }
}

pub(crate) struct SequencerThread {
    engine: PatternEngine,
    voices: Box<dyn VoiceTrigger + Send>,
    rng: StdRng,
    cmd_rx: Receiver<SequencerCmd>,
    feedback_tx: Sender<SequencerFeedback>,
    next_tick: Option<Instant>,
}

impl SequencerThread {
    pub(crate) fn new(
        engine: PatternEngine,
        voices: Box<dyn VoiceTrigger + Send>,
        rng: StdRng,
        cmd_rx: Receiver<SequencerCmd>,
        feedback_tx: Sender<SequencerFeedback>,
    ) -> Self {
        Self {
            engine,
            voices,
            rng,
            cmd_rx,
            feedback_tx,
            next_tick: None,
        }
    }

    pub(crate) fn run(mut self) {
        // A handle may spawn the thread already playing.
        if self.engine.is_playing() {
            self.voices.wake();
            self.next_tick = Some(Instant::now() + self.engine.step_duration());
        }

        loop {
            match self.next_tick {
                None => match self.cmd_rx.recv() {
                    Ok(cmd) => {
                        if self.apply(cmd) {
                            break;
                        }
                    }
                    Err(_) => break,
                },
                Some(due) => {
                    let remaining = due.saturating_duration_since(Instant::now());
                    crossbeam_channel::select! {
                        recv(self.cmd_rx) -> result => {
                            match result {
                                Ok(cmd) => {
                                    if self.apply(cmd) {
                                        break;
                                    }
                                }
                                Err(_) => break,
                            }
                        }
                        default(remaining) => {}
                    }
                }
            }

            if self.drain_commands() {
                break;
            }

            if let Some(due) = self.next_tick {
                if Instant::now() >= due {
                    self.fire();
                    self.next_tick = Some(due + self.engine.step_duration());
                }
            }
        }

        log::debug!(target: "sequencer", "sequencer thread exiting");
    }

    fn drain_commands(&mut self) -> bool {
        const MAX_DRAIN_PER_TICK: usize = 64;
        for _ in 0..MAX_DRAIN_PER_TICK {
            match self.cmd_rx.try_recv() {
                Ok(cmd) => {
                    if self.apply(cmd) {
                        return true;
                    }
                }
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => return true,
            }
        }
        false
    }

    fn fire(&mut self) {
        if let Some(tick) = self.engine.tick(self.voices.as_mut()) {
            self.feedback(SequencerFeedback::StepPlayed {
                step: tick.step,
                voices: tick.voices,
            });
        }
    }

    /// Apply one command, then reconcile the clock and report what changed.
    /// Returns true on shutdown.
    fn apply(&mut self, cmd: SequencerCmd) -> bool {
        let before = Observed::of(&self.engine);
        let shutdown = self.handle_cmd(cmd);
        let after = Observed::of(&self.engine);

        if after != before {
            self.reconcile(before, after);
        }
        shutdown
    }

    fn handle_cmd(&mut self, cmd: SequencerCmd) -> bool {
        match cmd {
            SequencerCmd::Play => {
                if self.engine.play() {
                    self.voices.wake();
                }
            }
            SequencerCmd::Pause => {
                self.engine.pause();
            }
            SequencerCmd::Stop => {
                self.engine.stop();
            }
            SequencerCmd::SetBpm { bpm } => {
                self.engine.set_bpm(bpm);
            }
            SequencerCmd::AdjustBpm { delta } => {
                self.engine.adjust_bpm(delta);
            }
            SequencerCmd::ApplyPreset { preset } => {
                self.engine.apply_preset(preset);
            }
            SequencerCmd::ToggleStep { voice, index } => {
                if let Err(e) = self.engine.try_toggle_step(voice, index) {
                    log::warn!(target: "sequencer", "ignoring toggle: {}", e);
                }
            }
            SequencerCmd::ClearPattern => self.engine.clear_pattern(),
            SequencerCmd::RandomizePattern => self.engine.generate_random_pattern(&mut self.rng),
            SequencerCmd::ChangePatternLength { measures } => {
                self.engine.change_pattern_length(measures);
            }
            SequencerCmd::ImportPattern { snapshot } => self.engine.import_pattern(snapshot),
            SequencerCmd::PlayVoice { voice } => self.voices.trigger(voice),
            SequencerCmd::ExportPattern { reply } => {
                let _ = reply.send(self.engine.export_pattern());
            }
            SequencerCmd::QueryTransport { reply } => {
                let _ = reply.send(self.engine.transport());
            }
            SequencerCmd::Shutdown => {
                self.engine.stop();
                return true;
            }
        }
        false
    }

    fn reconcile(&mut self, before: Observed, after: Observed) {
        if after.play_state != before.play_state {
            self.next_tick = if after.play_state == PlayState::Playing {
                Some(Instant::now() + self.engine.step_duration())
            } else {
                None
            };
            self.feedback(SequencerFeedback::TransportChanged(after.play_state));
        }
        if after.bpm != before.bpm {
            if self.engine.is_playing() {
                self.next_tick = Some(Instant::now() + self.engine.step_duration());
            }
            self.feedback(SequencerFeedback::BpmChanged(after.bpm));
        }
        if after.measures != before.measures {
            self.feedback(SequencerFeedback::PatternLengthChanged(after.measures));
        }
    }

    fn feedback(&self, msg: SequencerFeedback) {
        // The handle may already be gone during shutdown.
        let _ = self.feedback_tx.send(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};

    use beatgrid_types::VoiceId;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<VoiceId>>>);

    impl VoiceTrigger for Recorder {
        fn trigger(&mut self, voice: VoiceId) {
            self.0.lock().unwrap().push(voice);
        }
    }

    fn thread_with(engine: PatternEngine) -> (SequencerThread, Recorder, mpsc::Receiver<SequencerFeedback>) {
        let recorder = Recorder::default();
        let (_cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
        let (feedback_tx, feedback_rx) = mpsc::channel();
        let thread = SequencerThread::new(
            engine,
            Box::new(recorder.clone()),
            StdRng::seed_from_u64(0),
            cmd_rx,
            feedback_tx,
        );
        (thread, recorder, feedback_rx)
    }

    #[test]
    fn play_arms_clock_and_reports() {
        let (mut thread, _, feedback) = thread_with(PatternEngine::with_default_pattern());
        assert!(thread.next_tick.is_none());
        thread.apply(SequencerCmd::Play);
        assert!(thread.next_tick.is_some());
        assert_eq!(feedback.try_recv().unwrap(), SequencerFeedback::TransportChanged(PlayState::Playing));

        // Already playing: nothing changes, nothing reported.
        thread.apply(SequencerCmd::Play);
        assert!(feedback.try_recv().is_err());

        thread.apply(SequencerCmd::Pause);
        assert!(thread.next_tick.is_none());
        assert_eq!(feedback.try_recv().unwrap(), SequencerFeedback::TransportChanged(PlayState::Paused));
    }

    #[test]
    fn bpm_change_while_playing_restarts_clock() {
        let (mut thread, _, feedback) = thread_with(PatternEngine::with_default_pattern());
        thread.apply(SequencerCmd::Play);
        let first = thread.next_tick;
        std::thread::sleep(Duration::from_millis(2));
        thread.apply(SequencerCmd::SetBpm { bpm: 60 });
        assert!(thread.next_tick > first);
        let msgs: Vec<_> = feedback.try_iter().collect();
        assert_eq!(msgs.last(), Some(&SequencerFeedback::BpmChanged(60)));

        // Same clamped tempo: no restart.
        let armed = thread.next_tick;
        thread.apply(SequencerCmd::SetBpm { bpm: 10 });
        assert_eq!(thread.next_tick, armed);
        assert!(feedback.try_recv().is_err());
    }

    #[test]
    fn length_change_stops_clock() {
        let (mut thread, _, feedback) = thread_with(PatternEngine::with_default_pattern());
        thread.apply(SequencerCmd::Play);
        thread.apply(SequencerCmd::ChangePatternLength { measures: Measures::Two });
        assert!(thread.next_tick.is_none());
        let msgs: Vec<_> = feedback.try_iter().collect();
        assert_eq!(
            msgs,
            vec![
                SequencerFeedback::TransportChanged(PlayState::Playing),
                SequencerFeedback::TransportChanged(PlayState::Stopped),
                SequencerFeedback::PatternLengthChanged(Measures::Two),
            ]
        );
    }

    #[test]
    fn fire_triggers_active_voices() {
        let (mut thread, recorder, feedback) = thread_with(PatternEngine::with_default_pattern());
        thread.apply(SequencerCmd::Play);
        let _ = feedback.try_recv();
        thread.fire();
        assert_eq!(*recorder.0.lock().unwrap(), vec![VoiceId::Kick, VoiceId::HiHat, VoiceId::Crash]);
        assert_eq!(
            feedback.try_recv().unwrap(),
            SequencerFeedback::StepPlayed {
                step: 0,
                voices: vec![VoiceId::Kick, VoiceId::HiHat, VoiceId::Crash]
            }
        );
    }

    #[test]
    fn play_voice_bypasses_grid() {
        let (mut thread, recorder, _) = thread_with(PatternEngine::default());
        thread.apply(SequencerCmd::PlayVoice { voice: VoiceId::Cowbell });
        assert_eq!(*recorder.0.lock().unwrap(), vec![VoiceId::Cowbell]);
    }
}
