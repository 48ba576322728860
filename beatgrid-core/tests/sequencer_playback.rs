//! Drives the real sequencer thread into a synthesis engine over the
//! recording backend.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use beatgrid_audio::{SynthEngine, TestBackend, TestOp};
use beatgrid_core::{PatternEngine, SequencerFeedback, SequencerHandle};
use beatgrid_types::{Measures, PlayState, VoiceId};

const SR: u32 = 8_000;
const WAIT: Duration = Duration::from_secs(3);

fn spawn(engine: PatternEngine) -> (SequencerHandle, Arc<TestBackend>) {
    let backend = Arc::new(TestBackend::new(SR));
    let synth = SynthEngine::with_rng(Box::new(Arc::clone(&backend)), StdRng::seed_from_u64(1));
    let handle = SequencerHandle::spawn_with_rng(engine, Box::new(synth), StdRng::seed_from_u64(2));
    (handle, backend)
}

/// Wait for the next `StepPlayed`, skipping other feedback.
fn next_step(handle: &mut SequencerHandle) -> (usize, Vec<VoiceId>) {
    loop {
        match handle.recv_feedback(WAIT) {
            Some(SequencerFeedback::StepPlayed { step, voices }) => return (step, voices),
            Some(_) => continue,
            None => panic!("sequencer produced no step within {:?}", WAIT),
        }
    }
}

#[test]
fn one_full_loop_plays_every_step_in_order() {
    let mut engine = PatternEngine::with_default_pattern();
    engine.set_bpm(200);
    let expected_hits = engine.grid().active_count();
    let (mut handle, backend) = spawn(engine);

    handle.play();
    let steps: Vec<usize> = (0..16).map(|_| next_step(&mut handle).0).collect();
    handle.pause();

    assert_eq!(steps, (0..16).collect::<Vec<_>>());
    let transport = handle.transport().unwrap();
    assert_eq!(transport.current_step, 0);
    assert_eq!(transport.play_state, PlayState::Paused);
    assert_eq!(
        backend.count(|op| matches!(op, TestOp::PlayBuffer { .. })),
        expected_hits
    );
}

#[test]
fn pause_resumes_from_retained_step() {
    let mut engine = PatternEngine::with_default_pattern();
    engine.set_bpm(200);
    let (mut handle, _backend) = spawn(engine);

    handle.play();
    for _ in 0..3 {
        next_step(&mut handle);
    }
    handle.pause();
    let paused = handle.transport().unwrap();
    assert_eq!(paused.play_state, PlayState::Paused);
    assert_eq!(paused.current_step, 3);

    handle.play();
    assert_eq!(next_step(&mut handle).0, 3);

    handle.stop();
    let stopped = handle.transport().unwrap();
    assert_eq!(stopped.play_state, PlayState::Stopped);
    assert_eq!(stopped.current_step, 0);
}

#[test]
fn tempo_change_while_playing_keeps_playing() {
    let mut engine = PatternEngine::with_default_pattern();
    engine.set_bpm(200);
    let (mut handle, _backend) = spawn(engine);

    handle.play();
    next_step(&mut handle);
    handle.set_bpm(190);
    next_step(&mut handle);
    handle.stop();
    handle.transport().unwrap();
    handle.drain_feedback();

    assert_eq!(handle.read_state().bpm, 190);
    assert_eq!(handle.read_state().play_state, PlayState::Stopped);
}

#[test]
fn edits_through_the_handle() {
    let (mut handle, backend) = spawn(PatternEngine::default());

    handle.toggle_step(VoiceId::Clap, 4);
    handle.toggle_step(VoiceId::Clap, 99);
    handle.change_pattern_length(Measures::Two);
    let snapshot = handle.export_pattern().unwrap();
    assert_eq!(snapshot.measures, Some(Measures::Two));
    assert_eq!(snapshot.pattern_length, Some(32));
    assert_eq!(snapshot.pattern.get(VoiceId::Clap, 4), Some(true));
    assert_eq!(snapshot.pattern.active_count(), 1);

    handle.play_voice(VoiceId::Kick);
    handle.clear_pattern();
    assert_eq!(handle.export_pattern().unwrap().pattern.active_count(), 0);
    assert_eq!(backend.count(|op| matches!(op, TestOp::PlayBuffer { .. })), 1);

    handle.generate_random_pattern();
    let random = handle.export_pattern().unwrap();
    assert!(random.pattern.is_uniform(32));

    handle.drain_feedback();
    assert_eq!(handle.read_state().measures, Measures::Two);
}
