//! Pattern engine state through storage and back.

use rand::rngs::StdRng;
use rand::SeedableRng;

use beatgrid_core::storage::PatternStorage;
use beatgrid_core::{PatternEngine, StorageError};
use beatgrid_types::{Measures, VoiceId};

#[test]
fn preset_round_trip_into_fresh_engine() {
    let dir = tempfile::tempdir().unwrap();
    let storage = PatternStorage::new(dir.path());

    let mut source = PatternEngine::new(Measures::Four, 120);
    source.generate_random_pattern(&mut StdRng::seed_from_u64(21));
    source.set_bpm(174);
    storage.save_preset(3, source.export_pattern()).unwrap();

    let mut target = PatternEngine::default();
    target.import_pattern(storage.load_preset(3).unwrap().snapshot);
    assert_eq!(target.grid(), source.grid());
    assert_eq!(target.bpm(), 174);
    assert_eq!(target.measures(), Measures::Four);
}

#[test]
fn two_measure_file_resizes_one_measure_engine() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("two.json");
    let mut clap = vec![false; 32];
    clap[20] = true;
    let json = serde_json::json!({
        "name": "two bars",
        "pattern": { "clap": clap },
        "bpm": 100,
        "patternLength": 32,
        "measures": 2,
        "timestamp": 1_700_000_000_000u64,
        "version": "2.0"
    });
    std::fs::write(&path, json.to_string()).unwrap();

    let storage = PatternStorage::new(dir.path());
    let record = storage.import_from_file(&path).unwrap();

    let mut engine = PatternEngine::default();
    engine.import_pattern(record.snapshot);
    assert_eq!(engine.pattern_length(), 32);
    assert_eq!(engine.grid().get(VoiceId::Clap, 20), Some(true));
    assert!(engine.grid().is_uniform(32));
    assert_eq!(engine.bpm(), 100);
}

#[test]
fn rejected_file_leaves_engine_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, r#"{"name":"no tempo","pattern":{"kick":[true]}}"#).unwrap();

    let storage = PatternStorage::new(dir.path());
    let engine = PatternEngine::with_default_pattern();
    let before = engine.export_pattern();

    let result = storage.import_from_file(&path);
    assert!(matches!(result, Err(StorageError::InvalidRecord(_))));
    assert_eq!(engine.export_pattern(), before);
}

#[test]
fn named_patterns_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let engine = PatternEngine::with_default_pattern();
    PatternStorage::new(dir.path())
        .save_named("basic", engine.export_pattern())
        .unwrap();

    let reopened = PatternStorage::new(dir.path());
    let record = reopened.find_named("basic").unwrap();
    assert_eq!(record.snapshot.pattern, *engine.grid());
    assert_eq!(reopened.storage_info().unwrap().pattern_count, 1);
}
