use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use beatgrid_audio::{AudioBackend, CpalBackend, NullBackend, SynthEngine};
use beatgrid_core::config::Config;
use beatgrid_core::storage::PatternStorage;
use beatgrid_core::{PatternEngine, SequencerFeedback, SequencerHandle};
use beatgrid_types::{beat_duration_ms, step_duration, tempo_genre, Measures, TempoPreset, VoiceId};

const FALLBACK_SAMPLE_RATE: u32 = 44_100;

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("beatgrid")
        .join("beatgrid.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path).or_else(|_| File::create("/tmp/beatgrid.log")) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("beatgrid: cannot create log file: {}", e);
            return;
        }
    };

    if let Err(e) = WriteLogger::init(log_level, Config::default(), log_file) {
        eprintln!("beatgrid: failed to initialize logger: {}", e);
        return;
    }

    log::info!("beatgrid starting (log level: {:?})", log_level);
}

/// Command-line options.
#[derive(Debug, Default)]
struct Options {
    file: Option<PathBuf>,
    preset: Option<u8>,
    bpm: Option<i32>,
    tempo: Option<TempoPreset>,
    measures: Option<Measures>,
    random: bool,
    loops: usize,
    save_preset: Option<u8>,
    export: Option<PathBuf>,
    samples: Vec<(VoiceId, PathBuf)>,
    list_devices: bool,
    storage_info: bool,
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn parse_options(args: &[String]) -> Result<Options, String> {
    let parse_slot = |flag: &str| -> Result<Option<u8>, String> {
        flag_value(args, flag)
            .map(|s| s.parse::<u8>().map_err(|_| format!("{} expects a slot number, got '{}'", flag, s)))
            .transpose()
    };

    let measures = flag_value(args, "--measures")
        .map(|s| {
            s.parse::<u8>()
                .ok()
                .and_then(Measures::from_count)
                .ok_or_else(|| format!("--measures must be 1, 2, 4 or 8, got '{}'", s))
        })
        .transpose()?;

    let tempo = flag_value(args, "--tempo")
        .map(|s| TempoPreset::from_name(s).ok_or_else(|| format!("unknown tempo preset '{}'", s)))
        .transpose()?;

    let bpm = flag_value(args, "--bpm")
        .map(|s| s.parse::<i32>().map_err(|_| format!("--bpm expects a number, got '{}'", s)))
        .transpose()?;

    let loops = flag_value(args, "--loops")
        .map(|s| s.parse::<usize>().map_err(|_| format!("--loops expects a count, got '{}'", s)))
        .transpose()?
        .unwrap_or(1);

    // --sample kick=/path/to/kick.wav, repeatable
    let mut samples = Vec::new();
    for (i, arg) in args.iter().enumerate() {
        if arg != "--sample" {
            continue;
        }
        let value = args.get(i + 1).ok_or("--sample expects voice=path")?;
        let (voice, path) = value
            .split_once('=')
            .ok_or_else(|| format!("--sample expects voice=path, got '{}'", value))?;
        let voice = voice.parse::<VoiceId>().map_err(|e| e.to_string())?;
        samples.push((voice, PathBuf::from(path)));
    }

    Ok(Options {
        file: flag_value(args, "--file").map(PathBuf::from),
        preset: parse_slot("--preset")?,
        bpm,
        tempo,
        measures,
        random: args.iter().any(|a| a == "--random"),
        loops,
        save_preset: parse_slot("--save-preset")?,
        export: flag_value(args, "--export").map(PathBuf::from),
        samples,
        list_devices: args.iter().any(|a| a == "--list-devices"),
        storage_info: args.iter().any(|a| a == "--storage-info"),
    })
}

fn open_backend(config: &Config) -> Box<dyn AudioBackend> {
    match CpalBackend::open(config.output_device(), config.sample_rate()) {
        Ok(backend) => Box::new(backend),
        Err(e) => {
            log::warn!(target: "audio", "no audio output, continuing silently: {}", e);
            eprintln!("beatgrid: no audio output ({}); playing silently", e);
            Box::new(NullBackend::new(config.sample_rate().unwrap_or(FALLBACK_SAMPLE_RATE)))
        }
    }
}

/// The startup engine: config defaults, then any pattern file or preset.
fn build_engine(config: &Config, storage: &PatternStorage, opts: &Options) -> PatternEngine {
    let mut engine = if config.load_default_pattern() {
        let mut engine = PatternEngine::with_default_pattern();
        engine.change_pattern_length(config.measures());
        engine.set_bpm(i32::from(config.bpm()));
        engine
    } else {
        PatternEngine::new(config.measures(), config.bpm())
    };

    if let Some(path) = &opts.file {
        match storage.import_from_file(path) {
            Ok(record) => {
                println!("Loaded '{}' from {}", record.name, path.display());
                engine.import_pattern(record.snapshot);
            }
            Err(e) => eprintln!("beatgrid: could not load {}: {}", path.display(), e),
        }
    }

    if let Some(slot) = opts.preset {
        match storage.load_preset(slot) {
            Ok(record) => {
                println!("Loaded preset {}", slot);
                engine.import_pattern(record.snapshot);
            }
            Err(e) => eprintln!("beatgrid: {}", e),
        }
    }

    if let Some(measures) = opts.measures {
        engine.change_pattern_length(measures);
    }
    if let Some(preset) = opts.tempo {
        engine.apply_preset(preset);
    }
    if let Some(bpm) = opts.bpm {
        engine.set_bpm(bpm);
    }
    engine
}

fn print_step(step: usize, voices: &[VoiceId]) {
    let names: Vec<&str> = voices.iter().map(|v| v.key()).collect();
    println!("{:3} | {}", step + 1, names.join(" "));
}

/// Steps to play for `loops` passes, saturating on absurd loop counts.
fn total_steps(steps: usize, loops: usize) -> usize {
    steps.saturating_mul(loops)
}

/// Play `loops` passes over the pattern, echoing each step.
fn play_loops(sequencer: &mut SequencerHandle, steps: usize, bpm: u16, loops: usize) -> Result<(), String> {
    let total = total_steps(steps, loops);
    if total == 0 {
        return Ok(());
    }
    let patience = step_duration(bpm) * 4 + Duration::from_secs(1);

    sequencer.play();
    let mut played = 0;
    while played < total {
        match sequencer.recv_feedback(patience) {
            Some(SequencerFeedback::StepPlayed { step, voices }) => {
                print_step(step, &voices);
                played += 1;
            }
            Some(_) => {}
            None => {
                sequencer.stop();
                return Err("sequencer stalled".to_string());
            }
        }
    }
    sequencer.stop();
    Ok(())
}

fn print_storage_info(storage: &PatternStorage) -> Result<(), String> {
    let info = storage.storage_info().map_err(|e| e.to_string())?;
    println!("Storage: {}", storage.dir().display());
    println!("  patterns: {}/{}", info.pattern_count, info.max_patterns);
    println!("  presets:  {}/{}", info.preset_count, info.max_presets);
    println!("  size:     {} bytes", info.total_size);
    for record in storage.saved_patterns().map_err(|e| e.to_string())? {
        println!("  - {} ({} bpm)", record.name, record.snapshot.bpm);
    }
    Ok(())
}

fn run(opts: Options) -> Result<(), String> {
    if opts.list_devices {
        for name in CpalBackend::available_devices() {
            println!("{}", name);
        }
        return Ok(());
    }

    let config = Config::load();
    let storage = PatternStorage::new(config.storage_dir());
    if opts.storage_info {
        return print_storage_info(&storage);
    }
    let engine = build_engine(&config, &storage, &opts);

    let mut synth = SynthEngine::new(open_backend(&config));
    synth.set_master_gain(config.master_gain());
    for (voice, path) in &opts.samples {
        if let Err(e) = synth.load_sample(*voice, path) {
            eprintln!("beatgrid: {}", e);
        }
    }
    if !synth.is_ready() {
        log::warn!(target: "audio", "synthesis engine not ready; triggers will be dropped");
    }

    let mut sequencer = SequencerHandle::spawn(engine, Box::new(synth));
    if opts.random {
        sequencer.generate_random_pattern();
    }

    let snapshot = sequencer.export_pattern()?;
    if let Some(slot) = opts.save_preset {
        storage
            .save_preset(slot, snapshot.clone())
            .map_err(|e| format!("could not save preset {}: {}", slot, e))?;
        println!("Saved preset {}", slot);
    }
    if let Some(path) = &opts.export {
        storage
            .export_to_file(path, snapshot.clone())
            .map_err(|e| format!("could not export to {}: {}", path.display(), e))?;
        println!("Exported to {}", path.display());
    }

    let steps = snapshot.pattern_length.unwrap_or_else(|| snapshot.pattern.length());
    println!(
        "{} bpm ({}, {:.0} ms/beat), {} steps, {} loop(s)",
        snapshot.bpm,
        tempo_genre(snapshot.bpm),
        beat_duration_ms(snapshot.bpm),
        steps,
        opts.loops
    );
    play_loops(&mut sequencer, steps, snapshot.bpm, opts.loops)
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    let result = parse_options(&args).and_then(run);
    if let Err(e) = result {
        log::error!("{}", e);
        eprintln!("beatgrid: {}", e);
        std::process::exit(1);
    }
}
