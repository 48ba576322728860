use std::path::PathBuf;

use serde::Deserialize;

use beatgrid_types::{clamp_bpm, Measures};

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    defaults: DefaultsConfig,
    #[serde(default)]
    audio: AudioConfig,
    #[serde(default)]
    storage: StorageConfig,
}

#[derive(Deserialize, Default)]
struct DefaultsConfig {
    bpm: Option<i32>,
    measures: Option<u8>,
    load_default_pattern: Option<bool>,
}

#[derive(Deserialize, Default)]
struct AudioConfig {
    sample_rate: Option<u32>,
    output_device: Option<String>,
    master_gain: Option<f32>,
}

#[derive(Deserialize, Default)]
struct StorageConfig {
    dir: Option<PathBuf>,
}

pub struct Config {
    defaults: DefaultsConfig,
    audio: AudioConfig,
    storage: StorageConfig,
}

impl Config {
    /// Embedded defaults, overridden key by key by the user's config file.
    pub fn load() -> Self {
        let user = user_config_path().filter(|p| p.exists()).and_then(|path| {
            match std::fs::read_to_string(&path) {
                Ok(contents) => Some((path, contents)),
                Err(e) => {
                    log::warn!(target: "config", "could not read config {}: {}", path.display(), e);
                    None
                }
            }
        });

        match user {
            Some((path, contents)) => {
                log::debug!(target: "config", "loading {}", path.display());
                Self::with_user(Some(&contents))
            }
            None => Self::with_user(None),
        }
    }

    fn with_user(user: Option<&str>) -> Self {
        let mut base: ConfigFile = toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|e| {
            log::error!(target: "config", "embedded config.toml is invalid: {}", e);
            ConfigFile::default()
        });

        if let Some(contents) = user {
            match toml::from_str::<ConfigFile>(contents) {
                Ok(user) => {
                    merge_defaults(&mut base.defaults, user.defaults);
                    merge_audio(&mut base.audio, user.audio);
                    merge_storage(&mut base.storage, user.storage);
                }
                Err(e) => log::warn!(target: "config", "ignoring malformed config: {}", e),
            }
        }

        Config {
            defaults: base.defaults,
            audio: base.audio,
            storage: base.storage,
        }
    }

    /// Startup tempo, clamped to the supported range.
    pub fn bpm(&self) -> u16 {
        clamp_bpm(self.defaults.bpm.unwrap_or(i32::from(beatgrid_types::DEFAULT_BPM)))
    }

    /// Startup pattern length; unsupported counts fall back to one measure.
    pub fn measures(&self) -> Measures {
        self.defaults
            .measures
            .and_then(Measures::from_count)
            .unwrap_or_default()
    }

    pub fn load_default_pattern(&self) -> bool {
        self.defaults.load_default_pattern.unwrap_or(true)
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.audio.sample_rate.filter(|r| *r > 0)
    }

    pub fn output_device(&self) -> Option<&str> {
        self.audio.output_device.as_deref()
    }

    /// Master output level (clamped to 0.0..=1.0).
    pub fn master_gain(&self) -> f32 {
        self.audio.master_gain.unwrap_or(1.0).clamp(0.0, 1.0)
    }

    /// Where saved patterns and presets live.
    pub fn storage_dir(&self) -> PathBuf {
        self.storage
            .dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("beatgrid")))
            .unwrap_or_else(|| PathBuf::from("beatgrid-data"))
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("beatgrid").join("config.toml"))
}

fn merge_defaults(base: &mut DefaultsConfig, user: DefaultsConfig) {
    if user.bpm.is_some() {
        base.bpm = user.bpm;
    }
    if user.measures.is_some() {
        base.measures = user.measures;
    }
    if user.load_default_pattern.is_some() {
        base.load_default_pattern = user.load_default_pattern;
    }
}

fn merge_audio(base: &mut AudioConfig, user: AudioConfig) {
    if user.sample_rate.is_some() {
        base.sample_rate = user.sample_rate;
    }
    if user.output_device.is_some() {
        base.output_device = user.output_device;
    }
    if user.master_gain.is_some() {
        base.master_gain = user.master_gain;
    }
}

fn merge_storage(base: &mut StorageConfig, user: StorageConfig) {
    if user.dir.is_some() {
        base.dir = user.dir;
    }
}
