//! Pattern persistence: named patterns, numbered preset slots and
//! standalone pattern files.
//!
//! Everything lives under one directory as JSON:
//! `patterns.json` holds the named list, `preset_<n>.json` one slot each.
//! Nothing here reaches into a running engine; callers import what they load.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::Value;

use beatgrid_types::{PatternSnapshot, SavedPatternRecord, RECORD_APP};

use crate::error::StorageError;

pub const MAX_PATTERNS: usize = 20;
pub const PRESET_SLOTS: u8 = 5;

const PATTERNS_FILE: &str = "patterns.json";

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub pattern_count: usize,
    pub preset_count: usize,
    /// Bytes used by the pattern list and all presets.
    pub total_size: u64,
    pub max_patterns: usize,
    pub max_presets: u8,
}

pub struct PatternStorage {
    dir: PathBuf,
}

impl PatternStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn patterns_path(&self) -> PathBuf {
        self.dir.join(PATTERNS_FILE)
    }

    fn preset_path(&self, slot: u8) -> Result<PathBuf, StorageError> {
        if !(1..=PRESET_SLOTS).contains(&slot) {
            return Err(StorageError::InvalidSlot(slot));
        }
        Ok(self.dir.join(format!("preset_{}.json", slot)))
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(value)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    // ── Named patterns ────────────────────────────────────────────

    /// All named patterns, oldest first.
    pub fn saved_patterns(&self) -> Result<Vec<SavedPatternRecord>, StorageError> {
        match std::fs::read_to_string(self.patterns_path()) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Save under `name`, replacing a pattern of the same name in place.
    /// Past `MAX_PATTERNS` the oldest entry is dropped.
    pub fn save_named(&self, name: &str, snapshot: PatternSnapshot) -> Result<SavedPatternRecord, StorageError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StorageError::InvalidRecord("pattern name is empty".to_string()));
        }
        let record = SavedPatternRecord::new(name, snapshot, now_millis());

        let mut patterns = self.saved_patterns()?;
        match patterns.iter_mut().find(|p| p.name == name) {
            Some(existing) => {
                log::info!(target: "storage", "overwriting pattern '{}'", name);
                *existing = record.clone();
            }
            None => patterns.push(record.clone()),
        }
        if patterns.len() > MAX_PATTERNS {
            let dropped = patterns.remove(0);
            log::info!(target: "storage", "dropping oldest pattern '{}'", dropped.name);
        }

        self.write_json(&self.patterns_path(), &patterns)?;
        Ok(record)
    }

    pub fn find_named(&self, name: &str) -> Result<SavedPatternRecord, StorageError> {
        self.saved_patterns()?
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| StorageError::NotFound(format!("pattern '{}'", name)))
    }

    /// Returns whether anything was removed.
    pub fn delete_named(&self, name: &str) -> Result<bool, StorageError> {
        let mut patterns = self.saved_patterns()?;
        let before = patterns.len();
        patterns.retain(|p| p.name != name);
        if patterns.len() == before {
            return Ok(false);
        }
        self.write_json(&self.patterns_path(), &patterns)?;
        Ok(true)
    }

    // ── Presets ───────────────────────────────────────────────────

    pub fn save_preset(&self, slot: u8, snapshot: PatternSnapshot) -> Result<SavedPatternRecord, StorageError> {
        let path = self.preset_path(slot)?;
        let record = SavedPatternRecord::new(format!("Preset {}", slot), snapshot, now_millis());
        self.write_json(&path, &record)?;
        log::info!(target: "storage", "saved preset {}", slot);
        Ok(record)
    }

    pub fn load_preset(&self, slot: u8) -> Result<SavedPatternRecord, StorageError> {
        let path = self.preset_path(slot)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => parse_record(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(format!("preset {}", slot)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Returns whether the slot held a preset.
    pub fn delete_preset(&self, slot: u8) -> Result<bool, StorageError> {
        let path = self.preset_path(slot)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn has_preset(&self, slot: u8) -> bool {
        self.preset_path(slot).map(|p| p.exists()).unwrap_or(false)
    }

    // ── Files ─────────────────────────────────────────────────────

    /// Write a standalone pattern file.
    pub fn export_to_file(&self, path: &Path, snapshot: PatternSnapshot) -> Result<SavedPatternRecord, StorageError> {
        let timestamp = now_millis();
        let mut record = SavedPatternRecord::new(format!("Beat Pattern {}", timestamp), snapshot, timestamp);
        record.app = Some(RECORD_APP.to_string());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&record)?)?;
        Ok(record)
    }

    /// Read a pattern file. Files without a usable `pattern` and `bpm` are
    /// rejected.
    pub fn import_from_file(&self, path: &Path) -> Result<SavedPatternRecord, StorageError> {
        let contents = std::fs::read_to_string(path)?;
        parse_record(&contents)
    }

    // ── Housekeeping ──────────────────────────────────────────────

    /// Remove the pattern list and every preset.
    pub fn clear_all(&self) -> Result<(), StorageError> {
        let mut paths = vec![self.patterns_path()];
        for slot in 1..=PRESET_SLOTS {
            paths.push(self.preset_path(slot)?);
        }
        for path in paths {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        log::info!(target: "storage", "cleared {}", self.dir.display());
        Ok(())
    }

    pub fn storage_info(&self) -> Result<StorageInfo, StorageError> {
        let file_size = |path: &Path| std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

        let mut total_size = file_size(&self.patterns_path());
        let mut preset_count = 0;
        for slot in 1..=PRESET_SLOTS {
            let path = self.preset_path(slot)?;
            if path.exists() {
                preset_count += 1;
                total_size += file_size(&path);
            }
        }

        Ok(StorageInfo {
            pattern_count: self.saved_patterns()?.len(),
            preset_count,
            total_size,
            max_patterns: MAX_PATTERNS,
            max_presets: PRESET_SLOTS,
        })
    }
}

/// Parse a stored record, checking `pattern` and `bpm` before decoding the
/// rest.
fn parse_record(contents: &str) -> Result<SavedPatternRecord, StorageError> {
    let value: Value = serde_json::from_str(contents)?;
    let obj = value
        .as_object()
        .ok_or_else(|| StorageError::InvalidRecord("not a JSON object".to_string()))?;

    if !obj.get("pattern").is_some_and(Value::is_object) {
        return Err(StorageError::InvalidRecord("missing pattern".to_string()));
    }
    match obj.get("bpm").and_then(Value::as_f64) {
        Some(bpm) if bpm > 0.0 => {}
        _ => return Err(StorageError::InvalidRecord("missing bpm".to_string())),
    }

    serde_json::from_value(value).map_err(|e| StorageError::InvalidRecord(e.to_string()))
}
