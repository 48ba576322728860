//! Export/import shapes that cross the persistence boundary.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::pattern::{Measures, PatternGrid};

pub const RECORD_VERSION: &str = "2.0";
pub const RECORD_APP: &str = "Beat Drum";

/// What the pattern engine exports and imports.
///
/// `measures` and `pattern_length` are optional on input: a snapshot
/// without them is applied at the engine's current length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternSnapshot {
    pub pattern: PatternGrid,
    pub bpm: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measures: Option<Measures>,
}

/// A stored pattern: `{ name, pattern, bpm, patternLength, measures, timestamp, version }`.
///
/// Fields this version does not know about are kept in `extra` and written
/// back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPatternRecord {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub snapshot: PatternSnapshot,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SavedPatternRecord {
    pub fn new(name: impl Into<String>, snapshot: PatternSnapshot, timestamp: u64) -> Self {
        Self {
            name: name.into(),
            snapshot,
            timestamp,
            version: RECORD_VERSION.to_string(),
            app: None,
            extra: Map::new(),
        }
    }
}
