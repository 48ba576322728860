use std::fmt;

use beatgrid_types::VoiceId;

/// A grid edit that does not fit the current pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    IndexOutOfRange { voice: VoiceId, index: usize, len: usize },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::IndexOutOfRange { voice, index, len } => {
                write!(f, "step {} out of range for {} ({} steps)", index, voice, len)
            }
        }
    }
}

impl std::error::Error for GridError {}

/// Persistence failures. None of them touch engine state.
#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Json(serde_json::Error),
    /// Parsed, but missing or malformed `pattern` / `bpm`.
    InvalidRecord(String),
    InvalidSlot(u8),
    NotFound(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "storage I/O error: {}", e),
            StorageError::Json(e) => write!(f, "invalid JSON: {}", e),
            StorageError::InvalidRecord(msg) => write!(f, "invalid pattern file: {}", msg),
            StorageError::InvalidSlot(slot) => write!(f, "preset slot {} does not exist", slot),
            StorageError::NotFound(what) => write!(f, "{} not found", what),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            StorageError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Json(e)
    }
}
