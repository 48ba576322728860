//! Command and feedback types for the sequencer thread.

use std::sync::mpsc::Sender;

use beatgrid_types::{Measures, PatternSnapshot, PlayState, TempoPreset, TransportState, VoiceId};

/// Commands sent from the control side to the sequencer thread.
///
/// Edits carry their own data; queries carry a reply channel.
#[derive(Debug)]
pub enum SequencerCmd {
    // ── Transport ─────────────────────────────────────────────────
    Play,
    Pause,
    Stop,
    SetBpm { bpm: i32 },
    AdjustBpm { delta: i32 },
    ApplyPreset { preset: TempoPreset },

    // ── Grid edits ────────────────────────────────────────────────
    ToggleStep { voice: VoiceId, index: usize },
    ClearPattern,
    RandomizePattern,
    ChangePatternLength { measures: Measures },
    ImportPattern { snapshot: PatternSnapshot },

    // ── Audition ──────────────────────────────────────────────────
    PlayVoice { voice: VoiceId },

    // ── Queries ───────────────────────────────────────────────────
    ExportPattern { reply: Sender<PatternSnapshot> },
    QueryTransport { reply: Sender<TransportState> },

    Shutdown,
}

/// Updates sent back from the sequencer thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequencerFeedback {
    /// A tick played `step`, triggering `voices`.
    StepPlayed { step: usize, voices: Vec<VoiceId> },
    TransportChanged(PlayState),
    BpmChanged(u16),
    PatternLengthChanged(Measures),
}
