//! Transcript segment and turn data model.
//!
//! Segments arrive from the speech-to-text collaborator ordered by start
//! time. The diarization stages annotate them with a speaker and then
//! consolidate runs of same-speaker segments; the field names match the
//! JSON the transcription engine emits.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Word-level timing attached by the transcription engine.
///
/// Carried through for downstream consumers; the diarization core never
/// reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    pub start: f64,
    pub end: f64,
    pub word: String,
    pub probability: f32,
}

/// A transcribed segment of speech
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Start time in seconds from the beginning of the recording
    pub start: f64,
    /// End time in seconds, always greater than `start`
    pub end: f64,
    /// Source-language transcript text
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub words: Vec<Word>,
    /// Speaker identity (`SPEAKER_1`, ...), assigned by diarization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    /// Target-language translation, attached by the translation step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
}

impl Segment {
    /// Create a new segment with no speaker or translation
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            start,
            end,
            text: text.into(),
            words: Vec::new(),
            speaker: None,
            translation: None,
        }
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Midpoint in seconds, used for nearest-neighbor speaker lookup
    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }
}

/// A consolidated run of same-speaker segments, produced by the final
/// grouping pass ([`crate::turns::group_turns`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: String,
    /// Start of the first constituent segment
    pub start: f64,
    /// End of the last constituent segment
    pub end: f64,
    pub text: String,
    #[serde(default)]
    pub translation: String,
}

impl Turn {
    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}
