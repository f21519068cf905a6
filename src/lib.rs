//! Speaker diarization and turn consolidation for transcribed conversations.
//!
//! Given a recording's decoded audio (16 kHz mono) and the timestamped
//! segments produced by a speech-to-text engine, this crate resolves who
//! spoke when:
//!
//! 1. Extract one speaker embedding per segment -- short segments directly,
//!    long segments via sliding-window averaging ([`embedding`])
//! 2. Cluster the embeddings and pick the speaker count, preferring fewer
//!    speakers unless more score materially better ([`clustering`])
//! 3. Map cluster labels to chronological `SPEAKER_n` identities and
//!    back-fill segments that never produced an embedding ([`identity`])
//! 4. Smooth out short, locally implausible speaker flips ([`smoothing`])
//! 5. Merge consecutive same-speaker segments into turns ([`turns`])
//!
//! [`Diarizer`] runs stages 1-5 in one call. A second, stricter merge pass
//! ([`group_turns`]) runs after the caller has attached translations,
//! producing the final display-ready turn list.
//!
//! The pipeline is synchronous and single-threaded; it performs no I/O of
//! its own. Audio acquisition, transcription, translation, and persistence
//! are the caller's responsibility.

pub mod clustering;
pub mod config;
pub mod embedding;
pub mod identity;
pub mod pipeline;
pub mod segment;
pub mod smoothing;
pub mod turns;


pub use config::{
    ClusteringConfig, DiarizerConfig, EmbeddingConfig, MergeConfig, SmoothingConfig,
};
pub use embedding::onnx::OnnxSpeakerEncoder;
pub use embedding::{SegmentEmbeddings, SpeakerEncoder, EMBEDDING_DIM};
pub use identity::{speaker_label, FALLBACK_SPEAKER};
pub use pipeline::{DiarizationOutcome, DiarizationSummary, Diarizer, SpeakerSummary};
pub use segment::{Segment, Turn, Word};
pub use turns::{group_turns, merge_adjacent};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during diarization
#[derive(Debug, Error)]
pub enum DiarizationError {
    #[error("Failed to load ONNX model: {0}")]
    ModelLoad(String),

    #[error("ONNX inference failed: {0}")]
    Inference(String),

    #[error("Invalid audio input: {0}")]
    InvalidAudio(String),

    #[error("Mel spectrogram computation failed: {0}")]
    Mel(String),

    #[error("Model not found at path: {0}")]
    ModelNotFound(PathBuf),

    #[error("Invalid segment list: {0}")]
    InvalidSegments(String),

    #[error("Feature not enabled: ONNX embeddings require the 'onnx' feature")]
    FeatureNotEnabled,
}

#[cfg(feature = "onnx")]
impl From<ort::Error> for DiarizationError {
    fn from(e: ort::Error) -> Self {
        DiarizationError::Inference(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DiarizationError>;

/// L2-normalize a vector in place
pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-10 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine distance between two vectors (1 - cosine similarity).
///
/// Zero-norm inputs are treated as maximally distant; the result is clamped
/// to be non-negative.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same length");
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    (1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())).max(0.0)
}
