//! Configuration for the diarization stages.
//!
//! Every heuristic threshold of the pipeline lives here as an explicit,
//! documented field so the behavior stays auditable and testable. The
//! defaults are tuned for small-group conversations (roughly 2-5
//! participants).

/// Configuration for segment embedding extraction
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Sample rate of the decoded audio in Hz
    pub sample_rate: u32,

    /// Segments shorter than this are skipped entirely (seconds).
    /// Very short utterances produce unreliable embeddings.
    pub min_duration: f64,

    /// Segments up to this long are embedded from their raw slice (seconds)
    pub direct_max_duration: f64,

    /// Sliding window length for longer segments (seconds)
    pub window_duration: f64,

    /// Sliding window hop (seconds). Must be smaller than the window so
    /// consecutive windows overlap.
    pub hop_duration: f64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            min_duration: 1.0,
            direct_max_duration: 5.0,
            window_duration: 3.0,
            hop_duration: 1.5,
        }
    }
}

impl EmbeddingConfig {
    /// Sliding window length in samples
    pub fn window_samples(&self) -> usize {
        (self.window_duration * self.sample_rate as f64) as usize
    }

    /// Sliding window hop in samples
    pub fn hop_samples(&self) -> usize {
        (self.hop_duration * self.sample_rate as f64) as usize
    }
}

/// Configuration for speaker-count selection
#[derive(Debug, Clone)]
pub struct ClusteringConfig {
    /// Largest candidate speaker count to evaluate
    pub max_speakers: usize,

    /// Margin a candidate with more than two speakers must clear over the
    /// running best silhouette before it is accepted. Prevents
    /// over-segmentation on noisy embeddings.
    pub score_margin: f32,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            max_speakers: 5,
            score_margin: 0.05,
        }
    }
}

/// Configuration for temporal smoothing of speaker labels
#[derive(Debug, Clone)]
pub struct SmoothingConfig {
    /// Neighborhood radius on each side of the inspected segment
    pub window_size: usize,

    /// Segments at least this long are never relabeled (seconds)
    pub max_duration: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window_size: 3,
            max_duration: 3.0,
        }
    }
}

/// Configuration for the two turn-consolidation passes
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Maximum gap between same-speaker segments merged into one turn
    /// by the first pass (seconds)
    pub merge_gap: f64,

    /// Stricter gap used by the post-translation grouping pass (seconds)
    pub group_gap: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            merge_gap: 0.5,
            group_gap: 0.3,
        }
    }
}

/// Top-level configuration aggregating every stage
#[derive(Debug, Clone, Default)]
pub struct DiarizerConfig {
    pub embedding: EmbeddingConfig,
    pub clustering: ClusteringConfig,
    pub smoothing: SmoothingConfig,
    pub merging: MergeConfig,
}
