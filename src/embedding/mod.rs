//! Segment embedding extraction.
//!
//! Turns each sufficiently long transcript segment into one fixed-length
//! speaker embedding: short segments from their raw audio slice, long
//! segments via a sliding window whose sub-embeddings are averaged. A
//! failure to embed one segment never aborts the run; the segment is
//! logged and excluded, and the identity stage back-fills it later.

#[cfg(feature = "onnx")]
pub mod mel;
pub mod onnx;

use tracing::{debug, warn};

use crate::config::EmbeddingConfig;
use crate::segment::Segment;
use crate::Result;

/// Speaker embedding dimension (WeSpeaker-style encoders emit 256 floats)
pub const EMBEDDING_DIM: usize = 256;

/// Backend that turns a span of audio samples into a speaker embedding.
///
/// The pipeline is generic over this seam so the clustering and identity
/// stages can be exercised without an ONNX runtime.
pub trait SpeakerEncoder {
    /// Compute one embedding for the given span of mono samples
    fn encode(&mut self, audio: &[f32]) -> Result<Vec<f32>>;

    /// Dimension of the vectors `encode` returns
    fn embedding_dim(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Embeddings for the subset of segments long enough to process
#[derive(Debug, Clone)]
pub struct SegmentEmbeddings {
    /// One embedding per entry of `segment_indices`
    pub embeddings: Vec<Vec<f32>>,
    /// Index into the input segment list for each embedding
    pub segment_indices: Vec<usize>,
}

impl SegmentEmbeddings {
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// Extract one embedding per qualifying segment.
///
/// Segments shorter than [`EmbeddingConfig::min_duration`] are skipped, as
/// are segments whose sample range falls outside the audio buffer. Segments
/// up to [`EmbeddingConfig::direct_max_duration`] are embedded from their
/// raw slice; longer ones through the sliding-window average.
pub fn extract_segment_embeddings(
    encoder: &mut dyn SpeakerEncoder,
    audio: &[f32],
    segments: &[Segment],
    config: &EmbeddingConfig,
) -> SegmentEmbeddings {
    let sr = config.sample_rate as f64;
    let mut embeddings = Vec::new();
    let mut segment_indices = Vec::new();

    for (idx, segment) in segments.iter().enumerate() {
        let duration = segment.duration();
        if duration < config.min_duration {
            continue;
        }

        let start = ((segment.start * sr) as usize).min(audio.len());
        let end = ((segment.end * sr) as usize).min(audio.len());
        if end <= start {
            debug!(
                "Segment {:.2}s-{:.2}s lies outside the audio buffer, skipping",
                segment.start, segment.end
            );
            continue;
        }
        let slice = &audio[start..end];

        let embedding = if duration <= config.direct_max_duration {
            match encoder.encode(slice) {
                Ok(embedding) => Some(embedding),
                Err(e) => {
                    warn!(
                        "Could not process segment {:.2}s-{:.2}s: {}",
                        segment.start, segment.end, e
                    );
                    None
                }
            }
        } else {
            windowed_embedding(encoder, slice, segment, config)
        };

        if let Some(embedding) = embedding {
            embeddings.push(embedding);
            segment_indices.push(idx);
        }
    }

    debug!(
        "Extracted {} embeddings from {} segments",
        embeddings.len(),
        segments.len()
    );

    SegmentEmbeddings {
        embeddings,
        segment_indices,
    }
}

/// Sliding-window embedding for long segments.
///
/// Overlapping windows are embedded independently and averaged
/// component-wise, which keeps the vector stable across long monologues. A
/// failure in any window excludes the whole segment; a slice too short to
/// fit a single full window is likewise excluded (it was clamped against
/// the end of the audio buffer).
fn windowed_embedding(
    encoder: &mut dyn SpeakerEncoder,
    slice: &[f32],
    segment: &Segment,
    config: &EmbeddingConfig,
) -> Option<Vec<f32>> {
    let window = config.window_samples();
    let hop = config.hop_samples();
    if slice.len() <= window {
        return None;
    }

    let mut windows = Vec::new();
    let limit = slice.len() - window;
    let mut offset = 0;
    while offset < limit {
        match encoder.encode(&slice[offset..offset + window]) {
            Ok(embedding) => windows.push(embedding),
            Err(e) => {
                warn!(
                    "Could not process segment {:.2}s-{:.2}s: {}",
                    segment.start, segment.end, e
                );
                return None;
            }
        }
        offset += hop;
    }

    if windows.is_empty() {
        return None;
    }
    Some(mean_embedding(&windows))
}

/// Component-wise arithmetic mean of a non-empty set of vectors
fn mean_embedding(vectors: &[Vec<f32>]) -> Vec<f32> {
    let dim = vectors[0].len();
    let mut mean = vec![0.0f32; dim];
    for vector in vectors {
        for (m, &v) in mean.iter_mut().zip(vector.iter()) {
            *m += v;
        }
    }
    let count = vectors.len() as f32;
    for m in mean.iter_mut() {
        *m /= count;
    }
    mean
}
