//! Diarization pipeline facade.
//!
//! [`Diarizer`] runs the full pass: embedding extraction, speaker-count
//! selection, chronological identity assignment, temporal smoothing, and
//! turn merging. Each stage takes ownership of the segment list and hands a
//! new one to the next; nothing is shared or mutated behind the caller's
//! back. The run produces a [`DiarizationSummary`] so callers get the
//! speaker distribution and timing without scraping logs.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clustering::select_speaker_count;
use crate::config::DiarizerConfig;
use crate::embedding::{extract_segment_embeddings, SpeakerEncoder};
use crate::identity::{assign_identities, FALLBACK_SPEAKER};
use crate::segment::Segment;
use crate::smoothing::smooth_speaker_flips;
use crate::turns::merge_adjacent;
use crate::{DiarizationError, Result};

/// Per-speaker share of the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerSummary {
    pub speaker: String,
    /// Number of merged turns attributed to this speaker
    pub segment_count: usize,
    /// Total speaking time in seconds
    pub speaking_time: f64,
}

/// Observability record for one diarization run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiarizationSummary {
    /// Distinct speakers in the output
    pub num_speakers: usize,
    /// Merged segments in the output
    pub num_segments: usize,
    /// Cosine silhouette of the winning partition. Absent when the
    /// insufficient-data fallback ran or only two embeddings existed.
    pub silhouette: Option<f32>,
    pub speakers: Vec<SpeakerSummary>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Result of a diarization run: the merged, speaker-labeled segment list
/// plus run metrics
#[derive(Debug, Clone)]
pub struct DiarizationOutcome {
    pub segments: Vec<Segment>,
    pub summary: DiarizationSummary,
}

/// Orchestrates the diarization stages over one recording
pub struct Diarizer<E> {
    encoder: E,
    config: DiarizerConfig,
}

impl<E: SpeakerEncoder> Diarizer<E> {
    /// Create a diarizer with the default configuration
    pub fn new(encoder: E) -> Self {
        Self::with_config(encoder, DiarizerConfig::default())
    }

    pub fn with_config(encoder: E, config: DiarizerConfig) -> Self {
        Self { encoder, config }
    }

    pub fn config(&self) -> &DiarizerConfig {
        &self.config
    }

    /// Run the full diarization pass over a recording.
    ///
    /// `audio` holds the decoded mono samples for the whole recording at
    /// the configured sample rate; `segments` the transcription output in
    /// non-decreasing start order. Returns the merged, speaker-labeled
    /// list. When fewer than two segments yield a usable embedding, every
    /// segment is labeled [`FALLBACK_SPEAKER`] and smoothing/merging are
    /// skipped.
    ///
    /// # Errors
    ///
    /// [`DiarizationError::InvalidSegments`] when a segment has
    /// `end <= start` or the list is out of order. Per-segment embedding
    /// failures are not errors; they are logged and the segment is
    /// back-filled.
    pub fn diarize(
        &mut self,
        audio: &[f32],
        segments: Vec<Segment>,
    ) -> Result<DiarizationOutcome> {
        let started_at = Utc::now();
        let clock = Instant::now();

        validate_segments(&segments)?;
        info!(
            "Diarizing {} segments over {:.1}s of audio",
            segments.len(),
            audio.len() as f64 / self.config.embedding.sample_rate as f64
        );

        let extracted =
            extract_segment_embeddings(&mut self.encoder, audio, &segments, &self.config.embedding);

        let (segments, silhouette) = if extracted.len() < 2 {
            warn!("Not enough valid segments for speaker diarization, assigning a single speaker");
            let mut segments = segments;
            for segment in &mut segments {
                segment.speaker = Some(FALLBACK_SPEAKER.to_string());
            }
            // Terminal short-circuit: no smoothing or merging on the
            // fallback path
            (segments, None)
        } else {
            let partition =
                select_speaker_count(&extracted.embeddings, &self.config.clustering);
            match partition.silhouette {
                Some(score) => info!(
                    "Identified {} speakers (silhouette score: {:.3})",
                    partition.num_speakers, score
                ),
                None => info!(
                    "Identified {} speakers (too few embeddings to score)",
                    partition.num_speakers
                ),
            }

            let labeled =
                assign_identities(segments, &extracted.segment_indices, &partition.labels);
            let smoothed = smooth_speaker_flips(labeled, &self.config.smoothing);
            let merged = merge_adjacent(smoothed, self.config.merging.merge_gap);
            (merged, partition.silhouette)
        };

        let summary = build_summary(&segments, silhouette, started_at, clock);
        info!("Final speaker distribution:");
        for speaker in &summary.speakers {
            info!(
                "  {}: {} segments, {:.1}s total speaking time",
                speaker.speaker, speaker.segment_count, speaker.speaking_time
            );
        }

        Ok(DiarizationOutcome { segments, summary })
    }
}

/// Check the invariants the pipeline relies on: positive-length segments in
/// non-decreasing start order
fn validate_segments(segments: &[Segment]) -> Result<()> {
    let mut previous_start = f64::NEG_INFINITY;
    for (idx, segment) in segments.iter().enumerate() {
        if !(segment.end > segment.start) {
            return Err(DiarizationError::InvalidSegments(format!(
                "segment {} has end {} <= start {}",
                idx, segment.end, segment.start
            )));
        }
        if segment.start < previous_start {
            return Err(DiarizationError::InvalidSegments(format!(
                "segment {} starts at {} before its predecessor at {}",
                idx, segment.start, previous_start
            )));
        }
        previous_start = segment.start;
    }
    Ok(())
}

fn build_summary(
    segments: &[Segment],
    silhouette: Option<f32>,
    started_at: DateTime<Utc>,
    clock: Instant,
) -> DiarizationSummary {
    let mut distribution: BTreeMap<String, (usize, f64)> = BTreeMap::new();
    for segment in segments {
        if let Some(speaker) = &segment.speaker {
            let entry = distribution.entry(speaker.clone()).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += segment.duration();
        }
    }

    let speakers: Vec<SpeakerSummary> = distribution
        .into_iter()
        .map(|(speaker, (segment_count, speaking_time))| SpeakerSummary {
            speaker,
            segment_count,
            speaking_time,
        })
        .collect();

    DiarizationSummary {
        num_speakers: speakers.len(),
        num_segments: segments.len(),
        silhouette,
        speakers,
        started_at,
        elapsed_ms: clock.elapsed().as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_ordered_segments() {
        let segments = vec![
            Segment::new(0.0, 1.0, "a"),
            Segment::new(1.0, 2.0, "b"),
            Segment::new(1.5, 3.0, "c"),
        ];
        assert!(validate_segments(&segments).is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_length_segment() {
        let segments = vec![Segment::new(1.0, 1.0, "empty")];
        let err = validate_segments(&segments).unwrap_err();
        assert!(matches!(err, DiarizationError::InvalidSegments(_)));
    }

    #[test]
    fn test_validate_rejects_unordered_segments() {
        let segments = vec![Segment::new(2.0, 3.0, "b"), Segment::new(0.0, 1.0, "a")];
        let err = validate_segments(&segments).unwrap_err();
        assert!(matches!(err, DiarizationError::InvalidSegments(_)));
    }

    #[test]
    fn test_validate_rejects_nan_bounds() {
        let segments = vec![Segment::new(0.0, f64::NAN, "nan")];
        assert!(validate_segments(&segments).is_err());
    }

    #[test]
    fn test_summary_distribution() {
        let mut a = Segment::new(0.0, 4.0, "a");
        a.speaker = Some("SPEAKER_1".to_string());
        let mut b = Segment::new(5.0, 6.0, "b");
        b.speaker = Some("SPEAKER_2".to_string());
        let mut c = Segment::new(7.0, 9.5, "c");
        c.speaker = Some("SPEAKER_1".to_string());

        let summary = build_summary(&[a, b, c], Some(0.8), Utc::now(), Instant::now());

        assert_eq!(summary.num_speakers, 2);
        assert_eq!(summary.num_segments, 3);
        assert_eq!(summary.speakers[0].speaker, "SPEAKER_1");
        assert_eq!(summary.speakers[0].segment_count, 2);
        assert!((summary.speakers[0].speaking_time - 6.5).abs() < 1e-9);
        assert_eq!(summary.speakers[1].speaker, "SPEAKER_2");
        assert_eq!(summary.speakers[1].segment_count, 1);
    }

    #[test]
    fn test_summary_empty_segments() {
        let summary = build_summary(&[], None, Utc::now(), Instant::now());
        assert_eq!(summary.num_speakers, 0);
        assert_eq!(summary.num_segments, 0);
        assert!(summary.silhouette.is_none());
    }
}
