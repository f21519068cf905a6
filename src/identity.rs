//! Chronological speaker identity assignment.
//!
//! Cluster labels are arbitrary integers; this stage maps them to stable
//! `SPEAKER_n` tokens ordered by first appearance (the first voice heard is
//! always `SPEAKER_1`), then back-fills segments that never produced an
//! embedding using an ordered decision table: previous-speaker continuity
//! first, nearest assigned midpoint second, `SPEAKER_1` when nothing is
//! assigned at all.

use std::collections::HashMap;

use tracing::debug;

use crate::segment::Segment;

/// Fallback identity when diarization cannot distinguish speakers
pub const FALLBACK_SPEAKER: &str = "SPEAKER_1";

/// Maximum midpoint-to-midpoint distance, in seconds, for the
/// previous-speaker continuity rule during back-fill
pub const CONTINUITY_WINDOW: f64 = 2.0;

/// Identity token for a 1-based chronological rank
pub fn speaker_label(rank: usize) -> String {
    format!("SPEAKER_{rank}")
}

/// Speaking statistics for one raw cluster label
#[derive(Debug, Clone, PartialEq)]
struct LabelStats {
    total_duration: f64,
    segment_count: usize,
    first_appearance: f64,
}

/// How a segment without an embedding obtained its identity.
///
/// The variants are checked in declaration order; the continuity rule wins
/// even when a strictly nearer assigned segment exists.
#[derive(Debug, Clone, PartialEq)]
pub enum BackfillDecision {
    /// Some assigned segment lies within [`CONTINUITY_WINDOW`] and the
    /// preceding segment already carries a speaker: keep that speaker
    PreviousSpeaker(String),
    /// Identity of the assigned segment with the nearest midpoint
    NearestNeighbor(String),
    /// Nothing is assigned at all
    Fallback,
}

impl BackfillDecision {
    /// The identity this decision resolves to
    pub fn speaker(&self) -> &str {
        match self {
            BackfillDecision::PreviousSpeaker(speaker) => speaker,
            BackfillDecision::NearestNeighbor(speaker) => speaker,
            BackfillDecision::Fallback => FALLBACK_SPEAKER,
        }
    }
}

/// Map raw cluster labels to chronological identities and propagate a
/// speaker to every segment.
///
/// `embedded_indices[i]` is the segment index that produced
/// `cluster_labels[i]`. Segments outside that set are back-filled in list
/// order, so an earlier back-fill is visible to the continuity rule of a
/// later one.
pub fn assign_identities(
    mut segments: Vec<Segment>,
    embedded_indices: &[usize],
    cluster_labels: &[usize],
) -> Vec<Segment> {
    debug_assert_eq!(embedded_indices.len(), cluster_labels.len());

    // Per-label stats; the earliest start decides the chronological rank
    let mut stats: HashMap<usize, LabelStats> = HashMap::new();
    for (&idx, &label) in embedded_indices.iter().zip(cluster_labels) {
        let segment = &segments[idx];
        let entry = stats.entry(label).or_insert(LabelStats {
            total_duration: 0.0,
            segment_count: 0,
            first_appearance: f64::INFINITY,
        });
        entry.total_duration += segment.duration();
        entry.segment_count += 1;
        entry.first_appearance = entry.first_appearance.min(segment.start);
    }

    let mut order: Vec<(&usize, &LabelStats)> = stats.iter().collect();
    order.sort_by(|a, b| {
        a.1.first_appearance
            .partial_cmp(&b.1.first_appearance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut mapping: HashMap<usize, String> = HashMap::new();
    for (rank, (&label, label_stats)) in order.into_iter().enumerate() {
        let identity = speaker_label(rank + 1);
        debug!(
            "Cluster {} -> {} ({} segments, {:.1}s, first heard at {:.1}s)",
            label,
            identity,
            label_stats.segment_count,
            label_stats.total_duration,
            label_stats.first_appearance
        );
        mapping.insert(label, identity);
    }

    for (&idx, label) in embedded_indices.iter().zip(cluster_labels) {
        segments[idx].speaker = Some(mapping[label].clone());
    }

    // Snapshot of the embedded segments for the back-fill scan; the
    // nearest-neighbor rule only ever considers these
    let assigned: Vec<(f64, String)> = embedded_indices
        .iter()
        .map(|&idx| {
            let speaker = segments[idx]
                .speaker
                .clone()
                .unwrap_or_else(|| FALLBACK_SPEAKER.to_string());
            (segments[idx].midpoint(), speaker)
        })
        .collect();

    for idx in 0..segments.len() {
        if segments[idx].speaker.is_some() {
            continue;
        }
        let decision = backfill_decision(idx, &segments, &assigned);
        segments[idx].speaker = Some(decision.speaker().to_string());
    }

    segments
}

/// Ordered decision table for a segment without an embedding.
///
/// `assigned` holds `(midpoint, speaker)` for every segment that received
/// an identity from its embedding.
pub fn backfill_decision(
    idx: usize,
    segments: &[Segment],
    assigned: &[(f64, String)],
) -> BackfillDecision {
    if assigned.is_empty() {
        return BackfillDecision::Fallback;
    }

    let midpoint = segments[idx].midpoint();

    // Continuity first: any assigned midpoint within the window keeps the
    // previous segment's speaker, even when a strictly closer assigned
    // segment exists
    if idx > 0 {
        if let Some(previous) = segments[idx - 1].speaker.as_ref() {
            let has_close_neighbor = assigned
                .iter()
                .any(|(m, _)| (midpoint - m).abs() < CONTINUITY_WINDOW);
            if has_close_neighbor {
                return BackfillDecision::PreviousSpeaker(previous.clone());
            }
        }
    }

    let mut nearest = &assigned[0];
    let mut min_dist = f64::INFINITY;
    for candidate in assigned {
        let dist = (midpoint - candidate.0).abs();
        if dist < min_dist {
            min_dist = dist;
            nearest = candidate;
        }
    }
    BackfillDecision::NearestNeighbor(nearest.1.clone())
}
