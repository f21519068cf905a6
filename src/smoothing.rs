//! Temporal smoothing of speaker labels.
//!
//! A short segment whose neighbors on both sides unanimously carry a
//! different speaker is almost always a misclassification; it takes the
//! neighborhood's identity. One forward pass only -- a relabeled segment is
//! visible to the windows that follow it, but the pass is never repeated.

use tracing::debug;

use crate::config::SmoothingConfig;
use crate::segment::Segment;

/// Remove short, locally inconsistent speaker flips.
///
/// For every segment with at least `window_size` neighbors on both sides:
/// if all `2 * window_size` neighbors share one identity different from the
/// segment's own, and the segment is shorter than `max_duration`, it is
/// relabeled. Segments within `window_size` of either boundary are left
/// untouched.
pub fn smooth_speaker_flips(mut segments: Vec<Segment>, config: &SmoothingConfig) -> Vec<Segment> {
    let w = config.window_size;
    if segments.len() < 2 * w + 1 {
        return segments;
    }

    for i in w..(segments.len() - w) {
        if segments[i].duration() >= config.max_duration {
            continue;
        }

        let consensus = match neighborhood_consensus(&segments, i, w) {
            Some(speaker) => speaker,
            None => continue,
        };
        if segments[i].speaker.as_deref() == Some(consensus.as_str()) {
            continue;
        }

        debug!(
            "Relabeling short segment {:.2}s-{:.2}s from {:?} to {}",
            segments[i].start, segments[i].end, segments[i].speaker, consensus
        );
        segments[i].speaker = Some(consensus);
    }

    segments
}

/// The single identity shared by every neighbor of `i` within radius `w`,
/// if there is one
fn neighborhood_consensus(segments: &[Segment], i: usize, w: usize) -> Option<String> {
    let mut neighbors = (i - w..=i + w)
        .filter(|&j| j != i)
        .map(|j| segments[j].speaker.as_deref());

    let first = neighbors.next().flatten()?;
    if neighbors.all(|speaker| speaker == Some(first)) {
        Some(first.to_string())
    } else {
        None
    }
}
