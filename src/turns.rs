//! Turn consolidation.
//!
//! Two passes over the labeled segment list. The merge pass collapses
//! consecutive same-speaker segments separated by a small gap into single
//! turns before translation. The grouping pass runs after translations are
//! attached, with a stricter gap, and produces the final display-ready
//! rows.

use crate::segment::{Segment, Turn};

/// Merge consecutive same-speaker segments separated by less than
/// `max_gap` seconds.
///
/// Text is concatenated with one space, trimming whitespace at the join.
/// Translations are concatenated the same way, but only when both sides
/// carry one. The merged turn keeps the first constituent's id.
pub fn merge_adjacent(segments: Vec<Segment>, max_gap: f64) -> Vec<Segment> {
    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());

    for segment in segments {
        if let Some(last) = merged.last_mut() {
            if last.speaker == segment.speaker && segment.start - last.end < max_gap {
                last.end = segment.end;
                let text = join_trimmed(&last.text, &segment.text);
                last.text = text;
                if let (Some(a), Some(b)) =
                    (last.translation.as_deref(), segment.translation.as_deref())
                {
                    let translation = join_trimmed(a, b);
                    last.translation = Some(translation);
                }
                continue;
            }
        }
        merged.push(segment);
    }

    merged
}

/// Second, stricter grouping pass, run after translations are attached.
///
/// Same accumulate/flush logic as [`merge_adjacent`] with no duration
/// constraint; missing translations default to the empty string. Produces
/// a new list of turns and leaves the input untouched.
pub fn group_turns(segments: &[Segment], max_gap: f64) -> Vec<Turn> {
    let mut grouped: Vec<Turn> = Vec::with_capacity(segments.len());

    for segment in segments {
        let speaker = segment.speaker.clone().unwrap_or_default();

        if let Some(last) = grouped.last_mut() {
            if last.speaker == speaker && segment.start - last.end < max_gap {
                last.end = segment.end;
                last.text.push(' ');
                last.text.push_str(&segment.text);
                last.translation.push(' ');
                last.translation
                    .push_str(segment.translation.as_deref().unwrap_or(""));
                continue;
            }
        }

        grouped.push(Turn {
            speaker,
            start: segment.start,
            end: segment.end,
            text: segment.text.clone(),
            translation: segment.translation.clone().unwrap_or_default(),
        });
    }

    grouped
}

fn join_trimmed(left: &str, right: &str) -> String {
    format!("{} {}", left.trim_end(), right.trim_start())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled(start: f64, end: f64, text: &str, speaker: &str) -> Segment {
        let mut seg = Segment::new(start, end, text);
        seg.speaker = Some(speaker.to_string());
        seg
    }

    #[test]
    fn test_merge_respects_gap_threshold() {
        // Gap 4.0 -> 5.0 is 1.0 s, over the 0.5 s threshold
        let segments = vec![
            labeled(0.0, 2.0, "a", "SPEAKER_1"),
            labeled(2.0, 4.0, "a", "SPEAKER_1"),
            labeled(5.0, 6.0, "b", "SPEAKER_2"),
        ];
        let merged = merge_adjacent(segments, 0.5);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].start, 0.0);
        assert_eq!(merged[0].end, 4.0);
        assert_eq!(merged[0].speaker.as_deref(), Some("SPEAKER_1"));
        assert_eq!(merged[0].text, "a a");
        assert_eq!(merged[1].start, 5.0);
        assert_eq!(merged[1].end, 6.0);
        assert_eq!(merged[1].speaker.as_deref(), Some("SPEAKER_2"));
    }

    #[test]
    fn test_merge_same_speaker_small_gap() {
        let segments = vec![
            labeled(0.0, 2.0, "first", "SPEAKER_1"),
            labeled(2.4, 4.0, "second", "SPEAKER_1"),
        ];
        let merged = merge_adjacent(segments, 0.5);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "first second");
    }

    #[test]
    fn test_merge_different_speakers_never_merge() {
        let segments = vec![
            labeled(0.0, 2.0, "a", "SPEAKER_1"),
            labeled(2.0, 4.0, "b", "SPEAKER_2"),
        ];
        let merged = merge_adjacent(segments, 0.5);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_trims_whitespace_at_join() {
        let segments = vec![
            labeled(0.0, 2.0, "hello ", "SPEAKER_1"),
            labeled(2.0, 4.0, " world", "SPEAKER_1"),
        ];
        let merged = merge_adjacent(segments, 0.5);
        assert_eq!(merged[0].text, "hello world");
    }

    #[test]
    fn test_merge_concatenates_translations_when_both_present() {
        let mut first = labeled(0.0, 2.0, "a", "SPEAKER_1");
        first.translation = Some("one ".to_string());
        let mut second = labeled(2.0, 4.0, "b", "SPEAKER_1");
        second.translation = Some("two".to_string());

        let merged = merge_adjacent(vec![first, second], 0.5);
        assert_eq!(merged[0].translation.as_deref(), Some("one two"));
    }

    #[test]
    fn test_merge_one_sided_translation_is_left_alone() {
        let first = labeled(0.0, 2.0, "a", "SPEAKER_1");
        let mut second = labeled(2.0, 4.0, "b", "SPEAKER_1");
        second.translation = Some("two".to_string());

        let merged = merge_adjacent(vec![first, second], 0.5);
        assert_eq!(merged.len(), 1);
        assert!(merged[0].translation.is_none());
    }

    #[test]
    fn test_merge_keeps_first_constituent_id() {
        let first = labeled(0.0, 2.0, "a", "SPEAKER_1");
        let first_id = first.id;
        let second = labeled(2.0, 4.0, "b", "SPEAKER_1");

        let merged = merge_adjacent(vec![first, second], 0.5);
        assert_eq!(merged[0].id, first_id);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let segments = vec![
            labeled(0.0, 2.0, "a", "SPEAKER_1"),
            labeled(2.1, 4.0, "b", "SPEAKER_1"),
            labeled(4.8, 6.0, "c", "SPEAKER_1"),
            labeled(6.1, 7.0, "d", "SPEAKER_2"),
            labeled(8.0, 9.0, "e", "SPEAKER_2"),
        ];
        let merged = merge_adjacent(segments, 0.5);
        let texts: Vec<String> = merged.iter().map(|s| s.text.clone()).collect();
        let bounds: Vec<(f64, f64)> = merged.iter().map(|s| (s.start, s.end)).collect();

        let again = merge_adjacent(merged, 0.5);
        let texts_again: Vec<String> = again.iter().map(|s| s.text.clone()).collect();
        let bounds_again: Vec<(f64, f64)> = again.iter().map(|s| (s.start, s.end)).collect();

        assert_eq!(texts, texts_again);
        assert_eq!(bounds, bounds_again);
    }

    #[test]
    fn test_merge_empty_input() {
        assert!(merge_adjacent(Vec::new(), 0.5).is_empty());
    }

    #[test]
    fn test_group_uses_stricter_gap() {
        // A 0.4 s gap merges under the 0.5 s pass but not under 0.3 s
        let segments = vec![
            labeled(0.0, 2.0, "a", "SPEAKER_1"),
            labeled(2.4, 4.0, "b", "SPEAKER_1"),
        ];

        let merged = merge_adjacent(segments.clone(), 0.5);
        assert_eq!(merged.len(), 1);

        let grouped = group_turns(&segments, 0.3);
        assert_eq!(grouped.len(), 2);
    }

    #[test]
    fn test_group_defaults_missing_translation_to_empty() {
        let mut first = labeled(0.0, 2.0, "a", "SPEAKER_1");
        first.translation = Some("one".to_string());
        let second = labeled(2.1, 4.0, "b", "SPEAKER_1");

        let grouped = group_turns(&[first, second], 0.3);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].text, "a b");
        assert_eq!(grouped[0].translation, "one ");
    }

    #[test]
    fn test_group_never_produces_more_turns_than_merge() {
        let segments = vec![
            labeled(0.0, 2.0, "a", "SPEAKER_1"),
            labeled(2.1, 4.0, "b", "SPEAKER_1"),
            labeled(4.2, 5.0, "c", "SPEAKER_2"),
            labeled(5.1, 6.0, "d", "SPEAKER_2"),
        ];
        let merged = merge_adjacent(segments, 0.5);
        let grouped = group_turns(&merged, 0.3);
        assert!(grouped.len() <= merged.len());
    }

    #[test]
    fn test_group_leaves_input_untouched() {
        let segments = vec![
            labeled(0.0, 2.0, "a", "SPEAKER_1"),
            labeled(2.1, 4.0, "b", "SPEAKER_1"),
        ];
        let before: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
        let _ = group_turns(&segments, 0.3);
        let after: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
        assert_eq!(before, after);
    }
}
