//! Merge consecutive same-speaker segments separated by a short gap (C8).

use tracing::{debug, info};

use crate::session::{MergedDiarization, MergedSegment, Segment};

/// Default inter-segment gap threshold, in milliseconds, below which
/// consecutive same-speaker segments are merged.
pub const DEFAULT_MAX_SILENCE_MS: u64 = 500;

/// Merge `segments` (sorted by start time) into [`MergedSegment`]s,
/// concatenating text/translation with a single separating space and
/// reassigning `merged_NNN` ids in order.
pub fn merge_segments(segments: &[Segment], max_silence_ms: u64) -> Vec<MergedSegment> {
    if segments.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<&Segment> = segments.iter().collect();
    sorted.sort_by(|a, b| a.start_time.partial_cmp(&b.start_time).unwrap());

    info!(
        count = sorted.len(),
        max_silence_ms, "merging segments"
    );

    let mut merged: Vec<MergedSegment> = Vec::new();
    let mut current = from_segment(sorted[0]);

    for segment in &sorted[1..] {
        let silence_ms = (segment.start_time - current.end_time) * 1000.0;
        let same_speaker = segment.speaker == current.speaker;

        if same_speaker && silence_ms <= max_silence_ms as f64 {
            debug!(
                segment_id = %segment.segment_id,
                silence_ms, "merging into current segment"
            );
            current.end_time = segment.end_time;
            current.text = concat(&current.text, &segment.text);
            if segment.translated_text.is_some() || current.translated_text.is_some() {
                let merged_translation = concat(
                    current.translated_text.as_deref().unwrap_or(""),
                    segment.translated_text.as_deref().unwrap_or(""),
                );
                current.translated_text = Some(merged_translation);
            }
            current.original_segments.push((*segment).clone());
        } else {
            merged.push(current);
            current = from_segment(segment);
        }
    }
    merged.push(current);

    for (i, segment) in merged.iter_mut().enumerate() {
        segment.segment_id = format!("merged_{i:03}");
    }

    info!(
        original = sorted.len(),
        merged = merged.len(),
        eliminated = sorted.len() - merged.len(),
        "merge complete"
    );

    merged
}

fn from_segment(segment: &Segment) -> MergedSegment {
    MergedSegment {
        segment_id: segment.segment_id.clone(),
        speaker: segment.speaker.clone(),
        start_time: segment.start_time,
        end_time: segment.end_time,
        text: segment.text.clone(),
        translated_text: segment.translated_text.clone(),
        original_segments: vec![segment.clone()],
    }
}

fn concat(a: &str, b: &str) -> String {
    format!("{a} {b}").trim().to_string()
}

/// Build the full [`MergedDiarization`] document from a source diarization,
/// including transcript/translated-transcript concatenation and counts.
pub fn build_merged_diarization(
    segments: &[Segment],
    max_silence_ms: u64,
) -> MergedDiarization {
    let merged_segments = merge_segments(segments, max_silence_ms);
    let transcript = merged_segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let translated_transcript = merged_segments
        .iter()
        .filter_map(|s| s.translated_text.as_deref())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    MergedDiarization {
        transcript,
        translated_transcript,
        original_segment_count: segments.len(),
        merged_segment_count: merged_segments.len(),
        merged_segments,
        max_silence_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(id: &str, speaker: &str, start: f64, end: f64, text: &str) -> Segment {
        Segment {
            segment_id: id.into(),
            speaker: speaker.into(),
            start_time: start,
            end_time: end,
            text: text.into(),
            translated_text: None,
            language: None,
            gender: None,
            pace: None,
            confidence: None,
        }
    }

    #[test]
    fn merges_same_speaker_within_gap() {
        // S1 from the spec's scenario table.
        let segments = vec![
            seg("a1", "A", 0.0, 1.0, "hello"),
            seg("a2", "A", 1.3, 2.0, "world"),
            seg("b1", "B", 2.1, 3.0, "hi"),
        ];
        let merged = merge_segments(&segments, 500);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "hello world");
        assert_eq!(merged[0].start_time, 0.0);
        assert_eq!(merged[0].end_time, 2.0);
        assert_eq!(merged[1].text, "hi");
        assert_eq!(merged[0].segment_id, "merged_000");
        assert_eq!(merged[1].segment_id, "merged_001");
    }

    #[test]
    fn does_not_merge_different_speakers() {
        // S2 from the spec's scenario table.
        let segments = vec![
            seg("a1", "A", 0.0, 1.0, "hello"),
            seg("b1", "B", 1.3, 2.0, "world"),
            seg("b2", "B", 2.1, 3.0, "hi"),
        ];
        let merged = merge_segments(&segments, 500);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn zero_threshold_is_identity() {
        let segments = vec![
            seg("a1", "A", 0.0, 1.0, "hello"),
            seg("a2", "A", 1.001, 2.0, "world"),
        ];
        let merged = merge_segments(&segments, 0);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn zero_threshold_still_merges_exact_touch() {
        let segments = vec![
            seg("a1", "A", 0.0, 1.0, "hello"),
            seg("a2", "A", 1.0, 2.0, "world"),
        ];
        let merged = merge_segments(&segments, 0);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "hello world");
    }

    #[test]
    fn preserves_total_speech_span() {
        let segments = vec![
            seg("a1", "A", 0.0, 1.0, "hello"),
            seg("a2", "A", 1.2, 2.0, "world"),
            seg("a3", "A", 2.3, 3.0, "again"),
        ];
        let merged = merge_segments(&segments, 500);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].start_time, 0.0);
        assert_eq!(merged[0].end_time, 3.0);
        assert_eq!(merged[0].original_segments.len(), 3);
    }

    #[test]
    fn build_merged_diarization_reports_counts_and_transcripts() {
        let segments = vec![
            seg("a1", "A", 0.0, 1.0, "hello"),
            seg("a2", "A", 1.2, 2.0, "world"),
        ];
        let doc = build_merged_diarization(&segments, 500);
        assert_eq!(doc.original_segment_count, 2);
        assert_eq!(doc.merged_segment_count, 1);
        assert_eq!(doc.transcript, "hello world");
    }
}
