//! `diarization.csv` sibling artifact, a flat view of the segment list for
//! spreadsheet-based review (supplemented feature, not in the core JSON
//! data model).

use super::types::Segment;

const HEADER: [&str; 8] = [
    "segment_id",
    "speaker_id",
    "start_time",
    "end_time",
    "text",
    "confidence",
    "translated_text",
    "gender",
];

/// Render `segments` as CSV bytes in the canonical column order.
pub fn build_diarization_csv(segments: &[Segment]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(HEADER)?;

    for segment in segments {
        writer.write_record([
            segment.segment_id.as_str(),
            segment.speaker.as_str(),
            &segment.start_time.to_string(),
            &segment.end_time.to_string(),
            segment.text.as_str(),
            &segment
                .confidence
                .map(|c| c.to_string())
                .unwrap_or_default(),
            segment.translated_text.as_deref().unwrap_or(""),
            segment.gender.as_deref().unwrap_or(""),
        ])?;
    }

    writer.into_inner().map_err(|e| e.into_error())
}
