//! On-disk data model persisted by the session store (see module docs).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single speaker-attributed span of speech.
///
/// Accepts both `start`/`end` and `start_time`/`end_time` on deserialize for
/// compatibility with diarizations produced by older tooling; always
/// serializes using `start_time`/`end_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub segment_id: String,
    pub speaker: String,
    #[serde(alias = "start")]
    pub start_time: f64,
    #[serde(alias = "end")]
    pub end_time: f64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pace: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Segment {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn is_valid(&self) -> bool {
        self.end_time > self.start_time && self.start_time >= 0.0
    }
}

/// A merged segment carrying the pre-merge records it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedSegment {
    pub segment_id: String,
    pub speaker: String,
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,
    pub original_segments: Vec<Segment>,
}

impl MergedSegment {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// The current diarization for a session: ordered segments plus the
/// transcript that must always equal their whitespace-joined text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diarization {
    pub transcript: String,
    pub segments: Vec<Segment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
}

impl Diarization {
    /// Regenerate `transcript` from the current segment texts.
    pub fn rebuild_transcript(&mut self) {
        self.transcript = self
            .segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
    }

    /// Concatenation of all non-empty translations, used as the translated
    /// transcript.
    pub fn translated_transcript(&self) -> String {
        self.segments
            .iter()
            .filter_map(|s| s.translated_text.as_deref())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// The post-merge diarization persisted alongside the pre-merge one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergedDiarization {
    pub transcript: String,
    pub translated_transcript: String,
    pub merged_segments: Vec<MergedSegment>,
    pub original_segment_count: usize,
    pub merged_segment_count: usize,
    pub max_silence_ms: u64,
}

/// Loudness statistics for the two stems produced by separation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeparationStats {
    pub vocals_rms_db: f64,
    pub background_rms_db: f64,
    pub vocals_percentage: f64,
    pub background_percentage: f64,
}

/// Separation-stage metadata, written to `music/metadata.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeparationMetadata {
    pub vocals_path: String,
    pub background_path: String,
    pub has_significant_background: bool,
    pub stats: SeparationStats,
}

/// Quality bucket assigned to a single aligned segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    Good,
    Acceptable,
    Poor,
}

/// Per-segment outcome of time alignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentAlignment {
    pub segment_id: String,
    pub status: AlignmentStatus,
    pub input_file: String,
    pub output_file: String,
    pub original_duration: f64,
    pub target_duration: f64,
    pub output_duration: f64,
    pub duration_difference: f64,
    pub speed_factor: f64,
    pub quality_level: QualityLevel,
    pub quality_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentStatus {
    Success,
    Failed,
    Skipped,
}

/// Aggregated alignment statistics across all segments of a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlignmentGlobalStats {
    pub total: usize,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub avg_speed_factor: f64,
    pub min_speed_factor: f64,
    pub max_speed_factor: f64,
    pub good_count: usize,
    pub acceptable_count: usize,
    pub poor_count: usize,
}

/// Full alignment metadata document: per-segment records plus aggregates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlignmentMetadata {
    pub segments: Vec<SegmentAlignment>,
    pub global_stats: AlignmentGlobalStats,
}

/// Flat session-wide metadata document. Nested sections are arbitrary JSON
/// so stage-specific shapes don't need a central schema change; the
/// append-only store only guarantees key preservation, not a fixed shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(flatten)]
    pub fields: HashMap<String, serde_json::Value>,
}

impl SessionMetadata {
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.fields
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }

    pub fn get_section(&self, name: &str) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.fields.get(name).and_then(|v| v.as_object())
    }
}
