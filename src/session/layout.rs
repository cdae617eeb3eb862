//! Canonical relative paths within a session directory.

use std::path::PathBuf;

/// Relative-path conventions for a session's files, shared by every stage so
/// no component hardcodes a layout of its own.
pub struct Layout;

impl Layout {
    pub fn audio(stem: &str, ext: &str) -> PathBuf {
        PathBuf::from("audio").join(format!("{stem}.{ext}"))
    }

    pub fn background_stem() -> PathBuf {
        PathBuf::from("music").join("background.wav")
    }

    pub fn separation_metadata() -> PathBuf {
        PathBuf::from("music").join("metadata.json")
    }

    pub fn diarization() -> PathBuf {
        PathBuf::from("diarization.json")
    }

    pub fn diarization_csv() -> PathBuf {
        PathBuf::from("diarization.csv")
    }

    pub fn diarization_translated() -> PathBuf {
        PathBuf::from("diarization_translated.json")
    }

    pub fn diarization_translated_merged() -> PathBuf {
        PathBuf::from("diarization_translated_merged.json")
    }

    pub fn translation_text(target_language: &str) -> PathBuf {
        PathBuf::from("translation").join(format!("{target_language}.txt"))
    }

    pub fn synthesis_segment(segment_id: &str) -> PathBuf {
        PathBuf::from("synthesis").join(format!("segment_{segment_id}.wav"))
    }

    pub fn synthesis_segment_aligned(segment_id: &str) -> PathBuf {
        PathBuf::from("synthesis").join(format!("segment_{segment_id}_time_aligned.wav"))
    }

    pub fn final_output(timestamp: i64) -> PathBuf {
        PathBuf::from("synthesis").join(format!("final_output_{timestamp}.wav"))
    }

    pub fn metadata() -> PathBuf {
        PathBuf::from("metadata.json")
    }

    pub fn metadata_log() -> PathBuf {
        PathBuf::from("metadata_log.txt")
    }

    pub fn tool_output(stage: &str) -> PathBuf {
        PathBuf::from("tool_outputs").join(format!("{stage}.json"))
    }

    pub fn alignment_metadata() -> PathBuf {
        PathBuf::from("time_alignment.json")
    }
}
