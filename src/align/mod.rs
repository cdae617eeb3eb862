//! Duration-matching time alignment of synthesized segments (C10).

use std::path::Path;

use tracing::{info, warn};

use crate::error::AlignError;
use crate::media::FfmpegMedia;
use crate::session::{AlignmentGlobalStats, AlignmentMetadata, AlignmentStatus, QualityLevel, SegmentAlignment};

/// Speed factors at or above this and at or below the upper bound are `good`.
const GOOD_RANGE: (f64, f64) = (0.8, 1.25);
/// Speed factors in this range (excluding the good range) are `acceptable`.
const ACCEPTABLE_RANGE: (f64, f64) = (0.6, 1.75);
/// Duration drift beyond this many seconds costs quality-score points.
const DURATION_DIFFERENCE_PENALTY_THRESHOLD: f64 = 0.5;
const DURATION_DIFFERENCE_PENALTY: f64 = 10.0;

fn classify_quality(speed_factor: f64) -> QualityLevel {
    if speed_factor >= GOOD_RANGE.0 && speed_factor <= GOOD_RANGE.1 {
        QualityLevel::Good
    } else if speed_factor >= ACCEPTABLE_RANGE.0 && speed_factor <= ACCEPTABLE_RANGE.1 {
        QualityLevel::Acceptable
    } else {
        QualityLevel::Poor
    }
}

fn quality_score(quality: QualityLevel, duration_difference: f64) -> f64 {
    let base = match quality {
        QualityLevel::Good => 90.0,
        QualityLevel::Acceptable => 70.0,
        QualityLevel::Poor => 50.0,
    };
    if duration_difference.abs() > DURATION_DIFFERENCE_PENALTY_THRESHOLD {
        base - DURATION_DIFFERENCE_PENALTY
    } else {
        base
    }
}

/// Align one synthesized clip to `target_duration` via deterministic
/// time-stretch, writing the stretched clip to `out_path` and returning
/// the resulting metrics.
pub fn align_segment(
    media: &FfmpegMedia,
    segment_id: &str,
    in_path: &Path,
    out_path: &Path,
    target_duration: f64,
) -> Result<SegmentAlignment, AlignError> {
    let original_duration = media.probe_duration(in_path)?;

    if original_duration <= 0.0 || target_duration <= 0.0 {
        return Err(AlignError::NonPositiveDuration {
            segment_id: segment_id.to_string(),
            original: original_duration,
            target: target_duration,
        });
    }

    let speed_factor = (original_duration / target_duration).max(crate::media::SPEED_FACTOR_FLOOR);
    media.time_stretch(in_path, out_path, speed_factor)?;

    let output_duration = media.probe_duration(out_path)?;
    let duration_difference = output_duration - target_duration;
    let quality_level = classify_quality(speed_factor);
    let quality_score = quality_score(quality_level, duration_difference);

    if quality_level == QualityLevel::Poor {
        warn!(segment_id, speed_factor, "segment alignment quality is poor");
    }

    Ok(SegmentAlignment {
        segment_id: segment_id.to_string(),
        status: AlignmentStatus::Success,
        input_file: in_path.display().to_string(),
        output_file: out_path.display().to_string(),
        original_duration,
        target_duration,
        output_duration,
        duration_difference,
        speed_factor,
        quality_level,
        quality_score,
    })
}

/// Produce a failed-alignment record for a segment whose synthesis or
/// probing could not be completed, so the aggregate stats still account
/// for it.
pub fn failed_alignment(segment_id: &str, target_duration: f64, reason: &str) -> SegmentAlignment {
    warn!(segment_id, reason, "segment alignment failed");
    SegmentAlignment {
        segment_id: segment_id.to_string(),
        status: AlignmentStatus::Failed,
        input_file: String::new(),
        output_file: String::new(),
        original_duration: 0.0,
        target_duration,
        output_duration: target_duration,
        duration_difference: 0.0,
        speed_factor: 1.0,
        quality_level: QualityLevel::Poor,
        quality_score: 0.0,
    }
}

/// Aggregate per-segment alignment metrics into the global stats persisted
/// alongside them.
pub fn build_alignment_metadata(segments: Vec<SegmentAlignment>) -> AlignmentMetadata {
    let total = segments.len();
    let processed = segments
        .iter()
        .filter(|s| s.status != AlignmentStatus::Skipped)
        .count();
    let successful = segments
        .iter()
        .filter(|s| s.status == AlignmentStatus::Success)
        .count();
    let failed = segments
        .iter()
        .filter(|s| s.status == AlignmentStatus::Failed)
        .count();
    let good_count = segments.iter().filter(|s| s.quality_level == QualityLevel::Good).count();
    let acceptable_count = segments
        .iter()
        .filter(|s| s.quality_level == QualityLevel::Acceptable)
        .count();
    let poor_count = segments.iter().filter(|s| s.quality_level == QualityLevel::Poor).count();

    let speed_factors: Vec<f64> = segments.iter().map(|s| s.speed_factor).collect();
    let avg_speed_factor = if speed_factors.is_empty() {
        0.0
    } else {
        speed_factors.iter().sum::<f64>() / speed_factors.len() as f64
    };
    let min_speed_factor = speed_factors.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_speed_factor = speed_factors.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    info!(total, successful, failed, good_count, acceptable_count, poor_count, "alignment pass complete");

    AlignmentMetadata {
        segments,
        global_stats: AlignmentGlobalStats {
            total,
            processed,
            successful,
            failed,
            avg_speed_factor,
            min_speed_factor: if min_speed_factor.is_finite() { min_speed_factor } else { 0.0 },
            max_speed_factor: if max_speed_factor.is_finite() { max_speed_factor } else { 0.0 },
            good_count,
            acceptable_count,
            poor_count,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_good_quality_for_unit_speed() {
        assert_eq!(classify_quality(1.0), QualityLevel::Good);
        assert_eq!(classify_quality(0.8), QualityLevel::Good);
        assert_eq!(classify_quality(1.25), QualityLevel::Good);
    }

    #[test]
    fn classifies_acceptable_quality_just_outside_good_range() {
        assert_eq!(classify_quality(0.65), QualityLevel::Acceptable);
        assert_eq!(classify_quality(1.5), QualityLevel::Acceptable);
    }

    #[test]
    fn classifies_poor_quality_far_from_unit_speed() {
        assert_eq!(classify_quality(0.3), QualityLevel::Poor);
        assert_eq!(classify_quality(2.0), QualityLevel::Poor);
    }

    #[test]
    fn quality_score_penalizes_large_duration_drift() {
        let base = quality_score(QualityLevel::Good, 0.1);
        let penalized = quality_score(QualityLevel::Good, 0.8);
        assert_eq!(base, 90.0);
        assert_eq!(penalized, 80.0);
    }

    #[test]
    fn align_segment_stretches_clip_to_target_duration() {
        // S4 from the spec's scenario table: a 3.0s clip aligned to a 2.0s
        // target should land around speed_factor = 1.5 (acceptable).
        let media = FfmpegMedia;
        let dir = tempfile::tempdir().unwrap();
        let in_path = dir.path().join("in.wav");
        let out_path = dir.path().join("out.wav");
        let pcm = media.silence(3.0);
        media.encode(&pcm, &in_path, crate::media::AudioFormat::Wav).unwrap();

        let alignment = align_segment(&media, "seg_1", &in_path, &out_path, 2.0).unwrap();

        assert!((alignment.speed_factor - 1.5).abs() < 0.01);
        assert_eq!(alignment.quality_level, QualityLevel::Acceptable);
        assert!((alignment.output_duration - 2.0).abs() < 0.2);
    }

    #[test]
    fn align_segment_rejects_non_positive_durations() {
        let media = FfmpegMedia;
        let dir = tempfile::tempdir().unwrap();
        let in_path = dir.path().join("in.wav");
        let out_path = dir.path().join("out.wav");
        let pcm = media.silence(1.0);
        media.encode(&pcm, &in_path, crate::media::AudioFormat::Wav).unwrap();

        let result = align_segment(&media, "seg_1", &in_path, &out_path, 0.0);
        assert!(matches!(result, Err(AlignError::NonPositiveDuration { .. })));
    }

    #[test]
    fn build_alignment_metadata_counts_each_bucket() {
        let segments = vec![
            SegmentAlignment {
                segment_id: "a".into(),
                status: AlignmentStatus::Success,
                input_file: "a_in.wav".into(),
                output_file: "a_out.wav".into(),
                original_duration: 1.0,
                target_duration: 1.0,
                output_duration: 1.0,
                duration_difference: 0.0,
                speed_factor: 1.0,
                quality_level: QualityLevel::Good,
                quality_score: 90.0,
            },
            failed_alignment("b", 1.0, "synthesis failed"),
        ];
        let metadata = build_alignment_metadata(segments);
        assert_eq!(metadata.global_stats.total, 2);
        assert_eq!(metadata.global_stats.good_count, 1);
        assert_eq!(metadata.global_stats.poor_count, 1);
        assert_eq!(metadata.global_stats.failed, 1);
        assert_eq!(metadata.global_stats.successful, 1);
    }
}
