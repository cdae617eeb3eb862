//! Final-canvas assembly and background remixing (C11).

use tracing::{info, warn};

use crate::error::StitchError;
use crate::media::{rms_dbfs_of, FfmpegMedia, Pcm};
use crate::session::SeparationMetadata;

/// Fallback attenuation target, in dBFS, used when separation metadata has
/// no recorded `background_rms_db`.
pub const BACKGROUND_DB_FALLBACK: f64 = -12.0;

/// One segment's final position on the output canvas.
pub struct PlacedClip {
    pub start_time: f64,
    pub audio: Pcm,
}

/// Allocate a silent canvas long enough to hold `original_duration` (when
/// known) or the furthest clip end otherwise, plus a small trailing buffer.
pub fn canvas_length(original_duration: Option<f64>, clips: &[PlacedClip]) -> f64 {
    if let Some(duration) = original_duration {
        return duration;
    }
    let max_end = clips
        .iter()
        .map(|c| c.start_time + c.audio.duration_secs())
        .fold(0.0_f64, f64::max);
    max_end + 0.5
}

/// Overlay every clip onto a silent canvas at its original start time,
/// then optionally remix the background stem under the result.
pub fn stitch(
    media: &FfmpegMedia,
    mut clips: Vec<PlacedClip>,
    original_duration: Option<f64>,
    background: Option<(&Pcm, &SeparationMetadata)>,
    preserve_background_music: bool,
) -> Result<Pcm, StitchError> {
    if clips.is_empty() {
        return Err(StitchError::EmptyTimeline);
    }

    clips.sort_by(|a, b| a.start_time.partial_cmp(&b.start_time).unwrap());

    let length = canvas_length(original_duration, &clips);
    let mut canvas = media.silence(length);

    for clip in &clips {
        let position_ms = (clip.start_time.max(0.0) * 1000.0).round() as u64;
        canvas = media.overlay(&canvas, &clip.audio, position_ms);
    }

    info!(
        segment_count = clips.len(),
        canvas_secs = length,
        "placed segments on canvas"
    );

    if preserve_background_music {
        if let Some((background_pcm, separation)) = background {
            if separation.has_significant_background {
                canvas = mix_background(media, &canvas, background_pcm, separation);
            } else {
                info!("background present but not significant, skipping remix");
            }
        }
    }

    Ok(canvas)
}

fn mix_background(media: &FfmpegMedia, canvas: &Pcm, background: &Pcm, separation: &SeparationMetadata) -> Pcm {
    let target_db = if separation.stats.background_rms_db != 0.0 {
        separation.stats.background_rms_db
    } else {
        BACKGROUND_DB_FALLBACK
    };

    let current_db = rms_dbfs_of(&background.samples);
    let gain_db = target_db - current_db;
    let gain = 10f64.powf(gain_db / 20.0);

    let attenuated_samples: Vec<i16> = background
        .samples
        .iter()
        .map(|&s| ((s as f64) * gain).clamp(i16::MIN as f64, i16::MAX as f64) as i16)
        .collect();

    let canvas_len = canvas.samples.len();
    let looped_samples: Vec<i16> = if attenuated_samples.is_empty() {
        vec![0; canvas_len]
    } else {
        attenuated_samples
            .iter()
            .cycle()
            .take(canvas_len)
            .copied()
            .collect()
    };

    let looped_background = Pcm {
        sample_rate: background.sample_rate,
        samples: looped_samples,
    };

    if !current_db.is_finite() {
        warn!("background stem is silent, attenuation gain undefined, using fallback level");
    }

    media.overlay(canvas, &looped_background, 0)
}
