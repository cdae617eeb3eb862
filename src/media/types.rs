//! Media adapter data types.

use serde::{Deserialize, Serialize};

/// Decoded PCM audio: mono, 16-bit signed samples at a fixed sample rate.
#[derive(Debug, Clone)]
pub struct Pcm {
    pub sample_rate: u32,
    pub samples: Vec<i16>,
}

impl Pcm {
    pub fn silence(sample_rate: u32, duration_secs: f64) -> Self {
        let n = (sample_rate as f64 * duration_secs.max(0.0)).round() as usize;
        Self {
            sample_rate,
            samples: vec![0; n],
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Output container format for `encode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioFormat {
    Wav,
    Mp3,
}

impl AudioFormat {
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
        }
    }
}

/// Default working sample rate for the pipeline's internal canvas and stems.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Lower bound for a single chained tempo-filter stage, matching the
/// ffmpeg `atempo` filter's valid range.
pub const ATEMPO_MIN: f64 = 0.5;
/// Upper bound for a single chained tempo-filter stage.
pub const ATEMPO_MAX: f64 = 2.0;
/// Floor applied to any requested speed factor to avoid audible artifacts.
pub const SPEED_FACTOR_FLOOR: f64 = 0.9;
