//! FFmpeg-backed implementation of the media adapter.
//!
//! All decode/encode/stretch operations shell out to FFmpeg via
//! `ffmpeg-sidecar` rather than linking against it, matching how this
//! workspace's media crates avoid a `pkg-config`/dev-headers dependency.

use std::path::{Path, PathBuf};

use ffmpeg_sidecar::command::FfmpegCommand;
use tracing::{debug, warn};

use crate::error::MediaError;

use super::types::{AudioFormat, Pcm, ATEMPO_MAX, ATEMPO_MIN, DEFAULT_SAMPLE_RATE, SPEED_FACTOR_FLOOR};

/// Stateless FFmpeg-backed media operations. Holds no resources; cheap to
/// construct per call site.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegMedia;

impl FfmpegMedia {
    pub fn new() -> Self {
        Self
    }

    /// Probe a file's duration in seconds. WAV inputs are read directly;
    /// anything else is first transcoded to a temporary WAV via FFmpeg.
    pub fn probe_duration(&self, path: &Path) -> Result<f64, MediaError> {
        if let Ok(reader) = hound::WavReader::open(path) {
            let spec = reader.spec();
            return Ok(reader.duration() as f64 / spec.sample_rate as f64);
        }
        let pcm = self.decode(path).map_err(|e| MediaError::Probe {
            path: path.to_string_lossy().to_string(),
            source: anyhow::anyhow!(e),
        })?;
        Ok(pcm.duration_secs())
    }

    /// Decode any input into mono 16-bit PCM at [`DEFAULT_SAMPLE_RATE`].
    pub fn decode(&self, path: &Path) -> Result<Pcm, MediaError> {
        let out = tempfile_sibling(path, "wav");
        let path_str = path.to_string_lossy().to_string();
        let out_str = out.to_string_lossy().to_string();

        let status = FfmpegCommand::new()
            .input(&path_str)
            .args(["-ac", "1", "-ar", &DEFAULT_SAMPLE_RATE.to_string()])
            .output(&out_str)
            .spawn()
            .and_then(|mut c| c.wait())
            .map_err(|e| MediaError::Decode {
                path: path_str.clone(),
                source: anyhow::anyhow!(e),
            })?;
        if !status.success() {
            return Err(MediaError::Decode {
                path: path_str,
                source: anyhow::anyhow!("ffmpeg exited with {:?}", status.code()),
            });
        }

        read_wav(&out)
    }

    /// Encode PCM to the given format at `path`.
    pub fn encode(&self, pcm: &Pcm, path: &Path, format: AudioFormat) -> Result<(), MediaError> {
        let tmp_wav = match format {
            AudioFormat::Wav => path.to_path_buf(),
            AudioFormat::Mp3 => tempfile_sibling(path, "wav"),
        };
        write_wav(pcm, &tmp_wav)?;

        if format == AudioFormat::Mp3 {
            let in_str = tmp_wav.to_string_lossy().to_string();
            let out_str = path.to_string_lossy().to_string();
            let status = FfmpegCommand::new()
                .input(&in_str)
                .args(["-codec:a", "libmp3lame", "-qscale:a", "2"])
                .output(&out_str)
                .spawn()
                .and_then(|mut c| c.wait())
                .map_err(|e| MediaError::Encode {
                    path: out_str.clone(),
                    source: anyhow::anyhow!(e),
                })?;
            let _ = std::fs::remove_file(&tmp_wav);
            if !status.success() {
                return Err(MediaError::Encode {
                    path: out_str,
                    source: anyhow::anyhow!("ffmpeg exited with {:?}", status.code()),
                });
            }
        }
        Ok(())
    }

    pub fn silence(&self, duration_secs: f64) -> Pcm {
        Pcm::silence(DEFAULT_SAMPLE_RATE, duration_secs)
    }

    pub fn concatenate(&self, a: &Pcm, b: &Pcm) -> Pcm {
        let mut samples = a.samples.clone();
        samples.extend_from_slice(&b.samples);
        Pcm {
            sample_rate: a.sample_rate,
            samples,
        }
    }

    /// Mix `overlay` into `base` starting at `position_ms`, clipping on add.
    pub fn overlay(&self, base: &Pcm, overlay: &Pcm, position_ms: u64) -> Pcm {
        let mut samples = base.samples.clone();
        let start = ((position_ms as f64 / 1000.0) * base.sample_rate as f64).round() as usize;
        for (i, &s) in overlay.samples.iter().enumerate() {
            let idx = start + i;
            if idx >= samples.len() {
                break;
            }
            samples[idx] = samples[idx].saturating_add(s);
        }
        Pcm {
            sample_rate: base.sample_rate,
            samples,
        }
    }

    /// Time-stretch `in_path` to `out_path` by `speed_factor` using a chain
    /// of `atempo` filters, each kept within ffmpeg's valid `[0.5, 2.0]`
    /// per-stage range. Factors below [`SPEED_FACTOR_FLOOR`] are clamped.
    pub fn time_stretch(
        &self,
        in_path: &Path,
        out_path: &Path,
        speed_factor: f64,
    ) -> Result<(), MediaError> {
        if !speed_factor.is_finite() || speed_factor <= 0.0 {
            return Err(MediaError::InvalidSpeedFactor(speed_factor));
        }
        let clamped = speed_factor.max(SPEED_FACTOR_FLOOR);
        if (clamped - speed_factor).abs() > f64::EPSILON {
            warn!(
                requested = speed_factor,
                clamped, "speed factor clamped to floor"
            );
        }

        let filter = build_atempo_filter_chain(clamped);
        let in_str = in_path.to_string_lossy().to_string();
        let out_str = out_path.to_string_lossy().to_string();
        debug!(filter = %filter, "applying atempo chain");

        let status = FfmpegCommand::new()
            .input(&in_str)
            .args(["-filter:a", &filter])
            .output(&out_str)
            .spawn()
            .and_then(|mut c| c.wait())
            .map_err(|e| MediaError::Encode {
                path: out_str.clone(),
                source: anyhow::anyhow!(e),
            })?;
        if !status.success() {
            return Err(MediaError::Encode {
                path: out_str,
                source: anyhow::anyhow!("ffmpeg exited with {:?}", status.code()),
            });
        }
        Ok(())
    }

    /// Mean RMS loudness of the file's samples, in dBFS.
    pub fn rms_dbfs(&self, path: &Path) -> Result<f64, MediaError> {
        let pcm = self.decode(path)?;
        Ok(rms_dbfs_of(&pcm.samples))
    }
}

/// Compute dBFS for a slice of 16-bit samples. Silence maps to a very
/// negative floor rather than `-inf`.
pub fn rms_dbfs_of(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return -120.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64 / i16::MAX as f64).powi(2)).sum();
    let rms = (sum_sq / samples.len() as f64).sqrt();
    if rms <= 0.0 {
        -120.0
    } else {
        20.0 * rms.log10()
    }
}

/// Build the ffmpeg `atempo` filter-chain string for an arbitrary
/// `speed_factor`, chaining `atempo=2.0` / `atempo=0.5` stages to cover the
/// full `[0.25, ...]` range before applying the fractional remainder.
pub fn build_atempo_filter_chain(speed_factor: f64) -> String {
    let mut remaining = speed_factor;
    let mut stages = Vec::new();
    while remaining > ATEMPO_MAX {
        stages.push(ATEMPO_MAX);
        remaining /= ATEMPO_MAX;
    }
    while remaining < ATEMPO_MIN {
        stages.push(ATEMPO_MIN);
        remaining /= ATEMPO_MIN;
    }
    stages.push(remaining);

    stages
        .iter()
        .map(|f| format!("atempo={:.6}", f))
        .collect::<Vec<_>>()
        .join(",")
}

fn tempfile_sibling(path: &Path, ext: &str) -> PathBuf {
    let mut p = path.to_path_buf();
    let stem = p.file_stem().and_then(|s| s.to_str()).unwrap_or("tmp").to_string();
    p.set_file_name(format!("{stem}.{}.{ext}", uuid::Uuid::new_v4()));
    p
}

fn read_wav(path: &Path) -> Result<Pcm, MediaError> {
    let mut reader = hound::WavReader::open(path).map_err(|e| MediaError::Decode {
        path: path.to_string_lossy().to_string(),
        source: anyhow::anyhow!(e),
    })?;
    let spec = reader.spec();
    let samples: Vec<i16> = reader
        .samples::<i16>()
        .collect::<Result<_, _>>()
        .map_err(|e| MediaError::Decode {
            path: path.to_string_lossy().to_string(),
            source: anyhow::anyhow!(e),
        })?;
    Ok(Pcm {
        sample_rate: spec.sample_rate,
        samples,
    })
}

fn write_wav(pcm: &Pcm, path: &Path) -> Result<(), MediaError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: pcm.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).map_err(|e| MediaError::Encode {
        path: path.to_string_lossy().to_string(),
        source: anyhow::anyhow!(e),
    })?;
    for &s in &pcm.samples {
        writer.write_sample(s).map_err(|e| MediaError::Encode {
            path: path.to_string_lossy().to_string(),
            source: anyhow::anyhow!(e),
        })?;
    }
    writer.finalize().map_err(|e| MediaError::Encode {
        path: path.to_string_lossy().to_string(),
        source: anyhow::anyhow!(e),
    })
}
