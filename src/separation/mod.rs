//! Stem separation into vocal and background tracks (C4).
//!
//! Separation itself is delegated to an external two-stem source-separation
//! model invoked as a subprocess; this module owns locating its output,
//! copying stems to the session's canonical paths, and computing the
//! loudness statistics that decide whether background remixing applies.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{info, warn};

use crate::error::SeparationError;
use crate::media::FfmpegMedia;
use crate::session::{SeparationMetadata, SeparationStats};

/// dBFS threshold above which a background stem is considered significant
/// enough to remix back into the final output.
pub const BACKGROUND_SIGNIFICANCE_THRESHOLD_DB: f64 = -40.0;

/// Invokes the external stem-separation model and reports result paths.
pub trait StemSeparatorBackend: Send + Sync {
    /// Run separation, writing `vocals.wav` and `no_vocals.wav`-equivalent
    /// files under `work_dir`, and return their paths.
    fn separate(&self, input: &Path, work_dir: &Path) -> Result<(PathBuf, PathBuf), SeparationError>;
}

/// Shells out to a two-stem Demucs-style model via subprocess, matching the
/// original's `python3 -m demucs.separate --two-stems=vocals` invocation.
pub struct DemucsBackend {
    pub model_name: String,
}

impl Default for DemucsBackend {
    fn default() -> Self {
        Self {
            model_name: "htdemucs".to_string(),
        }
    }
}

impl StemSeparatorBackend for DemucsBackend {
    fn separate(&self, input: &Path, work_dir: &Path) -> Result<(PathBuf, PathBuf), SeparationError> {
        std::fs::create_dir_all(work_dir).map_err(|e| {
            SeparationError::ProcessFailed(format!("could not create work dir: {e}"))
        })?;

        let status = Command::new("python3")
            .args([
                "-m",
                "demucs.separate",
                "--two-stems=vocals",
                "-n",
                &self.model_name,
                "-o",
            ])
            .arg(work_dir)
            .arg(input)
            .status()
            .map_err(|e| SeparationError::ProcessFailed(format!("failed to spawn demucs: {e}")))?;

        if !status.success() {
            return Err(SeparationError::ProcessFailed(format!(
                "demucs exited with {:?}",
                status.code()
            )));
        }

        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("input");
        let out_dir = work_dir.join(&self.model_name).join(stem);
        let vocals = out_dir.join("vocals.wav");
        let background = out_dir.join("no_vocals.wav");
        if !vocals.exists() || !background.exists() {
            return Err(SeparationError::ProcessFailed(format!(
                "expected demucs output not found under {}",
                out_dir.display()
            )));
        }
        Ok((vocals, background))
    }
}

/// Run separation against `input`, copy stems into the session's canonical
/// `audio/`/`music/` locations, and compute the loudness statistics used to
/// decide background significance.
pub fn separate(
    backend: &dyn StemSeparatorBackend,
    media: &FfmpegMedia,
    input: &Path,
    work_dir: &Path,
    vocals_dest: &Path,
    background_dest: &Path,
) -> Result<SeparationMetadata, SeparationError> {
    info!(input = %input.display(), "running stem separation");
    let (vocals_src, background_src) = backend.separate(input, work_dir)?;

    if let Some(parent) = vocals_dest.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    if let Some(parent) = background_dest.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    std::fs::copy(&vocals_src, vocals_dest)
        .map_err(|e| SeparationError::ProcessFailed(format!("copy vocals failed: {e}")))?;
    std::fs::copy(&background_src, background_dest)
        .map_err(|e| SeparationError::ProcessFailed(format!("copy background failed: {e}")))?;

    let vocals_db = media.rms_dbfs(vocals_dest)?;
    let background_db = media.rms_dbfs(background_dest)?;
    let has_significant_background = background_db > BACKGROUND_SIGNIFICANCE_THRESHOLD_DB;

    if !has_significant_background {
        warn!(background_db, "background stem below significance threshold");
    }

    let vocals_amp = 10f64.powf(vocals_db / 20.0);
    let background_amp = 10f64.powf(background_db / 20.0);
    let total = vocals_amp + background_amp;
    let (vocals_pct, background_pct) = if total > 0.0 {
        (vocals_amp / total * 100.0, background_amp / total * 100.0)
    } else {
        (100.0, 0.0)
    };

    Ok(SeparationMetadata {
        vocals_path: vocals_dest.to_string_lossy().to_string(),
        background_path: background_dest.to_string_lossy().to_string(),
        has_significant_background,
        stats: SeparationStats {
            vocals_rms_db: vocals_db,
            background_rms_db: background_db,
            vocals_percentage: vocals_pct,
            background_percentage: background_pct,
        },
    })
}
