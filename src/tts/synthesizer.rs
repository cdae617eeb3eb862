//! Per-segment speech synthesis, with chunking and silence substitution.

use std::path::{Path, PathBuf};

use tracing::{error, warn};
use uuid::Uuid;

use crate::error::TtsError;
use crate::media::{AudioFormat, FfmpegMedia};

use super::provider::TtsBackend;
use super::types::SynthesisOptions;

/// Providers are called in chunks no larger than this many characters.
pub const MAX_CHUNK_CHARS: usize = 500;

/// Minimum duration, in seconds, of a silence substitute clip.
pub const MIN_SILENCE_SECS: f64 = 1.0;

/// Split `text` into chunks of at most `max_chars`, preferring to break at
/// sentence boundaries (`. `, `! `, `? `) rather than mid-sentence.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    if text.len() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.len() > max_chars {
        let window = &remaining[..max_chars];
        let split_at = window
            .rfind(". ")
            .or_else(|| window.rfind("! "))
            .or_else(|| window.rfind("? "))
            .map(|i| i + 2)
            .or_else(|| window.rfind(' ').map(|i| i + 1))
            .unwrap_or(max_chars);

        let (head, tail) = remaining.split_at(split_at);
        chunks.push(head.trim().to_string());
        remaining = tail;
    }
    if !remaining.trim().is_empty() {
        chunks.push(remaining.trim().to_string());
    }
    chunks
}

/// Synthesize `text` for one segment, writing the result to `dest` as a
/// mono WAV file. Empty text produces a silence clip of `target_duration`
/// seconds (floored at [`MIN_SILENCE_SECS`]).
pub async fn synthesize_segment(
    media: &FfmpegMedia,
    backend: &dyn TtsBackend,
    text: &str,
    voice_id: &str,
    options: &SynthesisOptions,
    target_duration: f64,
    work_dir: &Path,
    dest: &Path,
) -> Result<(), TtsError> {
    if text.trim().is_empty() {
        let pcm = media.silence(target_duration.max(MIN_SILENCE_SECS));
        media.encode(&pcm, dest, AudioFormat::Wav)?;
        return Ok(());
    }

    let chunks = chunk_text(text, MAX_CHUNK_CHARS);
    let mut combined = media.silence(0.0);

    for chunk in &chunks {
        let bytes = backend
            .synthesize_chunk(chunk, voice_id, options)
            .await
            .map_err(|e| TtsError::ProviderError {
                provider: backend.name().to_string(),
                segment_id: dest.display().to_string(),
                reason: e.to_string(),
            })?;

        let raw_path = work_dir.join(format!("tts_{}.raw", Uuid::new_v4().simple()));
        std::fs::write(&raw_path, &bytes).map_err(|e| TtsError::Media(e.into()))?;

        let chunk_pcm = media.decode(&raw_path)?;
        let _ = std::fs::remove_file(&raw_path);

        combined = media.concatenate(&combined, &chunk_pcm);
    }

    media.encode(&combined, dest, AudioFormat::Wav)?;
    Ok(())
}

/// Synthesize a segment, substituting a silence clip of `target_duration`
/// seconds on any provider failure rather than aborting the stage. Returns
/// `true` when real audio was produced, `false` when a silence substitute
/// was written instead.
pub async fn synthesize_segment_or_silence(
    media: &FfmpegMedia,
    backend: &dyn TtsBackend,
    text: &str,
    voice_id: &str,
    options: &SynthesisOptions,
    target_duration: f64,
    work_dir: &Path,
    dest: &Path,
) -> bool {
    match synthesize_segment(media, backend, text, voice_id, options, target_duration, work_dir, dest).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "synthesis failed, substituting silence");
            let pcm = media.silence(target_duration.max(MIN_SILENCE_SECS));
            if let Err(write_err) = media.encode(&pcm, dest, AudioFormat::Wav) {
                error!(error = %write_err, "failed to write silence substitute");
            }
            false
        }
    }
}

/// Path convention used to locate a segment's synthesized artifact; the
/// aligner looks these up by segment id with a `segment_`/`merged_` prefix.
pub fn synthesis_filename(segment_id: &str) -> PathBuf {
    PathBuf::from(format!("segment_{segment_id}.wav"))
}
