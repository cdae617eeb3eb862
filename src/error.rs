//! Per-component error taxonomy.
//!
//! Each pipeline stage owns a closed `thiserror` enum so callers can match on
//! failure modes instead of parsing strings. [`PipelineError`] composes them
//! at the orchestration boundary and classifies each into the error kind
//! (`InvalidInput`, `NotFound`, `ExternalUnavailable`, `PartialFailure`,
//! `Fatal`) that gets surfaced through session status.

use thiserror::Error;

/// Coarse classification used for status reporting and HTTP-style mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    ExternalUnavailable,
    PartialFailure,
    Fatal,
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("ffmpeg probe failed for {path}: {source}")]
    Probe {
        path: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("ffmpeg decode failed for {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("ffmpeg encode failed for {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("invalid speed factor {0}: must be positive and finite")]
    InvalidSpeedFactor(f64),
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(String),
    #[error("artifact {relpath} not found in session {session}")]
    ArtifactNotFound { session: String, relpath: String },
    #[error("io error in session {session}: {source}")]
    Io {
        session: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed metadata in session {session}: {source}")]
    Malformed {
        session: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("url {0} is not a recognized source")]
    UnsupportedUrl(String),
    #[error("all ingest strategies failed for {url}: {last_error}")]
    AllStrategiesFailed { url: String, last_error: String },
    #[error(transparent)]
    Media(#[from] MediaError),
}

#[derive(Debug, Error)]
pub enum SeparationError {
    #[error("separator process failed: {0}")]
    ProcessFailed(String),
    #[error(transparent)]
    Media(#[from] MediaError),
}

#[derive(Debug, Error)]
pub enum TranscriberError {
    #[error("no speech detected in audio")]
    NoSpeech,
    #[error("transcription provider error: {0}")]
    ProviderError(String),
    #[error(transparent)]
    Media(#[from] MediaError),
}

#[derive(Debug, Error)]
pub enum TranslatorError {
    #[error("segment {segment_id} failed validation after {attempts} attempts: {reason}")]
    ValidationFailed {
        segment_id: String,
        attempts: u32,
        reason: String,
    },
    #[error("translation provider error: {0}")]
    ProviderError(String),
    #[error("no segments could be translated")]
    TotalFailure,
}

#[derive(Debug, Error)]
pub enum TtsError {
    #[error("no voice mapped for speaker {speaker} and no provider default available")]
    NoVoice { speaker: String },
    #[error("tts provider {provider} error for segment {segment_id}: {reason}")]
    ProviderError {
        provider: String,
        segment_id: String,
        reason: String,
    },
    #[error(transparent)]
    Media(#[from] MediaError),
}

#[derive(Debug, Error)]
pub enum AlignError {
    #[error("segment {segment_id} has non-positive duration: original={original}, target={target}")]
    NonPositiveDuration {
        segment_id: String,
        original: f64,
        target: f64,
    },
    #[error(transparent)]
    Media(#[from] MediaError),
}

#[derive(Debug, Error)]
pub enum StitchError {
    #[error("no segments to stitch")]
    EmptyTimeline,
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Top-level error surfaced to pipeline callers. Composes every stage error
/// via `#[from]` and reports the [`ErrorKind`] used for status/HTTP mapping.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Separation(#[from] SeparationError),
    #[error(transparent)]
    Transcriber(#[from] TranscriberError),
    #[error(transparent)]
    Translator(#[from] TranslatorError),
    #[error(transparent)]
    Tts(#[from] TtsError),
    #[error(transparent)]
    Align(#[from] AlignError),
    #[error(transparent)]
    Stitch(#[from] StitchError),
    #[error(transparent)]
    Media(#[from] MediaError),
}

impl PipelineError {
    /// Classify this error for status reporting; mirrors the taxonomy kinds.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Session(SessionError::NotFound(_)) => ErrorKind::NotFound,
            PipelineError::Session(SessionError::ArtifactNotFound { .. }) => ErrorKind::NotFound,
            PipelineError::Ingest(IngestError::UnsupportedUrl(_)) => ErrorKind::InvalidInput,
            PipelineError::Ingest(IngestError::AllStrategiesFailed { .. }) => {
                ErrorKind::ExternalUnavailable
            }
            PipelineError::Transcriber(TranscriberError::NoSpeech) => ErrorKind::Fatal,
            PipelineError::Translator(TranslatorError::TotalFailure) => ErrorKind::PartialFailure,
            PipelineError::Translator(_) => ErrorKind::PartialFailure,
            PipelineError::Tts(_) => ErrorKind::PartialFailure,
            PipelineError::Separation(_) => ErrorKind::Fatal,
            PipelineError::Align(_) => ErrorKind::PartialFailure,
            PipelineError::Stitch(_) => ErrorKind::Fatal,
            PipelineError::Media(_) => ErrorKind::ExternalUnavailable,
            PipelineError::Session(_) => ErrorKind::Fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_not_found_displays_session_id() {
        let err = SessionError::NotFound("session_abc123xyz0".into());
        assert!(err.to_string().contains("session_abc123xyz0"));
    }

    #[test]
    fn translator_validation_error_displays_segment_id() {
        let err = TranslatorError::ValidationFailed {
            segment_id: "seg_003".into(),
            attempts: 2,
            reason: "missing transcript field".into(),
        };
        assert!(err.to_string().contains("seg_003"));
        assert!(err.to_string().contains("2"));
    }

    #[test]
    fn tts_provider_error_displays_provider_name() {
        let err = TtsError::ProviderError {
            provider: "sarvam".into(),
            segment_id: "seg_001".into(),
            reason: "timeout".into(),
        };
        assert!(err.to_string().contains("sarvam"));
        assert!(err.to_string().contains("seg_001"));
    }

    #[test]
    fn pipeline_error_kind_classification() {
        let err: PipelineError = SessionError::NotFound("s1".into()).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err: PipelineError = TranscriberError::NoSpeech.into();
        assert_eq!(err.kind(), ErrorKind::Fatal);

        let err: PipelineError = IngestError::UnsupportedUrl("bad".into()).into();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
