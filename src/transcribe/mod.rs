//! Diarized transcription: VAD-guided segmentation handed to an external
//! ASR+diarization provider, producing the canonical segment list (C5).

pub mod vad;

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::TranscriberError;
use crate::media::{FfmpegMedia, Pcm};
use crate::session::{Diarization, Segment};

use vad::{detect_speech_regions, SpeechRegion, VadConfig};

/// Default language code applied when a provider omits one.
pub const DEFAULT_LANGUAGE_CODE: &str = "hi-IN";

/// Raw per-region result returned by the ASR+diarization provider.
#[derive(Debug, Clone)]
pub struct ProviderSegment {
    pub speaker: String,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub gender: Option<String>,
}

/// A region-level ASR+diarization call. One provider call covers one VAD
/// region; the transcriber stitches per-region results into one diarization.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    async fn transcribe_region(
        &self,
        pcm: &Pcm,
        region: SpeechRegion,
    ) -> anyhow::Result<(Vec<ProviderSegment>, Option<String>)>;
}

/// Transcribes a full audio file into a diarization: VAD finds speech
/// regions, each region is sent to the provider, and results are merged in
/// chronological order with stable segment ids.
pub async fn transcribe(
    provider: &dyn TranscriptionProvider,
    media: &FfmpegMedia,
    audio_path: &std::path::Path,
    vad_config: &VadConfig,
) -> Result<Diarization, TranscriberError> {
    let pcm = media.decode(audio_path)?;
    let regions = detect_speech_regions(&pcm, vad_config);
    info!(regions = regions.len(), "vad produced speech regions");

    if regions.is_empty() {
        return Err(TranscriberError::NoSpeech);
    }

    let mut segments = Vec::new();
    let mut language_code = None;

    for region in regions {
        match provider.transcribe_region(&pcm, region).await {
            Ok((raw_segments, lang)) => {
                if language_code.is_none() {
                    language_code = lang;
                }
                for raw in raw_segments {
                    segments.push(Segment {
                        segment_id: format!("seg_{}", Uuid::new_v4().simple()),
                        speaker: raw.speaker,
                        start_time: raw.start,
                        end_time: raw.end,
                        text: raw.text,
                        translated_text: None,
                        language: None,
                        gender: Some(raw.gender.unwrap_or_else(|| "neutral".to_string())),
                        pace: None,
                        confidence: None,
                    });
                }
            }
            Err(e) => {
                warn!(region = ?region, error = %e, "region transcription failed, skipping");
            }
        }
    }

    if segments.is_empty() {
        return Err(TranscriberError::NoSpeech);
    }

    segments.sort_by(|a, b| a.start_time.partial_cmp(&b.start_time).unwrap());

    let mut diarization = Diarization {
        transcript: String::new(),
        segments,
        language_code: Some(language_code.unwrap_or_else(|| DEFAULT_LANGUAGE_CODE.to_string())),
        target_language: None,
    };
    diarization.rebuild_transcript();
    Ok(diarization)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeProvider;

    #[async_trait]
    impl TranscriptionProvider for FakeProvider {
        async fn transcribe_region(
            &self,
            _pcm: &Pcm,
            region: SpeechRegion,
        ) -> anyhow::Result<(Vec<ProviderSegment>, Option<String>)> {
            Ok((
                vec![ProviderSegment {
                    speaker: "SPEAKER_00".into(),
                    start: region.start,
                    end: region.end,
                    text: "hello".into(),
                    gender: None,
                }],
                Some("hi-IN".into()),
            ))
        }
    }

    struct SilentProvider;
    #[async_trait]
    impl TranscriptionProvider for SilentProvider {
        async fn transcribe_region(
            &self,
            _pcm: &Pcm,
            _region: SpeechRegion,
        ) -> anyhow::Result<(Vec<ProviderSegment>, Option<String>)> {
            Ok((vec![], None))
        }
    }

    #[tokio::test]
    async fn transcribe_builds_ordered_diarization() {
        let media = FfmpegMedia::new();
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("in.wav");
        let mut samples = vec![0i16; 16000 / 2];
        samples.extend(std::iter::repeat(5000i16).take(16000 * 2));
        samples.extend(std::iter::repeat(0i16).take(16000 / 2));
        let pcm = Pcm { sample_rate: 16000, samples };
        media.encode(&pcm, &path, crate::media::AudioFormat::Wav).unwrap();

        let result = transcribe(&FakeProvider, &media, &path, &VadConfig::default()).await.unwrap();
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.language_code.as_deref(), Some("hi-IN"));
        assert_eq!(result.transcript, "hello");
    }

    #[tokio::test]
    async fn transcribe_fails_with_no_speech_error_on_empty_result() {
        let media = FfmpegMedia::new();
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("in.wav");
        let mut samples = vec![0i16; 16000 / 2];
        samples.extend(std::iter::repeat(5000i16).take(16000 * 2));
        let pcm = Pcm { sample_rate: 16000, samples };
        media.encode(&pcm, &path, crate::media::AudioFormat::Wav).unwrap();

        let err = transcribe(&SilentProvider, &media, &path, &VadConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TranscriberError::NoSpeech));
    }
}
