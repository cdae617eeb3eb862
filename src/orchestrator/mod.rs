//! Drives the dubbing pipeline's stages in order for one session (C12).
//!
//! Stage transitions: `ingesting -> separated -> diarized -> translated ->
//! merged -> synthesized -> aligned -> stitched -> completed`, with `error`
//! reachable from any stage. Every transition is recorded in the session's
//! `processing_status` metadata section and, on success, a provenance copy
//! of the stage's output is written to `tool_outputs/<stage>.json`.

use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::{json, Map};
use tracing::{error, info, warn};

use crate::align::{self, build_alignment_metadata};
use crate::error::{PipelineError, SessionError, TtsError};
use crate::ingest::{self, IngestStrategy};
use crate::media::{AudioFormat, FfmpegMedia};
use crate::merger;
use crate::separation::{self, StemSeparatorBackend};
use crate::session::{self, Layout, SegmentAlignment, SessionStore};
use crate::stitch::{self, PlacedClip};
use crate::transcribe::vad::VadConfig;
use crate::transcribe::{self, TranscriptionProvider};
use crate::translation::{self, TranslationBackend};
use crate::tts::{self, SpeakerVoiceMap, SynthesisOptions, TtsBackend};

/// How to obtain the session's source audio.
pub enum AudioSource {
    Upload(PathBuf),
    Url(String),
}

/// Per-run options supplied by the caller; not persisted beyond what
/// `processing_status` and the session metadata record about them.
pub struct PipelineRequest {
    pub source: AudioSource,
    pub source_language: String,
    pub target_language: String,
    pub preserve_background_music: bool,
    pub speaker_voice_map: SpeakerVoiceMap,
    pub max_silence_ms: u64,
    pub vad_config: VadConfig,
}

/// External collaborators the orchestrator calls through narrow interfaces.
/// Built fresh per run: trait objects aren't `Clone`, so a `PipelineDeps`
/// is consumed by the run it's supplied to.
pub struct PipelineDeps {
    pub media: FfmpegMedia,
    pub youtube_strategies: Vec<Box<dyn IngestStrategy>>,
    pub instagram_strategies: Vec<Box<dyn IngestStrategy>>,
    pub separator: Box<dyn StemSeparatorBackend>,
    pub transcription_provider: Box<dyn TranscriptionProvider>,
    pub translation_backend: Box<dyn TranslationBackend>,
    pub tts_backends: HashMap<String, Box<dyn TtsBackend>>,
}

/// Drives one session through every stage, using `store` for all artifact
/// and metadata I/O.
pub struct Orchestrator {
    store: SessionStore,
}

impl Orchestrator {
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    async fn set_status(&self, session: &str, stage: &str, progress: u8, message: &str) -> Result<(), PipelineError> {
        let mut section = Map::new();
        section.insert("stage".to_string(), json!(stage));
        section.insert("progress".to_string(), json!(progress));
        section.insert("message".to_string(), json!(message));
        section.insert("ts".to_string(), json!(chrono::Utc::now().to_rfc3339()));
        session::metadata::update_section(&self.store, session, "processing_status", section).await?;
        Ok(())
    }

    async fn set_error(&self, session: &str, stage: &str, err: &PipelineError) {
        error!(session, stage, error = %err, "pipeline stage failed fatally");
        let mut section = Map::new();
        section.insert("stage".to_string(), json!("error"));
        section.insert("failed_stage".to_string(), json!(stage));
        section.insert("message".to_string(), json!(err.to_string()));
        section.insert("ts".to_string(), json!(chrono::Utc::now().to_rfc3339()));
        let _ = session::metadata::update_section(&self.store, session, "processing_status", section).await;
    }

    async fn record_provenance<T: serde::Serialize + Send + Sync>(
        &self,
        session: &str,
        stage: &str,
        value: &T,
    ) -> Result<(), PipelineError> {
        self.store
            .write_json(session, &Layout::tool_output(stage), value)
            .await?;
        Ok(())
    }

    /// Run the full pipeline for `session`, returning the path (relative to
    /// the session directory) of the final stitched audio file.
    pub async fn run(
        &self,
        session: &str,
        request: PipelineRequest,
        deps: PipelineDeps,
    ) -> Result<PathBuf, PipelineError> {
        match self.run_inner(session, request, deps).await {
            Ok(path) => Ok(path),
            Err(e) => {
                self.set_error(session, "pipeline", &e).await;
                Err(e)
            }
        }
    }

    async fn run_inner(
        &self,
        session: &str,
        request: PipelineRequest,
        mut deps: PipelineDeps,
    ) -> Result<PathBuf, PipelineError> {
        let session_dir = self.store.session_dir(session);

        // --- ingesting ---
        self.set_status(session, "ingesting", 5, "fetching source audio").await?;
        let audio_rel = Layout::audio("original", "wav");
        let audio_path = session_dir.join(&audio_rel);

        match &request.source {
            AudioSource::Upload(path) => {
                let pcm = deps.media.decode(path)?;
                deps.media.encode(&pcm, &audio_path, AudioFormat::Wav)?;
            }
            AudioSource::Url(url) => {
                ingest::ingest(
                    url,
                    &audio_path,
                    std::mem::take(&mut deps.youtube_strategies),
                    std::mem::take(&mut deps.instagram_strategies),
                )
                .await?;
            }
        }
        self.record_provenance(session, "ingesting", &json!({"audio_path": audio_rel})).await?;
        info!(session, "ingest stage complete");

        // --- separated ---
        self.set_status(session, "separated", 15, "separating vocal and background stems").await?;
        let vocals_rel = Layout::audio("vocals", "wav");
        let vocals_path = session_dir.join(&vocals_rel);
        let background_rel = Layout::background_stem();
        let background_path = session_dir.join(&background_rel);

        let separation_metadata = separation::separate(
            deps.separator.as_ref(),
            &deps.media,
            &audio_path,
            &session_dir,
            &vocals_path,
            &background_path,
        )?;
        self.store
            .write_json(session, &Layout::separation_metadata(), &separation_metadata)
            .await?;
        self.record_provenance(session, "separated", &separation_metadata).await?;
        info!(
            session,
            has_significant_background = separation_metadata.has_significant_background,
            "separation stage complete"
        );

        // --- diarized ---
        self.set_status(session, "diarized", 30, "transcribing speech regions").await?;
        let mut diarization = transcribe::transcribe(
            deps.transcription_provider.as_ref(),
            &deps.media,
            &vocals_path,
            &request.vad_config,
        )
        .await?;
        diarization.language_code = Some(request.source_language.clone());
        self.store.write_json(session, &Layout::diarization(), &diarization).await?;
        let csv_bytes = session::build_diarization_csv(&diarization.segments)
            .map_err(|e| SessionError::Io {
                session: session.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            })?;
        self.store
            .write_artifact_bytes(session, &Layout::diarization_csv(), csv_bytes)
            .await?;
        self.record_provenance(session, "diarized", &diarization).await?;
        info!(session, segments = diarization.segments.len(), "diarization stage complete");

        // --- translated ---
        self.set_status(session, "translated", 50, "translating segments").await?;
        let translated = translation::translate(
            deps.translation_backend.as_ref(),
            diarization,
            &request.source_language,
            &request.target_language,
        )
        .await?;
        self.store
            .write_json(session, &Layout::diarization_translated(), &translated)
            .await?;
        self.record_provenance(session, "translated", &translated).await?;
        info!(session, "translation stage complete");

        // --- merged ---
        self.set_status(session, "merged", 60, "merging adjacent same-speaker segments").await?;
        let merged = merger::build_merged_diarization(&translated.segments, request.max_silence_ms);
        self.store
            .write_json(session, &Layout::diarization_translated_merged(), &merged)
            .await?;
        self.record_provenance(session, "merged", &merged).await?;
        info!(
            session,
            original = merged.original_segment_count,
            merged = merged.merged_segment_count,
            "merge stage complete"
        );

        // --- synthesized ---
        self.set_status(session, "synthesized", 70, "synthesizing speech per segment").await?;
        let mut synthesis_ok = Vec::with_capacity(merged.merged_segments.len());
        for segment in &merged.merged_segments {
            let (provider, voice_id) =
                tts::resolve_voice(&segment.speaker, &request.target_language, &request.speaker_voice_map);
            let backend = deps.tts_backends.get(&provider).ok_or_else(|| {
                TtsError::NoVoice {
                    speaker: segment.speaker.clone(),
                }
            })?;

            let dest_rel = Layout::synthesis_segment(&segment.segment_id);
            let dest = session_dir.join(&dest_rel);
            let text = translation::text_for_synthesis(segment.translated_text.as_deref());
            let ok = tts::synthesize_segment_or_silence(
                &deps.media,
                backend.as_ref(),
                &text,
                &voice_id,
                &SynthesisOptions::default(),
                segment.duration(),
                &session_dir,
                &dest,
            )
            .await;
            synthesis_ok.push((segment.segment_id.clone(), dest, ok));
        }
        let synthesis_report: Vec<serde_json::Value> = synthesis_ok
            .iter()
            .map(|(id, _, ok)| json!({"segment_id": id, "ok": ok}))
            .collect();
        self.record_provenance(session, "synthesized", &synthesis_report).await?;
        info!(
            session,
            failures = synthesis_ok.iter().filter(|(_, _, ok)| !*ok).count(),
            "synthesis stage complete"
        );

        // --- aligned ---
        self.set_status(session, "aligned", 85, "time-aligning synthesized clips").await?;
        let mut alignments: Vec<SegmentAlignment> = Vec::with_capacity(merged.merged_segments.len());
        let mut aligned_paths: HashMap<String, PathBuf> = HashMap::new();
        for (segment, (segment_id, synth_path, synth_ok)) in merged.merged_segments.iter().zip(synthesis_ok.iter()) {
            if !*synth_ok {
                alignments.push(align::failed_alignment(segment_id, segment.duration(), "synthesis failed"));
                continue;
            }
            let aligned_rel = Layout::synthesis_segment_aligned(&segment.segment_id);
            let aligned_path = session_dir.join(&aligned_rel);
            match align::align_segment(&deps.media, segment_id, synth_path, &aligned_path, segment.duration()) {
                Ok(record) => {
                    aligned_paths.insert(segment_id.clone(), aligned_path);
                    alignments.push(record);
                }
                Err(e) => {
                    warn!(session, segment_id, error = %e, "segment alignment failed");
                    alignments.push(align::failed_alignment(segment_id, segment.duration(), &e.to_string()));
                }
            }
        }
        let alignment_metadata = build_alignment_metadata(alignments);
        self.store
            .write_json(session, &Layout::alignment_metadata(), &alignment_metadata)
            .await?;
        self.record_provenance(session, "aligned", &alignment_metadata).await?;
        info!(
            session,
            successful = alignment_metadata.global_stats.successful,
            failed = alignment_metadata.global_stats.failed,
            "alignment stage complete"
        );

        // --- stitched ---
        self.set_status(session, "stitched", 95, "stitching final output").await?;
        let mut clips = Vec::with_capacity(aligned_paths.len());
        for segment in &merged.merged_segments {
            if let Some(path) = aligned_paths.get(&segment.segment_id) {
                let pcm = deps.media.decode(path)?;
                clips.push(PlacedClip {
                    start_time: segment.start_time,
                    audio: pcm,
                });
            }
        }

        let original_duration = deps.media.probe_duration(&audio_path).ok();
        let background_pcm = if request.preserve_background_music && separation_metadata.has_significant_background {
            Some(deps.media.decode(&background_path)?)
        } else {
            None
        };
        let background = background_pcm.as_ref().map(|pcm| (pcm, &separation_metadata));

        let canvas = stitch::stitch(
            &deps.media,
            clips,
            original_duration,
            background,
            request.preserve_background_music,
        )?;

        let timestamp = chrono::Utc::now().timestamp();
        let final_rel = Layout::final_output(timestamp);
        let final_path = session_dir.join(&final_rel);
        deps.media.encode(&canvas, &final_path, AudioFormat::Wav)?;
        self.record_provenance(session, "stitched", &json!({"final_output": final_rel})).await?;

        // --- completed ---
        self.set_status(session, "completed", 100, "pipeline complete").await?;
        info!(session, output = %final_rel.display(), "pipeline complete");

        Ok(final_rel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SeparationError, TranscriberError};
    use crate::transcribe::ProviderSegment;
    use crate::tts::SynthesisOptions as Opts;
    use async_trait::async_trait;
    use std::path::Path;

    struct FakeSeparator;

    impl StemSeparatorBackend for FakeSeparator {
        fn separate(&self, input: &Path, work_dir: &Path) -> Result<(PathBuf, PathBuf), SeparationError> {
            let media = FfmpegMedia;
            let input_pcm = media.decode(input).unwrap();
            let vocals = work_dir.join("vocals_src.wav");
            let background = work_dir.join("background_src.wav");
            media.encode(&input_pcm, &vocals, AudioFormat::Wav).unwrap();
            media
                .encode(&media.silence(1.0), &background, AudioFormat::Wav)
                .unwrap();
            Ok((vocals, background))
        }
    }

    struct FakeTranscriber;

    #[async_trait]
    impl TranscriptionProvider for FakeTranscriber {
        async fn transcribe_region(
            &self,
            _pcm: &crate::media::Pcm,
            region: crate::transcribe::vad::SpeechRegion,
        ) -> anyhow::Result<(Vec<ProviderSegment>, Option<String>)> {
            Ok((
                vec![ProviderSegment {
                    speaker: "SPEAKER_00".to_string(),
                    start: region.start,
                    end: region.end,
                    text: "hello there".to_string(),
                    gender: Some("Female".to_string()),
                }],
                Some("hi-IN".to_string()),
            ))
        }
    }

    struct FakeTranslator;

    #[async_trait]
    impl TranslationBackend for FakeTranslator {
        async fn complete(&self, _system_prompt: &str, _user_text: &str, _temperature: f32) -> anyhow::Result<String> {
            Ok("namaste".to_string())
        }
    }

    struct FakeTts;

    #[async_trait]
    impl TtsBackend for FakeTts {
        fn name(&self) -> &'static str {
            "fake"
        }
        async fn synthesize_chunk(&self, _text: &str, _voice_id: &str, _options: &Opts) -> anyhow::Result<Vec<u8>> {
            let media = FfmpegMedia;
            let pcm = media.silence(0.5);
            let tmp = std::env::temp_dir().join(format!("orch_{}.wav", uuid::Uuid::new_v4().simple()));
            media.encode(&pcm, &tmp, AudioFormat::Wav).unwrap();
            let bytes = std::fs::read(&tmp).unwrap();
            let _ = std::fs::remove_file(&tmp);
            Ok(bytes)
        }
    }

    fn deps() -> PipelineDeps {
        let mut tts_backends: HashMap<String, Box<dyn TtsBackend>> = HashMap::new();
        tts_backends.insert("sarvam".to_string(), Box::new(FakeTts));
        tts_backends.insert("cartesia".to_string(), Box::new(FakeTts));

        PipelineDeps {
            media: FfmpegMedia,
            youtube_strategies: vec![],
            instagram_strategies: vec![],
            separator: Box::new(FakeSeparator),
            transcription_provider: Box::new(FakeTranscriber),
            translation_backend: Box::new(FakeTranslator),
            tts_backends,
        }
    }

    #[tokio::test]
    async fn runs_full_pipeline_for_an_upload() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::new(tmp.path());
        let session = store.create_session(None).await.unwrap();
        let orchestrator = Orchestrator::new(store.clone());

        let upload_dir = tempfile::tempdir().unwrap();
        let upload_path = upload_dir.path().join("input.wav");
        let media = FfmpegMedia;
        let mut samples = vec![0i16; 16_000 / 2];
        samples.extend(std::iter::repeat(5_000i16).take(16_000 * 2));
        samples.extend(std::iter::repeat(0i16).take(16_000 / 2));
        let speech_pcm = crate::media::Pcm { sample_rate: 16_000, samples };
        media.encode(&speech_pcm, &upload_path, AudioFormat::Wav).unwrap();

        let request = PipelineRequest {
            source: AudioSource::Upload(upload_path),
            source_language: "hi-IN".to_string(),
            target_language: "tamil".to_string(),
            preserve_background_music: false,
            speaker_voice_map: SpeakerVoiceMap::new(),
            max_silence_ms: 500,
            vad_config: VadConfig::default(),
        };

        let result = orchestrator.run(&session, request, deps()).await;
        assert!(result.is_ok(), "pipeline run failed: {:?}", result.err());

        let final_rel = result.unwrap();
        let final_path = store.session_dir(&session).join(&final_rel);
        assert!(final_path.exists());
    }

    #[tokio::test]
    async fn halts_with_fatal_error_when_no_speech_detected() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::new(tmp.path());
        let session = store.create_session(None).await.unwrap();
        let orchestrator = Orchestrator::new(store.clone());

        let upload_dir = tempfile::tempdir().unwrap();
        let upload_path = upload_dir.path().join("input.wav");
        let media = FfmpegMedia;
        media
            .encode(&media.silence(1.0), &upload_path, AudioFormat::Wav)
            .unwrap();

        let request = PipelineRequest {
            source: AudioSource::Upload(upload_path),
            source_language: "hi-IN".to_string(),
            target_language: "tamil".to_string(),
            preserve_background_music: false,
            speaker_voice_map: SpeakerVoiceMap::new(),
            max_silence_ms: 500,
            vad_config: VadConfig::default(),
        };

        let result = orchestrator.run(&session, request, deps()).await;
        assert!(matches!(
            result,
            Err(PipelineError::Transcriber(TranscriberError::NoSpeech))
        ));
    }
}
