//! Context-aware segment translation (C7).
//!
//! Two entry points exist, both grounded in the same original behavior:
//! [`translate`] is the per-segment, context-windowed path used for normal
//! dubbing runs; [`translate_diarization_json`] is the chunked,
//! structured-output path used when a caller wants one validated JSON
//! response for the whole diarization.

use futures_util::stream::{self, StreamExt};

use crate::error::TranslatorError;
use crate::session::{Diarization, Segment};

use super::provider::{extract_json_from_response, TranslationBackend};
use super::types::validate_translation_json;

/// How many segments' context to include. The same window feeds both
/// "any previous speaker" and "same speaker" context.
pub const CONTEXT_WINDOW: usize = 3;
/// Bounded fan-out for concurrent per-segment translation calls.
const CONCURRENCY: usize = 4;
/// Chunk size used once a diarization's structured-output call is split.
const CHUNK_SIZE: usize = 10;
/// Threshold above which a full-diarization call is chunked.
const CHUNK_THRESHOLD: usize = 30;

const TEMPERATURE: f32 = 0.2;

struct Context<'a> {
    previous: Vec<&'a Segment>,
    same_speaker_previous: Vec<&'a Segment>,
}

fn build_context<'a>(index: usize, segments: &'a [Segment]) -> Context<'a> {
    let start = index.saturating_sub(CONTEXT_WINDOW);
    let previous = segments[start..index].iter().collect();

    let speaker = &segments[index].speaker;
    let same_speaker_previous = segments[..index]
        .iter()
        .filter(|s| &s.speaker == speaker)
        .rev()
        .take(CONTEXT_WINDOW)
        .collect();

    Context {
        previous,
        same_speaker_previous,
    }
}

fn build_prompt(segment: &Segment, context: &Context, source_lang: &str, target_lang: &str) -> String {
    let mut prompt = format!(
        "You are a professional translator specializing in {source_lang} to {target_lang} translation.\n\n\
         Translate the following segment from {source_lang} to {target_lang}.\n\n\
         IMPORTANT GUIDELINES:\n\
         - Preserve all English words, technical terms, and proper nouns\n\
         - Maintain the original tone and intent\n\
         - Use modern, colloquial language that sounds natural\n\n"
    );

    if !context.previous.is_empty() {
        prompt.push_str("Previous segments:\n");
        for seg in &context.previous {
            prompt.push_str(&format!("- Speaker {}: {}\n", seg.speaker, seg.text));
        }
        prompt.push('\n');
    }
    if !context.same_speaker_previous.is_empty() {
        prompt.push_str(&format!("Earlier lines from speaker {}:\n", segment.speaker));
        for seg in &context.same_speaker_previous {
            prompt.push_str(&format!("- {}\n", seg.text));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "SEGMENT TO TRANSLATE:\nSpeaker {}: {}\n\nRespond with ONLY the translated text, nothing else.",
        segment.speaker, segment.text
    ));
    prompt
}

async fn translate_one(
    backend: &dyn TranslationBackend,
    segment: &Segment,
    context: Context<'_>,
    source_lang: &str,
    target_lang: &str,
) -> Result<String, TranslatorError> {
    let prompt = build_prompt(segment, &context, source_lang, target_lang);
    backend
        .complete(&prompt, &segment.text, TEMPERATURE)
        .await
        .map(|t| t.trim().to_string())
        .map_err(|e| TranslatorError::ProviderError(e.to_string()))
}

/// Translate every segment of `diarization` using a windowed-context prompt
/// per segment. Failures are non-fatal: a failed segment keeps its source
/// text and gets an error-marker translation; the call only fails if every
/// segment failed.
pub async fn translate(
    backend: &dyn TranslationBackend,
    mut diarization: Diarization,
    source_lang: &str,
    target_lang: &str,
) -> Result<Diarization, TranslatorError> {
    let segments_snapshot = diarization.segments.clone();

    let results: Vec<(usize, Result<String, TranslatorError>)> = stream::iter(
        segments_snapshot.iter().enumerate().map(|(i, seg)| {
            let context = build_context(i, &segments_snapshot);
            async move {
                let r = translate_one(backend, seg, context, source_lang, target_lang).await;
                (i, r)
            }
        }),
    )
    .buffer_unordered(CONCURRENCY)
    .collect()
    .await;

    let mut by_index: Vec<Option<Result<String, TranslatorError>>> =
        (0..segments_snapshot.len()).map(|_| None).collect();
    for (i, r) in results {
        by_index[i] = Some(r);
    }

    let mut successes = 0;
    for (i, slot) in by_index.into_iter().enumerate() {
        match slot.expect("every index produced a result") {
            Ok(text) => {
                diarization.segments[i].translated_text = Some(text);
                successes += 1;
            }
            Err(e) => {
                diarization.segments[i].translated_text =
                    Some(format!("[Translation error: {e}]"));
            }
        }
    }

    if successes == 0 {
        return Err(TranslatorError::TotalFailure);
    }

    diarization.target_language = Some(target_lang.to_string());
    Ok(diarization)
}

/// Marker prefix written into `translated_text` when a segment's translation
/// call failed; downstream stages (synthesis) must treat it as empty text.
pub const TRANSLATION_ERROR_PREFIX: &str = "[Translation error";

/// Text to hand to TTS for a segment: the translation, or empty if the
/// segment carries an error marker instead of a real translation.
pub fn text_for_synthesis(translated_text: Option<&str>) -> String {
    match translated_text {
        Some(t) if !t.starts_with(TRANSLATION_ERROR_PREFIX) => t.to_string(),
        _ => String::new(),
    }
}

/// Translate a whole diarization as one or more structured-output calls,
/// validating the `{transcript, segments:[{text}]}` shape and retrying
/// with feedback on malformed responses. Diarizations over
/// [`CHUNK_THRESHOLD`] segments are split into chunks of [`CHUNK_SIZE`].
pub async fn translate_diarization_json(
    backend: &dyn TranslationBackend,
    diarization: &Diarization,
    source_lang: &str,
    target_lang: &str,
    max_retries: u32,
) -> Result<Vec<String>, TranslatorError> {
    let chunks: Vec<&[Segment]> = if diarization.segments.len() > CHUNK_THRESHOLD {
        diarization.segments.chunks(CHUNK_SIZE).collect()
    } else {
        vec![diarization.segments.as_slice()]
    };

    let mut translated_texts = Vec::with_capacity(diarization.segments.len());
    for chunk in chunks {
        let texts = translate_chunk_with_retries(backend, chunk, source_lang, target_lang, max_retries).await?;
        translated_texts.extend(texts);
    }
    Ok(translated_texts)
}

async fn translate_chunk_with_retries(
    backend: &dyn TranslationBackend,
    chunk: &[Segment],
    source_lang: &str,
    target_lang: &str,
    max_retries: u32,
) -> Result<Vec<String>, TranslatorError> {
    let input_json = serde_json::json!({
        "transcript": chunk.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join(" "),
        "segments": chunk.iter().map(|s| serde_json::json!({"text": s.text})).collect::<Vec<_>>(),
    });

    let base_prompt = format!(
        "Translate this diarized transcript from {source_lang} to {target_lang}. \
         Respond with JSON only: a \"transcript\" string and a \"segments\" array \
         whose entries each have a \"text\" field, in the same order as the input."
    );

    let mut attempt = 0;
    let mut last_error = String::new();
    let mut prompt = base_prompt.clone();

    loop {
        let response = backend
            .complete(&prompt, &input_json.to_string(), TEMPERATURE)
            .await
            .map_err(|e| TranslatorError::ProviderError(e.to_string()))?;

        let json_text = extract_json_from_response(&response);
        match serde_json::from_str::<serde_json::Value>(&json_text) {
            Ok(value) => match validate_translation_json(&value) {
                Ok(()) => {
                    let segments = value["segments"].as_array().expect("validated above");
                    if segments.len() != chunk.len() {
                        last_error = format!(
                            "expected {} segments, got {}",
                            chunk.len(),
                            segments.len()
                        );
                    } else {
                        return Ok(segments
                            .iter()
                            .map(|s| s["text"].as_str().unwrap_or_default().to_string())
                            .collect());
                    }
                }
                Err(e) => last_error = e,
            },
            Err(e) => last_error = format!("failed to parse as JSON: {e}"),
        }

        attempt += 1;
        if attempt > max_retries {
            return Err(TranslatorError::ValidationFailed {
                segment_id: chunk.first().map(|s| s.segment_id.clone()).unwrap_or_default(),
                attempts: attempt,
                reason: last_error,
            });
        }
        prompt = format!(
            "{base_prompt}\n\nYour previous response was invalid: {last_error}\n\
             Respond again with valid JSON containing \"transcript\" and \"segments\"."
        );
    }
}

/// Diagnostic-only back-translation of already-translated text toward the
/// original language, for spot-checking. Never called by the orchestrator.
pub async fn back_translate(
    backend: &dyn TranslationBackend,
    diarization: &Diarization,
    original_language: &str,
) -> Result<Vec<String>, TranslatorError> {
    let mut out = Vec::with_capacity(diarization.segments.len());
    for segment in &diarization.segments {
        let Some(translated) = segment.translated_text.as_deref() else {
            out.push(String::new());
            continue;
        };
        let prompt = format!(
            "Translate this text back to {original_language} for a quality check. \
             Respond with ONLY the translated text."
        );
        let result = backend
            .complete(&prompt, translated, TEMPERATURE)
            .await
            .map_err(|e| TranslatorError::ProviderError(e.to_string()))?;
        out.push(result.trim().to_string());
    }
    Ok(out)
}
