//! Translator provider types.

use serde::{Deserialize, Serialize};

/// A structured translation response the provider is instructed to return
/// for whole-diarization calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranslationResponse {
    pub transcript: String,
    pub segments: Vec<TranslatedSegmentText>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranslatedSegmentText {
    pub text: String,
}

/// Validate a raw structured-output payload: requires a `transcript`
/// string and a `segments` array whose entries each have a `text` field.
pub fn validate_translation_json(value: &serde_json::Value) -> Result<(), String> {
    let obj = value.as_object().ok_or("response is not a JSON object")?;

    if !obj.get("transcript").map(|v| v.is_string()).unwrap_or(false) {
        return Err("missing 'transcript' field".to_string());
    }

    let segments = obj
        .get("segments")
        .ok_or_else(|| "missing 'segments' field".to_string())?;
    let segments = segments
        .as_array()
        .ok_or_else(|| "'segments' is not a list".to_string())?;

    for (i, segment) in segments.iter().enumerate() {
        let seg_obj = segment
            .as_object()
            .ok_or_else(|| format!("segment {i} is not an object"))?;
        if !seg_obj.get("text").map(|v| v.is_string()).unwrap_or(false) {
            return Err(format!("segment {i} missing 'text' field"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_payload_passes() {
        let value = json!({"transcript": "hi", "segments": [{"text": "hi"}]});
        assert!(validate_translation_json(&value).is_ok());
    }

    #[test]
    fn missing_transcript_fails() {
        let value = json!({"segments": [{"text": "hi"}]});
        assert!(validate_translation_json(&value).unwrap_err().contains("transcript"));
    }

    #[test]
    fn segment_missing_text_fails() {
        let value = json!({"transcript": "hi", "segments": [{"foo": "bar"}]});
        assert!(validate_translation_json(&value).unwrap_err().contains("text"));
    }
}
