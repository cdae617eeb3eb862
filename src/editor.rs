//! Diarization edit protocol: apply user edits to segment text/speaker
//! while preserving every other field (C6).

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::SessionError;
use crate::session::{Diarization, Layout, SessionStore};

/// Fields a caller may change on a given segment. Absent fields are left
/// untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SegmentEdit {
    pub speaker: Option<String>,
    pub text: Option<String>,
}

/// Apply `updates` (segment_id -> edit) to the session's current
/// diarization, rebuild the transcript, and persist it. Segments not named
/// in `updates` are returned unchanged; fields not named in an edit are
/// preserved on the segments that are.
pub async fn apply_edits(
    store: &SessionStore,
    session: &str,
    updates: HashMap<String, SegmentEdit>,
) -> Result<Diarization, SessionError> {
    let mut diarization: Diarization = store.read_json(session, &Layout::diarization()).await?;

    for segment in diarization.segments.iter_mut() {
        if let Some(edit) = updates.get(&segment.segment_id) {
            if let Some(speaker) = &edit.speaker {
                segment.speaker = speaker.clone();
            }
            if let Some(text) = &edit.text {
                segment.text = text.clone();
            }
        }
    }

    diarization.rebuild_transcript();
    store
        .write_json(session, &Layout::diarization(), &diarization)
        .await?;
    Ok(diarization)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Segment;

    fn seg(id: &str, speaker: &str, text: &str) -> Segment {
        Segment {
            segment_id: id.into(),
            speaker: speaker.into(),
            start_time: 0.0,
            end_time: 1.0,
            text: text.into(),
            translated_text: None,
            language: None,
            gender: None,
            pace: None,
            confidence: None,
        }
    }

    #[tokio::test]
    async fn apply_edits_updates_only_named_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::new(tmp.path());
        let session = store.create_session(None).await.unwrap();

        let diarization = Diarization {
            transcript: "hello world".into(),
            segments: vec![seg("s1", "SPEAKER_00", "hello"), seg("s2", "SPEAKER_01", "world")],
            language_code: Some("hi-IN".into()),
            target_language: None,
        };
        store
            .write_json(&session, &Layout::diarization(), &diarization)
            .await
            .unwrap();

        let mut updates = HashMap::new();
        updates.insert(
            "s1".to_string(),
            SegmentEdit {
                speaker: Some("SPEAKER_02".into()),
                text: None,
            },
        );

        let result = apply_edits(&store, &session, updates).await.unwrap();
        assert_eq!(result.segments[0].speaker, "SPEAKER_02");
        assert_eq!(result.segments[0].text, "hello");
        assert_eq!(result.segments[1].speaker, "SPEAKER_01");
        assert_eq!(result.transcript, "hello world");
    }

    #[tokio::test]
    async fn apply_edits_rebuilds_transcript_after_text_change() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::new(tmp.path());
        let session = store.create_session(None).await.unwrap();

        let diarization = Diarization {
            transcript: "hello world".into(),
            segments: vec![seg("s1", "SPEAKER_00", "hello"), seg("s2", "SPEAKER_00", "world")],
            language_code: None,
            target_language: None,
        };
        store
            .write_json(&session, &Layout::diarization(), &diarization)
            .await
            .unwrap();

        let mut updates = HashMap::new();
        updates.insert(
            "s2".to_string(),
            SegmentEdit {
                speaker: None,
                text: Some("everyone".into()),
            },
        );
        let result = apply_edits(&store, &session, updates).await.unwrap();
        assert_eq!(result.transcript, "hello everyone");
    }
}
