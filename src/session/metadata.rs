//! Append-only metadata writer.
//!
//! Every mutation is a load -> merge -> save cycle under the session's
//! exclusive lock, and every changed field is written to both the tracing
//! span and the session's `metadata_log.txt`. This is the direct
//! replacement for the recurring bug class where a later write silently
//! dropped an earlier field such as `preserve_background_music`.

use serde_json::{Map, Value};
use tracing::info;

use crate::error::SessionError;

use super::layout::Layout;
use super::store::SessionStore;
use super::types::SessionMetadata;

async fn load(store: &SessionStore, session: &str) -> Result<Map<String, Value>, SessionError> {
    if !store.session_exists(session).await {
        return Err(SessionError::NotFound(session.to_string()));
    }
    match store.read_json::<Value>(session, &Layout::metadata()).await {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Ok(Map::new()),
        Err(SessionError::ArtifactNotFound { .. }) => Ok(Map::new()),
        Err(e) => Err(e),
    }
}

async fn save(
    store: &SessionStore,
    session: &str,
    metadata: &Map<String, Value>,
) -> Result<(), SessionError> {
    store
        .write_json(session, &Layout::metadata(), &Value::Object(metadata.clone()))
        .await
}

async fn log_change(store: &SessionStore, session: &str, field: &str, old: &Value, new: &Value) {
    info!(session, field, ?old, ?new, "metadata field changed");
    let line = format!(
        "{} - Field: {field}, Old: {old}, New: {new}\n",
        chrono::Utc::now().to_rfc3339()
    );
    let _ = store.append_text(session, &Layout::metadata_log(), line).await;
}

/// Set a single top-level field, preserving every other key.
pub async fn update_field(
    store: &SessionStore,
    session: &str,
    field: &str,
    value: Value,
) -> Result<SessionMetadata, SessionError> {
    let guard = store.lock_session(session).await;
    let _permit = guard.lock().await;

    let mut metadata = load(store, session).await?;
    let old = metadata.get(field).cloned().unwrap_or(Value::Null);
    log_change(store, session, field, &old, &value).await;
    metadata.insert(field.to_string(), value);
    save(store, session, &metadata).await?;

    Ok(SessionMetadata {
        fields: metadata.into_iter().collect(),
    })
}

/// Merge `section_data` into the named section, creating it if absent.
/// If the existing value at `section` is not an object, it is wrapped as
/// `{"value": <old>}` before merging, matching the original's fallback.
pub async fn update_section(
    store: &SessionStore,
    session: &str,
    section: &str,
    section_data: Map<String, Value>,
) -> Result<SessionMetadata, SessionError> {
    let guard = store.lock_session(session).await;
    let _permit = guard.lock().await;

    let mut metadata = load(store, session).await?;
    let mut current = match metadata.remove(section) {
        Some(Value::Object(map)) => map,
        Some(other) => {
            let mut wrapped = Map::new();
            wrapped.insert("value".to_string(), other);
            wrapped
        }
        None => Map::new(),
    };

    for (key, value) in section_data {
        let old = current.get(&key).cloned().unwrap_or(Value::Null);
        log_change(store, session, &format!("{section}.{key}"), &old, &value).await;
        current.insert(key, value);
    }

    metadata.insert(section.to_string(), Value::Object(current));
    save(store, session, &metadata).await?;

    Ok(SessionMetadata {
        fields: metadata.into_iter().collect(),
    })
}

/// Merge multiple top-level fields at once.
pub async fn update(
    store: &SessionStore,
    session: &str,
    updates: Map<String, Value>,
) -> Result<SessionMetadata, SessionError> {
    let guard = store.lock_session(session).await;
    let _permit = guard.lock().await;

    let mut metadata = load(store, session).await?;
    for (key, value) in updates {
        let old = metadata.get(&key).cloned().unwrap_or(Value::Null);
        log_change(store, session, &key, &old, &value).await;
        metadata.insert(key, value);
    }
    save(store, session, &metadata).await?;

    Ok(SessionMetadata {
        fields: metadata.into_iter().collect(),
    })
}

pub async fn get_field(
    store: &SessionStore,
    session: &str,
    field: &str,
) -> Result<Option<Value>, SessionError> {
    let metadata = load(store, session).await?;
    Ok(metadata.get(field).cloned())
}

pub async fn get(store: &SessionStore, session: &str) -> Result<SessionMetadata, SessionError> {
    let metadata = load(store, session).await?;
    Ok(SessionMetadata {
        fields: metadata.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn update_field_then_section_then_field_preserves_all_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::new(tmp.path());
        let session = store.create_session(None).await.unwrap();

        update_field(&store, &session, "target_language", json!("hindi"))
            .await
            .unwrap();
        let mut section = Map::new();
        section.insert("has_significant_background".to_string(), json!(true));
        update_section(&store, &session, "audio_separation", section)
            .await
            .unwrap();
        update_field(&store, &session, "preserve_background_music", json!(false))
            .await
            .unwrap();

        let metadata = get(&store, &session).await.unwrap();
        assert_eq!(metadata.get("target_language"), Some(&json!("hindi")));
        assert_eq!(
            metadata.get("preserve_background_music"),
            Some(&json!(false))
        );
        let section = metadata.get_section("audio_separation").unwrap();
        assert_eq!(section.get("has_significant_background"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn update_section_merges_without_clobbering_siblings() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::new(tmp.path());
        let session = store.create_session(None).await.unwrap();

        let mut first = Map::new();
        first.insert("a".to_string(), json!(1));
        update_section(&store, &session, "options", first).await.unwrap();

        let mut second = Map::new();
        second.insert("b".to_string(), json!(2));
        update_section(&store, &session, "options", second).await.unwrap();

        let metadata = get(&store, &session).await.unwrap();
        let section = metadata.get_section("options").unwrap();
        assert_eq!(section.get("a"), Some(&json!(1)));
        assert_eq!(section.get("b"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn get_field_missing_session_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::new(tmp.path());
        let err = get_field(&store, "session_doesnotexist", "x").await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
    }
}
