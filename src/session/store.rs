//! Filesystem-backed session store (C2, "Session Store").
//!
//! Every stage reaches the session directory only through this store.
//! Blocking filesystem calls are wrapped in `spawn_blocking`, the same
//! pattern the original codebase used to keep blocking rusqlite calls off
//! the async runtime; here it keeps synchronous `std::fs` calls off it.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task;
use tracing::info;

use crate::error::SessionError;

const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ID_LEN: usize = 10;

/// Root-relative filesystem store for session directories, with a
/// per-session async lock guarding metadata writes.
#[derive(Clone)]
pub struct SessionStore {
    root: PathBuf,
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn session_dir(&self, session: &str) -> PathBuf {
        self.root.join(session)
    }

    fn resolve(&self, session: &str, relpath: &Path) -> PathBuf {
        self.session_dir(session).join(relpath)
    }

    /// Create a new session directory tree, generating an id if none is
    /// given. Returns the session id.
    pub async fn create_session(&self, id: Option<String>) -> Result<String, SessionError> {
        let id = id.unwrap_or_else(generate_session_id);
        let dir = self.session_dir(&id);
        let audio = dir.join("audio");
        let music = dir.join("music");
        let translation = dir.join("translation");
        let synthesis = dir.join("synthesis");
        let tool_outputs = dir.join("tool_outputs");

        task::spawn_blocking(move || -> Result<(), std::io::Error> {
            for d in [&dir, &audio, &music, &translation, &synthesis, &tool_outputs] {
                std::fs::create_dir_all(d)?;
            }
            Ok(())
        })
        .await
        .expect("blocking task panicked")
        .map_err(|source| SessionError::Io {
            session: id.clone(),
            source,
        })?;

        info!(session = %id, "created session directory");
        Ok(id)
    }

    pub async fn session_exists(&self, session: &str) -> bool {
        self.session_dir(session).is_dir()
    }

    pub async fn read_artifact_bytes(
        &self,
        session: &str,
        relpath: &Path,
    ) -> Result<Vec<u8>, SessionError> {
        let path = self.resolve(session, relpath);
        let session_owned = session.to_string();
        let relpath_owned = relpath.to_string_lossy().to_string();
        task::spawn_blocking(move || std::fs::read(&path))
            .await
            .expect("blocking task panicked")
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    SessionError::ArtifactNotFound {
                        session: session_owned,
                        relpath: relpath_owned,
                    }
                } else {
                    SessionError::Io {
                        session: session_owned,
                        source,
                    }
                }
            })
    }

    pub async fn read_json<T: DeserializeOwned + Send + 'static>(
        &self,
        session: &str,
        relpath: &Path,
    ) -> Result<T, SessionError> {
        let bytes = self.read_artifact_bytes(session, relpath).await?;
        serde_json::from_slice(&bytes).map_err(|source| SessionError::Malformed {
            session: session.to_string(),
            source,
        })
    }

    /// Write bytes atomically: write to a sibling temp file, then rename.
    pub async fn write_artifact_bytes(
        &self,
        session: &str,
        relpath: &Path,
        bytes: Vec<u8>,
    ) -> Result<(), SessionError> {
        let path = self.resolve(session, relpath);
        let session_owned = session.to_string();
        task::spawn_blocking(move || atomic_write(&path, &bytes))
            .await
            .expect("blocking task panicked")
            .map_err(|source| SessionError::Io {
                session: session_owned,
                source,
            })
    }

    pub async fn write_json<T: Serialize + Send + Sync>(
        &self,
        session: &str,
        relpath: &Path,
        value: &T,
    ) -> Result<(), SessionError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| SessionError::Malformed {
            session: session.to_string(),
            source,
        })?;
        self.write_artifact_bytes(session, relpath, bytes).await
    }

    /// Append a line to a text artifact (used for `metadata_log.txt`).
    pub async fn append_text(
        &self,
        session: &str,
        relpath: &Path,
        line: String,
    ) -> Result<(), SessionError> {
        let path = self.resolve(session, relpath);
        let session_owned = session.to_string();
        task::spawn_blocking(move || -> std::io::Result<()> {
            let mut f = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            f.write_all(line.as_bytes())
        })
        .await
        .expect("blocking task panicked")
        .map_err(|source| SessionError::Io {
            session: session_owned,
            source,
        })
    }

    /// Acquire the per-session exclusive lock used to serialize metadata
    /// read-merge-write cycles.
    pub async fn lock_session(&self, session: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(session.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("artifact")
        .to_string();
    let tmp = path.with_file_name(format!(
        "{file_name}.tmp-{}",
        rand::thread_rng().gen::<u32>()
    ));
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}

fn generate_session_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("session_{suffix}")
}
