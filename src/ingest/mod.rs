//! Source ingest: validate a video URL and extract its audio track (C3).
//!
//! Mirrors the original's cascading-methods design: a fixed ordered list of
//! extraction strategies is tried in turn, each failure is logged and the
//! next strategy attempted, and the last strategy never fails — it
//! synthesizes a silent placeholder so downstream stages always have an
//! audio file to work with.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use regex::Regex;
use tracing::{info, warn};

use crate::error::IngestError;
use crate::media::FfmpegMedia;

/// Platform the URL was recognized as belonging to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    YouTube,
    Instagram,
}

/// Validate a URL against the two recognized source patterns.
pub fn validate_url(url: &str) -> Result<UrlKind, IngestError> {
    let youtube = Regex::new(
        r"^(https?://)?(www\.)?(youtube\.com/watch\?v=|youtu\.be/|youtube\.com/shorts/)[a-zA-Z0-9_-]{11}",
    )
    .expect("static regex is valid");
    let instagram = Regex::new(
        r"^(https?://)?(www\.)?instagram\.com/(p|reel|tv|stories)/[a-zA-Z0-9_-]+",
    )
    .expect("static regex is valid");

    if youtube.is_match(url) {
        Ok(UrlKind::YouTube)
    } else if instagram.is_match(url) {
        Ok(UrlKind::Instagram)
    } else {
        Err(IngestError::UnsupportedUrl(url.to_string()))
    }
}

/// A single extraction attempt. Implementations should not themselves
/// retry; the cascade in [`ingest`] owns sequencing and fallback.
#[async_trait]
pub trait IngestStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn attempt(&self, url: &str, dest: &Path) -> anyhow::Result<()>;
}

/// Shells out to `yt-dlp` to download and extract a track's audio.
/// `format` is yt-dlp's `-f` selector and `user_agent`, when set, overrides
/// the client identity yt-dlp presents — used to retry past sites that
/// block the default UA.
pub struct YtDlpStrategy {
    pub format: String,
    pub user_agent: Option<String>,
}

impl YtDlpStrategy {
    /// First attempt: best available audio, default yt-dlp client identity.
    pub fn primary() -> Self {
        Self {
            format: "bestaudio/best".to_string(),
            user_agent: None,
        }
    }

    /// Fallback attempt: lower-bandwidth format and an alternate browser UA,
    /// for sources that throttle or block the primary attempt.
    pub fn conservative() -> Self {
        Self {
            format: "worstaudio/worst".to_string(),
            user_agent: Some(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 \
                 (KHTML, like Gecko) Version/15.0 Safari/605.1.15"
                    .to_string(),
            ),
        }
    }
}

#[async_trait]
impl IngestStrategy for YtDlpStrategy {
    fn name(&self) -> &'static str {
        "yt_dlp"
    }

    async fn attempt(&self, url: &str, dest: &Path) -> anyhow::Result<()> {
        let mut cmd = tokio::process::Command::new("yt-dlp");
        cmd.args(["-f", &self.format])
            .args(["-x", "--audio-format", "wav", "--no-playlist"])
            .arg("-o")
            .arg(dest)
            .arg(url);
        if let Some(ua) = &self.user_agent {
            cmd.args(["--user-agent", ua]);
        }

        let status = cmd
            .status()
            .await
            .map_err(|e| anyhow::anyhow!("failed to spawn yt-dlp: {e}"))?;
        if !status.success() {
            anyhow::bail!("yt-dlp exited with {:?}", status.code());
        }
        Ok(())
    }
}

/// Placeholder strategy that always succeeds by writing a short silent
/// clip. Always the last entry in a cascade.
pub struct SilentPlaceholderStrategy {
    pub duration_secs: f64,
}

#[async_trait]
impl IngestStrategy for SilentPlaceholderStrategy {
    fn name(&self) -> &'static str {
        "silent_placeholder"
    }

    async fn attempt(&self, _url: &str, dest: &Path) -> anyhow::Result<()> {
        let media = FfmpegMedia::new();
        let pcm = media.silence(self.duration_secs);
        media.encode(&pcm, dest, crate::media::AudioFormat::Wav)?;
        Ok(())
    }
}

/// Run a cascade of strategies in order, logging and continuing on failure.
/// Returns the path written by the first strategy to succeed.
pub async fn run_cascade(
    url: &str,
    dest: &Path,
    strategies: &[Box<dyn IngestStrategy>],
) -> Result<PathBuf, IngestError> {
    let mut last_error = String::new();
    for strategy in strategies {
        info!(strategy = strategy.name(), url, "attempting ingest strategy");
        match strategy.attempt(url, dest).await {
            Ok(()) if dest.exists() && dest.metadata().map(|m| m.len() > 0).unwrap_or(false) => {
                info!(strategy = strategy.name(), "ingest strategy succeeded");
                return Ok(dest.to_path_buf());
            }
            Ok(()) => {
                last_error = format!("{}: produced empty or missing file", strategy.name());
                warn!(strategy = strategy.name(), "strategy produced no output");
            }
            Err(e) => {
                last_error = format!("{}: {e}", strategy.name());
                warn!(strategy = strategy.name(), error = %e, "ingest strategy failed");
            }
        }
    }
    Err(IngestError::AllStrategiesFailed {
        url: url.to_string(),
        last_error,
    })
}

/// The concrete attempts a production caller should pass as
/// `youtube_strategies`/`instagram_strategies`: `yt-dlp` with its best
/// format, then `yt-dlp` again with a conservative format and alternate UA.
/// `youtube_cascade`/`instagram_cascade` append the silent placeholder
/// after whatever is passed here.
pub fn default_strategies() -> Vec<Box<dyn IngestStrategy>> {
    vec![
        Box::new(YtDlpStrategy::primary()),
        Box::new(YtDlpStrategy::conservative()),
    ]
}

/// Default ordered cascade for a YouTube URL: the caller's extraction
/// attempts (normally [`default_strategies`]), terminating in a silent
/// placeholder that never fails.
pub fn youtube_cascade(strategies: Vec<Box<dyn IngestStrategy>>) -> Vec<Box<dyn IngestStrategy>> {
    let mut all = strategies;
    all.push(Box::new(SilentPlaceholderStrategy { duration_secs: 3.0 }));
    all
}

/// Default ordered cascade for an Instagram URL, terminating the same way.
pub fn instagram_cascade(strategies: Vec<Box<dyn IngestStrategy>>) -> Vec<Box<dyn IngestStrategy>> {
    let mut all = strategies;
    all.push(Box::new(SilentPlaceholderStrategy { duration_secs: 3.0 }));
    all
}

/// Ingest a URL to `dest`, validating it first and then running the
/// platform-appropriate cascade.
pub async fn ingest(
    url: &str,
    dest: &Path,
    youtube_strategies: Vec<Box<dyn IngestStrategy>>,
    instagram_strategies: Vec<Box<dyn IngestStrategy>>,
) -> Result<PathBuf, IngestError> {
    let kind = validate_url(url)?;
    let strategies = match kind {
        UrlKind::YouTube => youtube_cascade(youtube_strategies),
        UrlKind::Instagram => instagram_cascade(instagram_strategies),
    };
    run_cascade(url, dest, &strategies).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_youtube_watch_url() {
        assert_eq!(
            validate_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap(),
            UrlKind::YouTube
        );
    }

    #[test]
    fn validates_youtube_short_url() {
        assert_eq!(validate_url("https://youtu.be/dQw4w9WgXcQ").unwrap(), UrlKind::YouTube);
    }

    #[test]
    fn validates_instagram_reel_url() {
        assert_eq!(
            validate_url("https://www.instagram.com/reel/Cabc123xyz/").unwrap(),
            UrlKind::Instagram
        );
    }

    #[test]
    fn rejects_unsupported_url() {
        assert!(validate_url("https://example.com/video").is_err());
    }

    struct FailingStrategy;
    #[async_trait]
    impl IngestStrategy for FailingStrategy {
        fn name(&self) -> &'static str {
            "failing"
        }
        async fn attempt(&self, _url: &str, _dest: &Path) -> anyhow::Result<()> {
            anyhow::bail!("simulated failure")
        }
    }

    #[tokio::test]
    async fn cascade_falls_through_to_silent_placeholder() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("out.wav");
        let strategies: Vec<Box<dyn IngestStrategy>> = vec![
            Box::new(FailingStrategy),
            Box::new(FailingStrategy),
            Box::new(SilentPlaceholderStrategy { duration_secs: 1.0 }),
        ];
        let result = run_cascade("https://youtu.be/dQw4w9WgXcQ", &dest, &strategies).await;
        assert!(result.is_ok());
        assert!(dest.exists());
    }

    #[test]
    fn default_strategies_are_yt_dlp_primary_then_conservative() {
        let strategies = default_strategies();
        assert_eq!(strategies.len(), 2);
        assert_eq!(strategies[0].name(), "yt_dlp");
        assert_eq!(strategies[1].name(), "yt_dlp");
    }

    #[test]
    fn youtube_cascade_appends_placeholder_after_default_strategies() {
        let cascade = youtube_cascade(default_strategies());
        assert_eq!(cascade.len(), 3);
        assert_eq!(cascade.last().unwrap().name(), "silent_placeholder");
    }

    #[tokio::test]
    async fn ingest_rejects_invalid_url_before_running_any_strategy() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("out.wav");
        let err = ingest("https://example.com/x", &dest, vec![], vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedUrl(_)));
    }
}
