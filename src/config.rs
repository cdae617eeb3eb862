//! Process-wide configuration resolved once at startup from the environment.
//!
//! Mirrors the original implementation's scattered `os.environ.get(...)`
//! reads, collected here into a single typed struct so stages never touch
//! the environment directly.

use std::path::PathBuf;

/// API credentials and filesystem roots, resolved once and threaded through
/// explicitly rather than read from globals at call sites.
#[derive(Debug, Clone)]
pub struct Config {
    pub sarvam_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub cartesia_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub youtube_api_key: Option<String>,
    pub upload_folder: PathBuf,
    pub output_folder: PathBuf,
    pub port: u16,
}

impl Config {
    /// Resolve configuration from the process environment, falling back to
    /// documented defaults for anything unset.
    pub fn from_env() -> Self {
        Self {
            sarvam_api_key: env_opt("SARVAM_API_KEY"),
            gemini_api_key: env_opt("GEMINI_API_KEY"),
            cartesia_api_key: env_opt("CARTESIA_API_KEY"),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            youtube_api_key: env_opt("YOUTUBE_API_KEY"),
            upload_folder: env_path("UPLOAD_FOLDER", "uploads"),
            output_folder: env_path("OUTPUT_FOLDER", "outputs"),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_when_unset() {
        for key in [
            "UPLOAD_FOLDER",
            "OUTPUT_FOLDER",
            "PORT",
            "SARVAM_API_KEY",
        ] {
            std::env::remove_var(key);
        }
        let cfg = Config::from_env();
        assert_eq!(cfg.upload_folder, PathBuf::from("uploads"));
        assert_eq!(cfg.output_folder, PathBuf::from("outputs"));
        assert_eq!(cfg.port, 5000);
        assert!(cfg.sarvam_api_key.is_none());
    }

    #[test]
    #[serial]
    fn reads_present_values() {
        std::env::set_var("PORT", "8080");
        std::env::set_var("SARVAM_API_KEY", "test-key-123");
        let cfg = Config::from_env();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.sarvam_api_key.as_deref(), Some("test-key-123"));
        std::env::remove_var("PORT");
        std::env::remove_var("SARVAM_API_KEY");
    }
}
