//! Voice catalogue types for the TTS router.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single voice offered by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub provider: String,
    pub id: String,
    pub name: String,
    pub gender: String,
}

/// Voices grouped by provider name.
pub type VoiceCatalogue = HashMap<String, Vec<Voice>>;

/// Per-speaker voice overrides supplied by the orchestrator for a session.
pub type SpeakerVoiceMap = HashMap<String, String>;

/// Provider-specific synthesis options (model name, speaking style, etc.).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthesisOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pace: Option<f64>,
}
