//! Voice routing and speech synthesis (C9).

pub mod provider;
pub mod router;
pub mod synthesizer;
pub mod types;

pub use provider::{HttpTtsBackend, TtsBackend};
pub use router::{list_voices, resolve_voice, route_provider};
pub use synthesizer::{chunk_text, synthesize_segment, synthesize_segment_or_silence};
pub use types::{SpeakerVoiceMap, SynthesisOptions, Voice, VoiceCatalogue};
