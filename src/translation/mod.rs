//! Context-aware segment translation (C7).

pub mod provider;
pub mod translator;
pub mod types;

pub use provider::{HttpTranslationBackend, TranslationBackend};
pub use translator::{
    back_translate, text_for_synthesis, translate, translate_diarization_json, CONTEXT_WINDOW,
    TRANSLATION_ERROR_PREFIX,
};
