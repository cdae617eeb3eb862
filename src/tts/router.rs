//! Routes a (target language, speaker) pair to a provider and voice.

use super::types::{SpeakerVoiceMap, Voice, VoiceCatalogue};

/// Default voice used when a session's `speaker_voice_map` has no entry.
pub const DEFAULT_SARVAM_VOICE: &str = "anushka";
pub const DEFAULT_CARTESIA_VOICE: &str = "1982e98c-ab43-4f2c-914f-9741a30a1215";

fn sarvam_voices() -> Vec<Voice> {
    [
        ("anushka", "Anushka", "Female"),
        ("abhilash", "Abhilash", "Male"),
        ("manisha", "Manisha", "Female"),
        ("vidya", "Vidya", "Female"),
        ("arya", "Arya", "Female"),
        ("karun", "Karun", "Male"),
        ("hitesh", "Hitesh", "Male"),
    ]
    .into_iter()
    .map(|(id, name, gender)| Voice {
        provider: "sarvam".into(),
        id: id.into(),
        name: name.into(),
        gender: gender.into(),
    })
    .collect()
}

fn cartesia_voices() -> Vec<Voice> {
    [
        ("1982e98c-ab43-4f2c-914f-9741a30a1215", "Nanna", "Male"),
        ("2bd002c1-209e-48f7-ba51-33901ba577d8", "Madhu", "Male"),
        ("d44a6428-287f-494b-864a-cf818d5fa315", "Budatha", "Male"),
    ]
    .into_iter()
    .map(|(id, name, gender)| Voice {
        provider: "cartesia".into(),
        id: id.into(),
        name: name.into(),
        gender: gender.into(),
    })
    .collect()
}

/// Returns `true` when `target_language` should route to the Cartesia
/// provider (the provider with Hindi-focused voices) instead of the
/// default Sarvam provider.
fn is_hindi(target_language: &str) -> bool {
    matches!(
        target_language.to_lowercase().as_str(),
        "hindi" | "hi" | "hi-in"
    )
}

/// Named provider for a given target language, following the routing rule:
/// Hindi routes to Cartesia, everything else routes to Sarvam.
pub fn route_provider(target_language: &str) -> &'static str {
    if is_hindi(target_language) {
        "cartesia"
    } else {
        "sarvam"
    }
}

/// Resolve the voice id to use for `speaker`, preferring the session's
/// `speaker_voice_map` and falling back to the routed provider's default.
pub fn resolve_voice(
    speaker: &str,
    target_language: &str,
    speaker_voice_map: &SpeakerVoiceMap,
) -> (String, String) {
    let provider = route_provider(target_language).to_string();
    if let Some(voice_id) = speaker_voice_map.get(speaker) {
        return (provider, voice_id.clone());
    }

    let default_voice = match provider.as_str() {
        "cartesia" => DEFAULT_CARTESIA_VOICE,
        _ => DEFAULT_SARVAM_VOICE,
    };
    (provider, default_voice.to_string())
}

/// List known voices across all providers, optionally filtered to a
/// target language. Cartesia voices are only listed when the language is
/// unset or Hindi, matching the upstream catalogue's Hindi-only coverage.
pub fn list_voices(language: Option<&str>) -> VoiceCatalogue {
    let mut catalogue = VoiceCatalogue::new();
    catalogue.insert("sarvam".to_string(), sarvam_voices());

    let include_cartesia = language.map(is_hindi).unwrap_or(true);
    if include_cartesia {
        catalogue.insert("cartesia".to_string(), cartesia_voices());
    }
    catalogue
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_hindi_to_cartesia() {
        assert_eq!(route_provider("hindi"), "cartesia");
        assert_eq!(route_provider("hi-IN"), "cartesia");
    }

    #[test]
    fn routes_other_languages_to_sarvam() {
        assert_eq!(route_provider("tamil"), "sarvam");
        assert_eq!(route_provider("english"), "sarvam");
    }

    #[test]
    fn resolve_voice_uses_override_when_present() {
        let mut map = SpeakerVoiceMap::new();
        map.insert("SPEAKER_00".to_string(), "karun".to_string());
        let (provider, voice) = resolve_voice("SPEAKER_00", "tamil", &map);
        assert_eq!(provider, "sarvam");
        assert_eq!(voice, "karun");
    }

    #[test]
    fn resolve_voice_falls_back_to_provider_default() {
        let map = SpeakerVoiceMap::new();
        let (provider, voice) = resolve_voice("SPEAKER_00", "hindi", &map);
        assert_eq!(provider, "cartesia");
        assert_eq!(voice, DEFAULT_CARTESIA_VOICE);
    }

    #[test]
    fn list_voices_omits_cartesia_for_non_hindi_filter() {
        let catalogue = list_voices(Some("tamil"));
        assert!(catalogue.contains_key("sarvam"));
        assert!(!catalogue.contains_key("cartesia"));
    }

    #[test]
    fn list_voices_includes_both_when_unfiltered() {
        let catalogue = list_voices(None);
        assert!(catalogue.contains_key("sarvam"));
        assert!(catalogue.contains_key("cartesia"));
    }
}
