//! TTS backend abstraction.

use async_trait::async_trait;

use super::types::SynthesisOptions;

/// A provider capable of turning a chunk of text into audio bytes (WAV or
/// MP3; the caller transcodes via the Media Adapter when necessary).
#[async_trait]
pub trait TtsBackend: Send + Sync {
    fn name(&self) -> &'static str;
    async fn synthesize_chunk(
        &self,
        text: &str,
        voice_id: &str,
        options: &SynthesisOptions,
    ) -> anyhow::Result<Vec<u8>>;
}

/// Backend that calls a hosted TTS HTTP endpoint, the shape shared by
/// Sarvam- and Cartesia-style speech synthesis APIs.
pub struct HttpTtsBackend {
    pub client: reqwest::Client,
    pub endpoint: String,
    pub api_key: String,
    pub provider_name: &'static str,
}

#[async_trait]
impl TtsBackend for HttpTtsBackend {
    fn name(&self) -> &'static str {
        self.provider_name
    }

    async fn synthesize_chunk(
        &self,
        text: &str,
        voice_id: &str,
        options: &SynthesisOptions,
    ) -> anyhow::Result<Vec<u8>> {
        let body = serde_json::json!({
            "text": text,
            "voice_id": voice_id,
            "model": options.model,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("api-subscription-key", &self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.bytes().await?.to_vec())
    }
}
