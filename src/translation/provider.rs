//! LLM backend abstraction for segment translation.

use async_trait::async_trait;

/// A single chat-style translation call: system instructions plus the text
/// to translate, returned as raw text (the caller handles JSON extraction
/// when the prompt asked for structured output).
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_text: &str, temperature: f32) -> anyhow::Result<String>;
}

/// Backend that calls a hosted chat-completion endpoint over HTTP, the
/// shape shared by the translation LLM providers this pipeline targets.
pub struct HttpTranslationBackend {
    pub client: reqwest::Client,
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

#[async_trait]
impl TranslationBackend for HttpTranslationBackend {
    async fn complete(&self, system_prompt: &str, user_text: &str, temperature: f32) -> anyhow::Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": temperature,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_text},
            ],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: serde_json::Value = response.json().await?;
        let text = parsed["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("response missing choices[0].message.content"))?;
        Ok(text.to_string())
    }
}

/// Extract JSON from a response that may be wrapped in a fenced code block.
pub fn extract_json_from_response(text: &str) -> String {
    if let Some(rest) = text.split("```json").nth(1) {
        if let Some(json) = rest.split("```").next() {
            return json.trim().to_string();
        }
    }
    if let Some(rest) = text.split("```").nth(1) {
        return rest.trim().to_string();
    }
    text.trim().to_string()
}
