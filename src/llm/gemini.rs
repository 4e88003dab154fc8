//! Gemini Developer API backend (`generateContent`).

use serde_json::{Value, json};

use super::http::{JsonClient, join_text_parts};
use super::{LlmError, LlmProvider, ModelResponse, ProviderConfig};

const MAX_OUTPUT_TOKENS: u32 = 8192;

pub struct GeminiProvider {
    config: ProviderConfig,
    api_key: String,
    client: JsonClient,
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig, api_key: String) -> Self {
        let client = JsonClient::new(config.timeout_secs);
        Self {
            config,
            api_key,
            client,
        }
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": 0.2,
                "maxOutputTokens": MAX_OUTPUT_TOKENS,
            },
        })
    }
}

fn parse_reply(json: &Value) -> Result<ModelResponse, LlmError> {
    let candidate = &json["candidates"][0];
    let text = join_text_parts(candidate["content"]["parts"].as_array(), "text").ok_or_else(
        || LlmError::ParseError {
            message: "no text parts in candidates[0]".into(),
        },
    )?;
    Ok(ModelResponse {
        text,
        stopped_at_limit: candidate["finishReason"].as_str() == Some("MAX_TOKENS"),
    })
}

impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn generate_content(&self, prompt: &str) -> Result<ModelResponse, LlmError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        );
        let json = self.client.post(
            &url,
            &[("x-goog-api-key", self.api_key.as_str())],
            &self.request_body(prompt),
        )?;
        parse_reply(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ProviderKind;
    use std::collections::HashMap;

    #[test]
    fn body_asks_for_json_mime_type() {
        let config = ProviderConfig::from_env(ProviderKind::Gemini, &HashMap::new());
        let provider = GeminiProvider::new(config, "key".into());
        let body = provider.request_body("text");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "text");
    }

    #[test]
    fn parses_candidate_text() {
        let reply = parse_reply(&json!({
            "candidates": [{
                "content": { "parts": [{ "text": "[]" }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(reply.text, "[]");
        assert!(!reply.stopped_at_limit);
    }

    #[test]
    fn blocked_prompt_is_parse_error() {
        assert!(parse_reply(&json!({"promptFeedback": {"blockReason": "SAFETY"}})).is_err());
    }
}
