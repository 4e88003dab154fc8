//! OpenAI chat completions backend.

use serde_json::{Value, json};

use super::http::JsonClient;
use super::{LlmError, LlmProvider, ModelResponse, ProviderConfig};

pub struct OpenAiProvider {
    config: ProviderConfig,
    api_key: String,
    client: JsonClient,
}

impl OpenAiProvider {
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
            "model": self.config.model,
            "messages": [{ "role": "user", "content": prompt }],
            "response_format": { "type": "json_object" },
            "temperature": 0.2,
        })
    }
}

fn parse_reply(json: &Value) -> Result<ModelResponse, LlmError> {
    let choice = &json["choices"][0];
    let text = choice["message"]["content"]
        .as_str()
        .ok_or_else(|| LlmError::ParseError {
            message: "missing choices[0].message.content".into(),
        })?;
    Ok(ModelResponse {
        text: text.to_string(),
        stopped_at_limit: choice["finish_reason"].as_str() == Some("length"),
    })
}

impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn generate_content(&self, prompt: &str) -> Result<ModelResponse, LlmError> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);
        let auth = format!("Bearer {}", self.api_key);
        let json = self
            .client
            .post(&url, &[("Authorization", auth.as_str())], &self.request_body(prompt))?;
        parse_reply(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_choice() {
        let reply = parse_reply(&json!({
            "choices": [{
                "message": { "role": "assistant", "content": "{\"triples\": []}" },
                "finish_reason": "stop"
            }]
        }))
        .unwrap();
        assert_eq!(reply.text, "{\"triples\": []}");
        assert!(!reply.stopped_at_limit);
    }

    #[test]
    fn missing_content_is_parse_error() {
        assert!(matches!(
            parse_reply(&json!({"choices": []})),
            Err(LlmError::ParseError { .. })
        ));
    }
}
