//! Anthropic messages API backend.

use serde_json::{Value, json};

use super::http::{JsonClient, join_text_parts};
use super::{LlmError, LlmProvider, ModelResponse, ProviderConfig};

const API_VERSION: &str = "2023-06-01";
const MAX_OUTPUT_TOKENS: u32 = 8192;

pub struct AnthropicProvider {
    config: ProviderConfig,
    api_key: String,
    client: JsonClient,
}

impl AnthropicProvider {
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
            "max_tokens": MAX_OUTPUT_TOKENS,
            "temperature": 0.2,
            "messages": [{ "role": "user", "content": prompt }],
        })
    }
}

fn parse_reply(json: &Value) -> Result<ModelResponse, LlmError> {
    let text = join_text_parts(json["content"].as_array(), "text").ok_or_else(|| {
        LlmError::ParseError {
            message: "no text blocks in response content".into(),
        }
    })?;
    Ok(ModelResponse {
        text,
        stopped_at_limit: json["stop_reason"].as_str() == Some("max_tokens"),
    })
}

impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn generate_content(&self, prompt: &str) -> Result<ModelResponse, LlmError> {
        let url = format!("{}/v1/messages", self.config.base_url);
        let headers = [
            ("x-api-key", self.api_key.as_str()),
            ("anthropic-version", API_VERSION),
        ];
        let json = self.client.post(&url, &headers, &self.request_body(prompt))?;
        parse_reply(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_text_blocks_and_flags_max_tokens() {
        let reply = parse_reply(&json!({
            "content": [
                { "type": "text", "text": "[{\"subject\":\"neo4j\"," },
                { "type": "text", "text": "\"predicate\":\"uses\"" }
            ],
            "stop_reason": "max_tokens"
        }))
        .unwrap();
        assert!(reply.text.starts_with("[{\"subject\":\"neo4j\","));
        assert!(reply.stopped_at_limit);
    }
}
