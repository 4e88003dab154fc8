//! Local Ollama backend (`/api/generate` with `format: "json"`).

use std::time::Duration;

use serde_json::{Value, json};

use super::http::JsonClient;
use super::{LlmError, LlmProvider, ModelResponse, ProviderConfig};

/// Client for the Ollama REST API.
pub struct OllamaProvider {
    config: ProviderConfig,
    client: JsonClient,
}

impl OllamaProvider {
    pub fn new(config: ProviderConfig) -> Self {
        let client = JsonClient::new(config.timeout_secs);
        Self { config, client }
    }

    /// Check that the server answers and the configured model is pulled.
    ///
    /// Sends a lightweight request to `/api/tags`. A model name without a
    /// tag matches any locally available tag of it.
    pub fn probe(&self) -> Result<(), LlmError> {
        let url = format!("{}/api/tags", self.config.base_url);
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(5))
            .build();

        let resp = agent.get(&url).call().map_err(|_| LlmError::Unavailable {
            url: self.config.base_url.clone(),
        })?;
        let body = resp.into_string().map_err(|e| LlmError::ParseError {
            message: e.to_string(),
        })?;
        let json: Value = serde_json::from_str(&body).map_err(|e| LlmError::ParseError {
            message: e.to_string(),
        })?;

        let target = &self.config.model;
        let has_model = json["models"].as_array().is_some_and(|models| {
            models
                .iter()
                .filter_map(|m| m["name"].as_str())
                .any(|name| name == target || name.split(':').next() == Some(target))
        });
        if has_model {
            Ok(())
        } else {
            Err(LlmError::RequestFailed {
                message: format!("model \"{target}\" is not pulled; run `ollama pull {target}`"),
            })
        }
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
            "format": "json",
            "options": { "temperature": 0.2 },
        })
    }
}

fn parse_reply(json: &Value) -> Result<ModelResponse, LlmError> {
    let text = json["response"]
        .as_str()
        .ok_or_else(|| LlmError::ParseError {
            message: "missing 'response' field".into(),
        })?;
    Ok(ModelResponse {
        text: text.to_string(),
        stopped_at_limit: json["done_reason"].as_str() == Some("length"),
    })
}

impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn generate_content(&self, prompt: &str) -> Result<ModelResponse, LlmError> {
        let url = format!("{}/api/generate", self.config.base_url);
        let json = self.client.post(&url, &[], &self.request_body(prompt))?;
        parse_reply(&json)
    }
}
