//! Shared JSON-over-HTTP plumbing for the provider clients.

use std::time::Duration;

use serde_json::Value;

use super::LlmError;

/// Blocking JSON client with a fixed per-request timeout.
pub(crate) struct JsonClient {
    agent: ureq::Agent,
    timeout_secs: u64,
}

impl JsonClient {
    pub(crate) fn new(timeout_secs: u64) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(timeout_secs))
            .build();
        Self {
            agent,
            timeout_secs,
        }
    }

    /// POST `body` to `url` with extra headers and decode the JSON reply.
    pub(crate) fn post(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> Result<Value, LlmError> {
        let body_str = serde_json::to_string(body).map_err(|e| LlmError::RequestFailed {
            message: format!("JSON serialize error: {e}"),
        })?;

        let mut request = self.agent.post(url).set("Content-Type", "application/json");
        for (name, value) in headers {
            request = request.set(name, value);
        }

        let resp = request
            .send_string(&body_str)
            .map_err(|e| self.map_transport(url, e))?;

        let resp_str = resp.into_string().map_err(|e| LlmError::ParseError {
            message: e.to_string(),
        })?;

        serde_json::from_str(&resp_str).map_err(|e| LlmError::ParseError {
            message: e.to_string(),
        })
    }

    fn map_transport(&self, url: &str, err: ureq::Error) -> LlmError {
        match err {
            ureq::Error::Status(status, resp) => LlmError::Http {
                status,
                body: resp.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(t) => match t.kind() {
                ureq::ErrorKind::ConnectionFailed | ureq::ErrorKind::Dns => {
                    LlmError::Unavailable {
                        url: url.to_string(),
                    }
                }
                _ if t.to_string().contains("timed out") => LlmError::Timeout {
                    timeout_secs: self.timeout_secs,
                },
                _ => LlmError::RequestFailed {
                    message: t.to_string(),
                },
            },
        }
    }
}

/// Join every string found at `path` inside the elements of `array`.
///
/// Providers split long replies into several content parts; the parts are
/// concatenated in order.
pub(crate) fn join_text_parts(array: Option<&Vec<Value>>, field: &str) -> Option<String> {
    let parts: Vec<&str> = array?
        .iter()
        .filter_map(|part| part.get(field).and_then(Value::as_str))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.concat())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn joins_parts_in_order() {
        let parts = json!([{"text": "[{\"a\":"}, {"other": 1}, {"text": "1}]"}]);
        assert_eq!(
            join_text_parts(parts.as_array(), "text").as_deref(),
            Some("[{\"a\":1}]")
        );
    }

    #[test]
    fn no_text_parts_is_none() {
        assert_eq!(join_text_parts(None, "text"), None);
        let parts = json!([{"image": "x"}]);
        assert_eq!(join_text_parts(parts.as_array(), "text"), None);
    }
}
