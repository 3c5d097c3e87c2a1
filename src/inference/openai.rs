use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::InferenceProvider;
use crate::error::InferenceError;
use crate::types::{InferenceRequest, InferenceResponse, Selection, Usage};

/// OpenAI-compatible provider. Works with the AI proxy, OpenAI itself, or
/// any server that implements the `/v1/chat/completions` endpoint.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Option<Duration>,
}

impl OpenAiProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: None,
            timeout: None,
        }
    }

    /// Set an API key, sent as a bearer token.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Per-request timeout applied by the HTTP client.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Request body: system + user messages, the tool list, forced tool
    /// choice. Temperature is pinned to 0 and streaming is off.
    pub(crate) fn build_body(request: &InferenceRequest) -> Value {
        let mut body = json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "temperature": 0,
            "stream": false,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
        });

        if !request.tools.is_empty() {
            body["tools"] = Value::Array(request.tools.clone());
            if request.tool_choice_required {
                body["tool_choice"] = Value::String("required".into());
            }
        }

        body
    }

    /// Pull the tool calls out of `choices[0].message`. A message without
    /// tool calls is valid and yields no selections; anything structurally
    /// off is a parse error so nothing half-understood gets dispatched.
    pub(crate) fn parse_body(text: &str) -> Result<InferenceResponse, InferenceError> {
        let parsed: Value =
            serde_json::from_str(text).map_err(|e| InferenceError::Parse(e.to_string()))?;

        let message = parsed
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .filter(|m| m.is_object())
            .ok_or_else(|| InferenceError::Parse("missing choices[0].message".into()))?;

        let text = message["content"]
            .as_str()
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        let mut selections = Vec::new();
        match &message["tool_calls"] {
            Value::Null => {}
            Value::Array(calls) => {
                for (i, tc) in calls.iter().enumerate() {
                    let function = &tc["function"];
                    let name = function["name"].as_str().ok_or_else(|| {
                        InferenceError::Parse(format!("tool_calls[{i}] has no function.name"))
                    })?;
                    // Arguments should be a JSON string; some servers send the object.
                    let arguments = match &function["arguments"] {
                        Value::String(s) => s.clone(),
                        Value::Null => String::new(),
                        Value::Object(_) => function["arguments"].to_string(),
                        _ => {
                            return Err(InferenceError::Parse(format!(
                                "tool_calls[{i}] has non-string function.arguments"
                            )))
                        }
                    };
                    selections.push(Selection {
                        call_id: tc["id"].as_str().map(str::to_string),
                        capability: name.to_string(),
                        arguments,
                    });
                }
            }
            _ => return Err(InferenceError::Parse("tool_calls is not a list".into())),
        }

        let usage = Usage {
            input_tokens: parsed["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: parsed["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
        };

        Ok(InferenceResponse {
            text,
            selections,
            usage,
        })
    }
}

#[async_trait]
impl InferenceProvider for OpenAiProvider {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        let body = Self::build_body(&request);

        debug!(
            model = %request.model,
            tools = request.tools.len(),
            "chat completion request"
        );

        let mut req = self
            .client
            .post(self.endpoint())
            .header("content-type", "application/json");

        if let Some(ref key) = self.api_key {
            req = req.header("authorization", format!("Bearer {key}"));
        }
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }

        let resp = req.json(&body).send().await.map_err(|e| map_send_error(e, self.timeout))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| map_send_error(e, self.timeout))?;

        if !(200..300).contains(&status) {
            return Err(InferenceError::ApiError { status, body: text });
        }

        let response = Self::parse_body(&text)?;
        debug!(
            selections = response.selections.len(),
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "chat completion response"
        );
        Ok(response)
    }
}

fn map_send_error(e: reqwest::Error, timeout: Option<Duration>) -> InferenceError {
    match timeout {
        Some(limit) if e.is_timeout() => InferenceError::Timeout(limit),
        _ => InferenceError::Request(e.to_string()),
    }
}
