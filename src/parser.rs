use std::time::Duration;

use tracing::{debug, info};

use crate::error::InferenceError;
use crate::inference::InferenceProvider;
use crate::tools::ToolDescriptor;
use crate::types::{InferenceRequest, Selection};

pub const SYSTEM_PROMPT: &str = "You are an intelligent agent that understands and parses tasks. \
Identify the best tool functions to use to achieve the described result, and call them with \
the exact arguments they need.";

/// Asks the model which capabilities to run for a task.
///
/// One outbound call per task, no retries. Any transport, status or body
/// problem is an error for the whole task.
pub struct TaskParser<P> {
    provider: P,
    model: String,
    max_tokens: u32,
    timeout: Option<Duration>,
}

impl<P: InferenceProvider> TaskParser<P> {
    pub fn new(provider: P, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: 1024,
            timeout: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Selections in the order the model returned them. Empty when the model
    /// made no tool call.
    pub async fn parse(
        &self,
        task: &str,
        tools: &[ToolDescriptor],
    ) -> Result<Vec<Selection>, InferenceError> {
        if task.trim().is_empty() {
            return Err(InferenceError::Request("task description is empty".into()));
        }
        if tools.is_empty() {
            return Err(InferenceError::Request("no tools to choose from".into()));
        }

        let request = InferenceRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: SYSTEM_PROMPT.to_string(),
            user: task.to_string(),
            tools: tools.iter().map(ToolDescriptor::to_value).collect(),
            tool_choice_required: true,
        };

        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.provider.infer(request))
                .await
                .map_err(|_| InferenceError::Timeout(limit))??,
            None => self.provider.infer(request).await?,
        };

        if let Some(ref text) = response.text {
            debug!(%text, "model replied with text alongside tool calls");
        }
        info!(
            selections = response.selections.len(),
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "task parsed"
        );
        Ok(response.selections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{synthesize, CapabilitySpec};
    use crate::types::InferenceResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Captures the request and answers with a canned response.
    struct Recording {
        seen: Mutex<Option<InferenceRequest>>,
        reply: Vec<Selection>,
    }

    #[async_trait]
    impl InferenceProvider for Recording {
        async fn infer(
            &self,
            request: InferenceRequest,
        ) -> Result<InferenceResponse, InferenceError> {
            *self.seen.lock().unwrap() = Some(request);
            Ok(InferenceResponse {
                selections: self.reply.clone(),
                ..Default::default()
            })
        }
    }

    struct Hanging;

    #[async_trait]
    impl InferenceProvider for Hanging {
        async fn infer(&self, _: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(InferenceResponse::default())
        }
    }

    fn tools() -> Vec<ToolDescriptor> {
        vec![
            synthesize(&CapabilitySpec::new("a", "first")),
            synthesize(&CapabilitySpec::new("b", "second")),
        ]
    }

    #[tokio::test]
    async fn sends_task_and_all_tools_with_required_choice() {
        let provider = Recording {
            seen: Mutex::new(None),
            reply: vec![Selection::new("b", "{}")],
        };
        let parser = TaskParser::new(provider, "gpt-4o-mini").with_max_tokens(99);
        let selections = parser.parse("do b", &tools()).await.unwrap();
        assert_eq!(selections, vec![Selection::new("b", "{}")]);

        let req = parser.provider.seen.lock().unwrap().take().unwrap();
        assert_eq!(req.model, "gpt-4o-mini");
        assert_eq!(req.max_tokens, 99);
        assert_eq!(req.user, "do b");
        assert_eq!(req.system, SYSTEM_PROMPT);
        assert!(req.tool_choice_required);
        assert_eq!(req.tools.len(), 2);
        assert_eq!(req.tools[0]["function"]["name"], "a");
        assert_eq!(req.tools[1]["function"]["name"], "b");
    }

    #[tokio::test]
    async fn rejects_empty_task_and_empty_tools() {
        let provider = Recording {
            seen: Mutex::new(None),
            reply: vec![],
        };
        let parser = TaskParser::new(provider, "m");
        assert!(parser.parse("   ", &tools()).await.is_err());
        assert!(parser.parse("task", &[]).await.is_err());
        assert!(parser.provider.seen.lock().unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn model_call_times_out() {
        let parser = TaskParser::new(Hanging, "m").with_timeout(Duration::from_secs(30));
        let err = parser.parse("task", &tools()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Timeout(d) if d == Duration::from_secs(30)));
    }
}
