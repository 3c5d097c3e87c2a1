use serde::Serialize;
use serde_json::Value;

/// Fully-formed selection request. The provider just sends it.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub model: String,
    pub max_tokens: u32,
    pub system: String,
    pub user: String,
    /// Serialized tool descriptors, in registry order.
    pub tools: Vec<Value>,
    /// When true the model must answer with at least one tool call.
    pub tool_choice_required: bool,
}

/// What came back from the model.
#[derive(Debug, Clone, Default)]
pub struct InferenceResponse {
    /// Any plain-text content alongside the tool calls.
    pub text: Option<String>,
    pub selections: Vec<Selection>,
    pub usage: Usage,
}

/// Token usage for a single inference call.
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// One (capability, arguments) pair chosen by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    pub capability: String,
    /// Raw JSON-encoded argument object, as the model produced it.
    pub arguments: String,
}

impl Selection {
    pub fn new(capability: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            call_id: None,
            capability: capability.into(),
            arguments: arguments.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Success,
    CapabilityNotFound,
    ArgumentDecodeError,
    HandlerError,
}

/// Result of attempting one selection. Exactly one per selection.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub selection: Selection,
    pub status: DispatchStatus,
    /// Handler output on success, the failure reason otherwise.
    pub detail: String,
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        self.status == DispatchStatus::Success
    }
}

/// Aggregate result of a request that got past task parsing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskReport {
    pub outcomes: Vec<DispatchOutcome>,
}

impl TaskReport {
    /// True only if every outcome succeeded. Zero outcomes is a success.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(DispatchOutcome::is_success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &DispatchOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// One-line summary naming each failed capability and why.
    pub fn failure_summary(&self) -> String {
        let failed: Vec<String> = self
            .failures()
            .map(|o| format!("{} ({})", o.selection.capability, o.detail))
            .collect();
        format!(
            "{} of {} capabilities failed: {}",
            failed.len(),
            self.outcomes.len(),
            failed.join("; ")
        )
    }
}
