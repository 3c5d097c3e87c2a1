use std::time::Duration;

/// Request-level failure. Aborts the whole request; no outcomes are reported.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("task description is empty")]
    EmptyTask,
    #[error("task parsing failed: {0}")]
    TaskParsing(#[from] InferenceError),
    #[error("request deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
    #[error("request cancelled")]
    Cancelled,
}

impl RouterError {
    /// The pipeline stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            RouterError::EmptyTask | RouterError::DeadlineExceeded(_) | RouterError::Cancelled => {
                "request"
            }
            RouterError::TaskParsing(_) => "task_parsing",
        }
    }

    /// Message safe to hand back to an untrusted caller. Upstream response
    /// bodies stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            RouterError::TaskParsing(InferenceError::ApiError { status, .. }) => {
                format!("task parsing failed: model endpoint returned {status}")
            }
            other => other.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
    #[error("API returned {status}: {body}")]
    ApiError { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
}

/// Startup-time misconfiguration of the capability registry. Fatal.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("capability '{0}' is already registered")]
    DuplicateName(String),
    #[error("invalid capability name '{0}': use 1-64 chars of [A-Za-z0-9_-]")]
    InvalidName(String),
    #[error("description of '{0}' exceeds 1024 characters")]
    DescriptionTooLong(String),
    #[error("capability '{capability}' declares parameter '{param}' twice")]
    DuplicateParameter { capability: String, param: String },
    #[error("capability '{capability}': default for '{param}' does not match declared type {expected}")]
    DefaultTypeMismatch {
        capability: String,
        param: String,
        expected: &'static str,
    },
    #[error("capability '{capability}': parameter '{param}' declares item type but is not an array")]
    ItemsOnNonArray { capability: String, param: String },
    #[error("no capabilities registered")]
    Empty,
}

/// Failure raised by a capability handler. Isolated to its own outcome.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("path rejected: {0}")]
    Confinement(#[from] crate::confine::ConfinementError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0}")]
    Failed(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("handler panicked")]
    Panicked,
}
