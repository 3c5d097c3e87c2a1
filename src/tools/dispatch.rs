use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio_util::task::AbortOnDropHandle;
use tracing::{info, warn};

use super::handler::PendingCall;
use super::registry::CapabilityRegistry;
use crate::error::HandlerError;
use crate::types::{DispatchOutcome, DispatchStatus, Selection};

/// Turns selections into outcomes, one each, in order.
///
/// Failures never cross selections: an unknown name, bad arguments, a handler
/// error, a timeout or a panic all end up in that selection's outcome and the
/// next selection still runs. Selections run strictly one after another since
/// handlers may share files, repositories or databases.
pub struct DispatchExecutor {
    registry: Arc<CapabilityRegistry>,
    handler_timeout: Option<Duration>,
}

impl DispatchExecutor {
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            registry,
            handler_timeout: None,
        }
    }

    /// Bound each handler invocation. A handler that overruns is aborted.
    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = Some(timeout);
        self
    }

    pub async fn execute(&self, selections: Vec<Selection>) -> Vec<DispatchOutcome> {
        let mut outcomes = Vec::with_capacity(selections.len());
        for selection in selections {
            outcomes.push(self.dispatch(selection).await);
        }
        outcomes
    }

    pub async fn dispatch(&self, selection: Selection) -> DispatchOutcome {
        let name = selection.capability.as_str();

        let Some(capability) = self.registry.lookup(name) else {
            warn!(capability = name, "model selected unknown capability");
            let detail = format!("capability not found: {name}");
            return outcome(selection, DispatchStatus::CapabilityNotFound, detail);
        };

        let pending = match decode_arguments(&selection.arguments).and_then(|args| {
            capability.spec.check_arguments(&args)?;
            let args = capability.spec.normalize_arguments(args);
            capability.handler.clone().prepare(args)
        }) {
            Ok(pending) => pending,
            Err(reason) => {
                warn!(capability = name, %reason, "argument decode failed");
                let detail = format!("invalid arguments: {reason}");
                return outcome(selection, DispatchStatus::ArgumentDecodeError, detail);
            }
        };

        info!(capability = name, "invoking capability");
        match self.invoke(pending).await {
            Ok(output) => {
                info!(capability = name, "capability succeeded");
                outcome(selection, DispatchStatus::Success, output)
            }
            Err(e) => {
                warn!(capability = name, error = %e, "capability failed");
                outcome(selection, DispatchStatus::HandlerError, e.to_string())
            }
        }
    }

    /// Run the handler in its own task so a panic stays contained. Dropping
    /// this future (cancellation) aborts the task.
    async fn invoke(&self, call: PendingCall) -> Result<String, HandlerError> {
        let mut task = AbortOnDropHandle::new(tokio::spawn(call));
        let joined = match self.handler_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => return Err(HandlerError::Timeout(limit)),
            },
            None => (&mut task).await,
        };
        match joined {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(HandlerError::Panicked),
            Err(e) => Err(HandlerError::Failed(e.to_string())),
        }
    }
}

/// Models sometimes send an empty string for a call with no arguments.
fn decode_arguments(raw: &str) -> Result<Value, String> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw).map_err(|e| format!("malformed JSON: {e}"))
}

fn outcome(selection: Selection, status: DispatchStatus, detail: String) -> DispatchOutcome {
    DispatchOutcome {
        selection,
        status,
        detail,
    }
}
