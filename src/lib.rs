pub mod capabilities;
pub mod config;
pub mod confine;
pub mod error;
pub mod inference;
pub mod parser;
pub mod server;
pub mod tools;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use confine::{ConfinementError, PathConfinement};
pub use error::{HandlerError, InferenceError, RegistrationError, RouterError};
pub use inference::{InferenceProvider, OpenAiProvider};
pub use parser::TaskParser;
pub use tools::{
    Capability, CapabilityRegistry, CapabilitySpec, DispatchExecutor, ParamSpec, ParamType,
    ToolDescriptor,
};
pub use types::{
    DispatchOutcome, DispatchStatus, InferenceRequest, InferenceResponse, Selection, TaskReport,
    Usage,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Router configuration.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub model: String,
    pub max_tokens: u32,
    /// Bound on the model call.
    pub model_timeout: Option<Duration>,
    /// Bound on each handler invocation.
    pub handler_timeout: Option<Duration>,
    /// Bound on the whole request, parse plus dispatch.
    pub request_timeout: Option<Duration>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            max_tokens: 1024,
            model_timeout: Some(Duration::from_secs(60)),
            handler_timeout: Some(Duration::from_secs(120)),
            request_timeout: Some(Duration::from_secs(300)),
        }
    }
}

/// The router. Wire up a provider and a registry, then hand it tasks.
///
/// Holds nothing mutable; one instance serves concurrent requests.
pub struct TaskRouter {
    parser: TaskParser<Box<dyn InferenceProvider>>,
    registry: Arc<CapabilityRegistry>,
    executor: DispatchExecutor,
    config: RouterConfig,
}

impl TaskRouter {
    pub fn new(
        provider: impl InferenceProvider + 'static,
        registry: CapabilityRegistry,
        config: RouterConfig,
    ) -> Result<Self, RegistrationError> {
        if registry.is_empty() {
            return Err(RegistrationError::Empty);
        }
        let registry = Arc::new(registry);

        let provider: Box<dyn InferenceProvider> = Box::new(provider);
        let mut parser = TaskParser::new(provider, &config.model).with_max_tokens(config.max_tokens);
        if let Some(limit) = config.model_timeout {
            parser = parser.with_timeout(limit);
        }

        let mut executor = DispatchExecutor::new(registry.clone());
        if let Some(limit) = config.handler_timeout {
            executor = executor.with_handler_timeout(limit);
        }

        Ok(Self {
            parser,
            registry,
            executor,
            config,
        })
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Route and execute a task.
    pub async fn run(&self, task: &str) -> Result<TaskReport, RouterError> {
        self.run_with_cancel(task, CancellationToken::new()).await
    }

    /// Route and execute a task, abandoning it if `cancel` fires. Outcomes
    /// produced before cancellation or the request deadline are discarded.
    pub async fn run_with_cancel(
        &self,
        task: &str,
        cancel: CancellationToken,
    ) -> Result<TaskReport, RouterError> {
        if task.trim().is_empty() {
            return Err(RouterError::EmptyTask);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("task cancelled");
                Err(RouterError::Cancelled)
            }
            result = self.run_bounded(task) => result,
        }
    }

    async fn run_bounded(&self, task: &str) -> Result<TaskReport, RouterError> {
        match self.config.request_timeout {
            Some(limit) => tokio::time::timeout(limit, self.route(task))
                .await
                .map_err(|_| {
                    warn!(?limit, "request deadline exceeded");
                    RouterError::DeadlineExceeded(limit)
                })?,
            None => self.route(task).await,
        }
    }

    async fn route(&self, task: &str) -> Result<TaskReport, RouterError> {
        // Descriptors are request-scoped; the registry never changes, so this is deterministic.
        let descriptors = self.registry.descriptors();
        info!(tools = descriptors.len(), "routing task");
        debug!(task, "task description");

        let selections = self.parser.parse(task, &descriptors).await.map_err(|e| {
            warn!(error = %e, "task parsing failed");
            RouterError::TaskParsing(e)
        })?;

        let report = TaskReport {
            outcomes: self.executor.execute(selections).await,
        };

        if report.is_success() {
            info!(outcomes = report.outcomes.len(), "task executed");
        } else {
            warn!(
                outcomes = report.outcomes.len(),
                failed = report.failures().count(),
                "task executed with failures"
            );
        }
        Ok(report)
    }
}
