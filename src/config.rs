use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::RouterConfig;

/// Server configuration. Every flag can also come from the environment
/// (or a `.env` file loaded before parsing).
#[derive(Debug, Clone, Parser)]
#[command(name = "task-router", version, about = "Route plain-English tasks to capabilities")]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Bearer token for the chat-completions endpoint
    #[arg(long, env = "AIPROXY_TOKEN", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API (`/v1/chat/completions` is appended)
    #[arg(long, env = "CHAT_BASE_URL", default_value = "https://aiproxy.sanand.workers.dev/openai")]
    pub base_url: String,

    /// Model used for tool selection
    #[arg(long, env = "MODEL", default_value = "gpt-4o-mini")]
    pub model: String,

    /// Max output tokens for the selection call
    #[arg(long, default_value_t = 1024)]
    pub max_tokens: u32,

    /// Root directory capabilities may read and write under
    #[arg(long, env = "DATA_ROOT", default_value = "/data")]
    pub data_root: PathBuf,

    /// Timeout for the model call, in seconds
    #[arg(long, default_value_t = 60)]
    pub model_timeout_secs: u64,

    /// Timeout for each capability invocation, in seconds
    #[arg(long, default_value_t = 120)]
    pub handler_timeout_secs: u64,

    /// Timeout for a whole request, in seconds
    #[arg(long, default_value_t = 300)]
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            model_timeout: Some(self.model_timeout()),
            handler_timeout: Some(Duration::from_secs(self.handler_timeout_secs)),
            request_timeout: Some(Duration::from_secs(self.request_timeout_secs)),
        }
    }
}
