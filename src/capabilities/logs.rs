use std::path::PathBuf;
use std::time::SystemTime;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::write_output;
use crate::confine::PathConfinement;
use crate::error::HandlerError;
use crate::tools::{Capability, CapabilitySpec, ParamSpec, ParamType};

fn default_count() -> usize {
    10
}

#[derive(Debug, Deserialize)]
pub struct ParseLogsArgs {
    pub log_dir: String,
    pub output_path: String,
    #[serde(default = "default_count")]
    pub count: usize,
}

/// Collects the first line of the most recent `.log` files in a directory.
pub struct ParseLogFiles {
    confine: PathConfinement,
}

impl ParseLogFiles {
    pub fn new(confine: PathConfinement) -> Self {
        Self { confine }
    }
}

#[async_trait]
impl Capability for ParseLogFiles {
    type Args = ParseLogsArgs;

    fn spec(&self) -> CapabilitySpec {
        CapabilitySpec::new(
            "parse_log_files",
            "Write the first line of each of the most recently modified .log files in a \
             directory to an output file, newest first.",
        )
        .param(ParamSpec::required(
            "log_dir",
            ParamType::String,
            "Directory containing .log files",
        ))
        .param(ParamSpec::required(
            "output_path",
            ParamType::String,
            "File to write the collected lines to",
        ))
        .param(ParamSpec::optional(
            "count",
            ParamType::Integer,
            "How many of the most recent files to include",
            json!(default_count()),
        ))
    }

    async fn call(&self, args: ParseLogsArgs) -> Result<String, HandlerError> {
        let dir = self.confine.resolve(&args.log_dir)?;
        let output = self.confine.resolve(&args.output_path)?;

        let mut logs: Vec<(SystemTime, PathBuf)> = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "log") {
                let meta = entry.metadata().await?;
                if meta.is_file() {
                    logs.push((meta.modified()?, path));
                }
            }
        }
        logs.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        logs.truncate(args.count);

        let mut lines = Vec::with_capacity(logs.len());
        for (_, path) in &logs {
            let file = tokio::fs::File::open(path).await?;
            let first = BufReader::new(file).lines().next_line().await?;
            lines.push(first.unwrap_or_default());
        }

        let mut contents = lines.join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }
        write_output(&output, &contents).await?;

        Ok(format!(
            "wrote first lines of {} log files to {}",
            lines.len(),
            args.output_path
        ))
    }
}
