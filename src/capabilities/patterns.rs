use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use super::write_output;
use crate::confine::PathConfinement;
use crate::error::HandlerError;
use crate::tools::{Capability, CapabilitySpec, ParamSpec, ParamType};

#[derive(Debug, Deserialize)]
pub struct PatternArgs {
    pub path: String,
    pub pattern: String,
    pub output_path: String,
}

/// Counts lines of a text file matching a regular expression.
pub struct AnalyzeTextPatterns {
    confine: PathConfinement,
}

impl AnalyzeTextPatterns {
    pub fn new(confine: PathConfinement) -> Self {
        Self { confine }
    }
}

#[async_trait]
impl Capability for AnalyzeTextPatterns {
    type Args = PatternArgs;

    fn spec(&self) -> CapabilitySpec {
        CapabilitySpec::new(
            "analyze_text_patterns",
            "Count the lines of a text file that match a regular expression and write \
             the count, as a bare number, to an output file.",
        )
        .param(ParamSpec::required(
            "path",
            ParamType::String,
            "Text file to scan",
        ))
        .param(ParamSpec::required(
            "pattern",
            ParamType::String,
            "Regular expression (Rust regex syntax) each line is tested against",
        ))
        .param(ParamSpec::required(
            "output_path",
            ParamType::String,
            "File to write the count to",
        ))
    }

    async fn call(&self, args: PatternArgs) -> Result<String, HandlerError> {
        let input = self.confine.resolve(&args.path)?;
        let output = self.confine.resolve(&args.output_path)?;
        let re = Regex::new(&args.pattern)
            .map_err(|e| HandlerError::InvalidInput(format!("bad pattern: {e}")))?;

        let text = tokio::fs::read_to_string(&input).await?;
        let count = text.lines().filter(|line| re.is_match(line)).count();
        write_output(&output, &count.to_string()).await?;

        Ok(format!("{count} lines match /{}/", args.pattern))
    }
}
