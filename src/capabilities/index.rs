use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use walkdir::WalkDir;

use super::write_output;
use crate::confine::PathConfinement;
use crate::error::HandlerError;
use crate::tools::{Capability, CapabilitySpec, ParamSpec, ParamType};

fn default_extension() -> String {
    ".md".into()
}

#[derive(Debug, Deserialize)]
pub struct IndexArgs {
    pub docs_dir: String,
    pub output_path: String,
    #[serde(default = "default_extension")]
    pub extension: String,
}

/// Indexes documents by their first top-level heading.
pub struct BuildContentIndex {
    confine: PathConfinement,
}

impl BuildContentIndex {
    pub fn new(confine: PathConfinement) -> Self {
        Self { confine }
    }
}

#[async_trait]
impl Capability for BuildContentIndex {
    type Args = IndexArgs;

    fn spec(&self) -> CapabilitySpec {
        CapabilitySpec::new(
            "build_content_index",
            "Find every document under a directory, take the first top-level '# ' heading \
             of each, and write a JSON object mapping the relative file path to that title.",
        )
        .param(ParamSpec::required(
            "docs_dir",
            ParamType::String,
            "Directory to search recursively",
        ))
        .param(ParamSpec::required(
            "output_path",
            ParamType::String,
            "JSON file to write the index to",
        ))
        .param(ParamSpec::optional(
            "extension",
            ParamType::String,
            "File extension to include",
            json!(default_extension()),
        ))
    }

    async fn call(&self, args: IndexArgs) -> Result<String, HandlerError> {
        let root = self.confine.resolve(&args.docs_dir)?;
        let output = self.confine.resolve(&args.output_path)?;
        let extension = args.extension;

        let index = tokio::task::spawn_blocking(move || collect_titles(&root, &extension))
            .await
            .map_err(|e| HandlerError::Failed(e.to_string()))??;

        let count = index.len();
        let json = serde_json::to_string_pretty(&index)
            .map_err(|e| HandlerError::Failed(e.to_string()))?;
        write_output(&output, &json).await?;

        Ok(format!("indexed {count} documents into {}", args.output_path))
    }
}

fn collect_titles(root: &Path, extension: &str) -> Result<BTreeMap<String, String>, HandlerError> {
    let mut index = BTreeMap::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| HandlerError::Failed(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !path.to_string_lossy().ends_with(extension) {
            continue;
        }

        let text = std::fs::read_to_string(path)?;
        let Some(title) = text
            .lines()
            .find_map(|line| line.strip_prefix("# ").map(str::trim))
        else {
            continue;
        };

        let relative = path
            .strip_prefix(root)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        index.insert(relative, title.to_string());
    }
    Ok(index)
}
