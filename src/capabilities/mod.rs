//! Built-in capabilities.
//!
//! Each one is an opaque collaborator as far as routing is concerned: the
//! router only sees its spec and its typed arguments. Every path argument goes
//! through [`PathConfinement`] before it touches the disk.

pub mod index;
pub mod logs;
pub mod patterns;
pub mod sort_json;

use std::path::Path;

use crate::confine::PathConfinement;
use crate::error::{HandlerError, RegistrationError};
use crate::tools::CapabilityRegistry;

pub use index::BuildContentIndex;
pub use logs::ParseLogFiles;
pub use patterns::AnalyzeTextPatterns;
pub use sort_json::SortJsonContent;

/// Registry with every built-in capability, confined to `confine`'s root.
pub fn builtin_registry(confine: &PathConfinement) -> Result<CapabilityRegistry, RegistrationError> {
    CapabilityRegistry::new()
        .with(SortJsonContent::new(confine.clone()))?
        .with(ParseLogFiles::new(confine.clone()))?
        .with(BuildContentIndex::new(confine.clone()))?
        .with(AnalyzeTextPatterns::new(confine.clone()))
}

/// Write `contents`, creating parent directories as needed.
pub(crate) async fn write_output(path: &Path, contents: &str) -> Result<(), HandlerError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::DispatchExecutor;
    use crate::types::{DispatchStatus, Selection};
    use std::sync::Arc;

    #[test]
    fn builtins_register_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let registry = builtin_registry(&PathConfinement::new(dir.path())).unwrap();
        assert_eq!(
            registry.names(),
            [
                "sort_json_content",
                "parse_log_files",
                "build_content_index",
                "analyze_text_patterns"
            ]
        );
        assert!(registry.lookup("scrape_web_content").is_none());
    }

    #[tokio::test]
    async fn null_and_integral_float_arguments_reach_handlers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), "[3,1,2]").unwrap();
        std::fs::create_dir(dir.path().join("logs")).unwrap();
        std::fs::write(dir.path().join("logs/app.log"), "started\nmore\n").unwrap();

        let registry = builtin_registry(&PathConfinement::new(dir.path())).unwrap();
        let exec = DispatchExecutor::new(Arc::new(registry));
        let outcomes = exec
            .execute(vec![
                Selection::new(
                    "sort_json_content",
                    r#"{"path":"a.json","keys":null,"output_path":null}"#,
                ),
                Selection::new(
                    "parse_log_files",
                    r#"{"log_dir":"logs","output_path":"recent.txt","count":null}"#,
                ),
                Selection::new(
                    "parse_log_files",
                    r#"{"log_dir":"logs","output_path":"one.txt","count":1.0}"#,
                ),
            ])
            .await;

        for o in &outcomes {
            assert_eq!(o.status, DispatchStatus::Success, "{}", o.detail);
        }
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.json")).unwrap(),
            "[1,2,3]"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("recent.txt")).unwrap().trim(),
            "started"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("one.txt")).unwrap().trim(),
            "started"
        );
    }
}
