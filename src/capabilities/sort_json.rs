use std::cmp::Ordering;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::write_output;
use crate::confine::PathConfinement;
use crate::error::HandlerError;
use crate::tools::{Capability, CapabilitySpec, ParamSpec, ParamType};

#[derive(Debug, Deserialize)]
pub struct SortJsonArgs {
    pub path: String,
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub output_path: Option<String>,
}

/// Stable-sorts a JSON array on disk.
pub struct SortJsonContent {
    confine: PathConfinement,
}

impl SortJsonContent {
    pub fn new(confine: PathConfinement) -> Self {
        Self { confine }
    }
}

#[async_trait]
impl Capability for SortJsonContent {
    type Args = SortJsonArgs;

    fn spec(&self) -> CapabilitySpec {
        CapabilitySpec::new(
            "sort_json_content",
            "Sort the array stored in a JSON file. Objects are ordered by the given keys, \
             in priority order; without keys, elements themselves are compared (numbers \
             numerically, strings lexically). \
             Writes the sorted array to output_path, or back to the input file.",
        )
        .param(ParamSpec::required(
            "path",
            ParamType::String,
            "JSON file containing an array",
        ))
        .param(
            ParamSpec::optional(
                "keys",
                ParamType::Array,
                "Object keys to sort by, highest priority first, e.g. [\"last_name\", \"first_name\"]",
                json!([]),
            )
            .items(ParamType::String),
        )
        .param(ParamSpec::optional(
            "output_path",
            ParamType::String,
            "Where to write the sorted array; defaults to the input file",
            Value::Null,
        ))
    }

    async fn call(&self, args: SortJsonArgs) -> Result<String, HandlerError> {
        let input = self.confine.resolve(&args.path)?;
        let output = match args.output_path.as_deref() {
            Some(p) => self.confine.resolve(p)?,
            None => input.clone(),
        };

        let text = tokio::fs::read_to_string(&input).await?;
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| HandlerError::InvalidInput(format!("{}: {e}", args.path)))?;
        let Value::Array(mut items) = value else {
            return Err(HandlerError::InvalidInput(format!(
                "{} does not contain a JSON array",
                args.path
            )));
        };

        items.sort_by(|a, b| compare(a, b, &args.keys));
        let count = items.len();
        let sorted = serde_json::to_string(&items)
            .map_err(|e| HandlerError::Failed(e.to_string()))?;
        write_output(&output, &sorted).await?;

        let written = args.output_path.as_deref().unwrap_or(&args.path);
        Ok(format!("sorted {count} entries into {written}"))
    }
}

fn compare(a: &Value, b: &Value, keys: &[String]) -> Ordering {
    if keys.is_empty() {
        return compare_field(Some(a), Some(b));
    }
    keys.iter().fold(Ordering::Equal, |acc, key| {
        acc.then_with(|| compare_field(a.get(key), b.get(key)))
    })
}

/// Missing fields sort first; strings and numbers compare naturally.
fn compare_field(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(contents: &str) -> (tempfile::TempDir, SortJsonContent) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("contacts.json"), contents).unwrap();
        let cap = SortJsonContent::new(PathConfinement::new(dir.path()));
        (dir, cap)
    }

    #[tokio::test]
    async fn sorts_by_keys_into_output() {
        let (dir, cap) = setup(
            r#"[{"first_name":"Bo","last_name":"Ng"},
                {"first_name":"Al","last_name":"Ng"},
                {"first_name":"Cy","last_name":"Ax"}]"#,
        );
        let msg = cap
            .call(SortJsonArgs {
                path: "contacts.json".into(),
                keys: vec!["last_name".into(), "first_name".into()],
                output_path: Some("contacts-sorted.json".into()),
            })
            .await
            .unwrap();
        assert_eq!(msg, "sorted 3 entries into contacts-sorted.json");

        let out: Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("contacts-sorted.json")).unwrap(),
        )
        .unwrap();
        let firsts: Vec<&str> = out
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["first_name"].as_str().unwrap())
            .collect();
        assert_eq!(firsts, ["Cy", "Al", "Bo"]);
    }

    #[tokio::test]
    async fn sorts_in_place_without_keys() {
        let (dir, cap) = setup("[3, 1, 2]");
        cap.call(SortJsonArgs {
            path: "contacts.json".into(),
            keys: vec![],
            output_path: None,
        })
        .await
        .unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("contacts.json")).unwrap(),
            "[1,2,3]"
        );
    }

    #[tokio::test]
    async fn without_keys_numbers_sort_numerically() {
        let (dir, cap) = setup(r#"[10, 9, 1, 100, 2.5]"#);
        cap.call(SortJsonArgs {
            path: "contacts.json".into(),
            keys: vec![],
            output_path: None,
        })
        .await
        .unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("contacts.json")).unwrap(),
            "[1,2.5,9,10,100]"
        );
    }

    #[tokio::test]
    async fn non_array_is_invalid_input() {
        let (_dir, cap) = setup(r#"{"a": 1}"#);
        let err = cap
            .call(SortJsonArgs {
                path: "contacts.json".into(),
                keys: vec![],
                output_path: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn path_outside_root_is_rejected() {
        let (_dir, cap) = setup("[]");
        let err = cap
            .call(SortJsonArgs {
                path: "../../etc/passwd".into(),
                keys: vec![],
                output_path: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Confinement(_)));
    }

    #[test]
    fn numbers_compare_numerically() {
        assert_eq!(
            compare_field(Some(&json!(9)), Some(&json!(10))),
            Ordering::Less
        );
        assert_eq!(compare_field(None, Some(&json!("a"))), Ordering::Less);
    }
}
