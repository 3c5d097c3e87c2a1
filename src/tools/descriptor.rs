use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::RegistrationError;

/// Longest description the chat-completions API accepts for a function.
pub const MAX_DESCRIPTION_LEN: usize = 1024;

/// Schema primitive a parameter maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
            ParamType::Array => "array",
        }
    }

    /// Whether a JSON value is an instance of this type.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => {
                value.is_i64() || value.is_u64() || integral_float(value).is_some()
            }
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Object => value.is_object(),
            ParamType::Array => value.is_array(),
        }
    }
}

/// `5.0` and friends: a float with no fractional part that fits an `i64`.
fn integral_float(value: &Value) -> Option<i64> {
    let f = value.as_f64().filter(|f| value.is_f64() && f.fract() == 0.0)?;
    (f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
}

/// Rewrite `5.0` as `5` so typed integer fields decode.
fn integral(value: Value) -> Value {
    match integral_float(&value) {
        Some(i) => Value::from(i),
        None => value,
    }
}

/// One declared parameter of a capability.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub ty: ParamType,
    pub description: String,
    /// `None` means the parameter is required.
    pub default: Option<Value>,
    /// Element type, arrays only.
    pub items: Option<ParamType>,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, ty: ParamType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty,
            description: description.into(),
            default: None,
            items: None,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        ty: ParamType,
        description: impl Into<String>,
        default: Value,
    ) -> Self {
        Self {
            name: name.into(),
            ty,
            description: description.into(),
            default: Some(default),
            items: None,
        }
    }

    pub fn items(mut self, ty: ParamType) -> Self {
        self.items = Some(ty);
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Hand-written declaration of a capability: what the model is told about it.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilitySpec {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl CapabilitySpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    fn param_named(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Startup checks. Anything caught here never reaches a request.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        let name_ok = !self.name.is_empty()
            && self.name.len() <= 64
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !name_ok {
            return Err(RegistrationError::InvalidName(self.name.clone()));
        }
        if self.description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(RegistrationError::DescriptionTooLong(self.name.clone()));
        }

        let mut seen = HashSet::new();
        for p in &self.params {
            if !seen.insert(p.name.as_str()) {
                return Err(RegistrationError::DuplicateParameter {
                    capability: self.name.clone(),
                    param: p.name.clone(),
                });
            }
            if p.items.is_some() && p.ty != ParamType::Array {
                return Err(RegistrationError::ItemsOnNonArray {
                    capability: self.name.clone(),
                    param: p.name.clone(),
                });
            }
            if let Some(default) = &p.default {
                if !default.is_null() && !p.ty.matches(default) {
                    return Err(RegistrationError::DefaultTypeMismatch {
                        capability: self.name.clone(),
                        param: p.name.clone(),
                        expected: p.ty.as_str(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Structural check of model-supplied arguments against the declared
    /// parameters. Says nothing about what the handler will do with them.
    pub fn check_arguments(&self, args: &Value) -> Result<(), String> {
        let obj = args
            .as_object()
            .ok_or_else(|| "arguments must be a JSON object".to_string())?;

        for key in obj.keys() {
            if self.param_named(key).is_none() {
                return Err(format!("unknown parameter '{key}'"));
            }
        }

        for p in &self.params {
            match obj.get(&p.name) {
                None | Some(Value::Null) => {
                    if p.is_required() {
                        return Err(format!("missing required parameter '{}'", p.name));
                    }
                }
                Some(value) => {
                    if !p.ty.matches(value) {
                        return Err(format!(
                            "parameter '{}' must be {}",
                            p.name,
                            p.ty.as_str()
                        ));
                    }
                    if let (Some(item_ty), Some(items)) = (p.items, value.as_array()) {
                        if let Some(i) = items.iter().position(|v| !item_ty.matches(v)) {
                            return Err(format!(
                                "parameter '{}'[{i}] must be {}",
                                p.name,
                                item_ty.as_str()
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Canonical form of arguments that passed [`check_arguments`]: `null`
    /// entries are dropped so the handler's own defaults apply, and integral
    /// floats in integer slots become integers.
    ///
    /// [`check_arguments`]: CapabilitySpec::check_arguments
    pub fn normalize_arguments(&self, args: Value) -> Value {
        let Value::Object(obj) = args else {
            return args;
        };
        let normalized = obj
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| {
                let value = match self.param_named(&key) {
                    Some(p) if p.ty == ParamType::Integer => integral(value),
                    Some(p) if p.items == Some(ParamType::Integer) => match value {
                        Value::Array(items) => {
                            Value::Array(items.into_iter().map(integral).collect())
                        }
                        other => other,
                    },
                    _ => value,
                };
                (key, value)
            })
            .collect();
        Value::Object(normalized)
    }
}

/// Tool descriptor in chat-completions function-calling shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: FunctionDescriptor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: ParametersSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParametersSchema {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub properties: Map<String, Value>,
    pub required: Vec<String>,
    #[serde(rename = "additionalProperties")]
    pub additional_properties: bool,
}

impl ToolDescriptor {
    pub fn name(&self) -> &str {
        &self.function.name
    }

    pub fn required(&self) -> &[String] {
        &self.function.parameters.required
    }

    pub fn to_value(&self) -> Value {
        // Only string keys and plain values in here; serialization cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Project a capability spec into the descriptor sent to the model.
/// Pure and deterministic: the same spec always yields the same bytes.
pub fn synthesize(spec: &CapabilitySpec) -> ToolDescriptor {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for p in &spec.params {
        let mut prop = Map::new();
        prop.insert("type".into(), Value::String(p.ty.as_str().into()));
        prop.insert("description".into(), Value::String(p.description.clone()));
        if let Some(item_ty) = p.items {
            prop.insert(
                "items".into(),
                serde_json::json!({ "type": item_ty.as_str() }),
            );
        }
        match &p.default {
            None => required.push(p.name.clone()),
            Some(Value::Null) => {}
            Some(default) => {
                prop.insert("default".into(), default.clone());
            }
        }
        properties.insert(p.name.clone(), Value::Object(prop));
    }

    ToolDescriptor {
        kind: "function",
        function: FunctionDescriptor {
            name: spec.name.clone(),
            description: spec.description.clone(),
            parameters: ParametersSchema {
                kind: "object",
                properties,
                required,
                additional_properties: false,
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sort_spec() -> CapabilitySpec {
        CapabilitySpec::new("sort_json_content", "Sort a JSON array file")
            .param(ParamSpec::required("path", ParamType::String, "File to sort"))
            .param(
                ParamSpec::optional("keys", ParamType::Array, "Sort keys", json!([]))
                    .items(ParamType::String),
            )
            .param(ParamSpec::optional(
                "output_path",
                ParamType::String,
                "Where to write",
                Value::Null,
            ))
    }

    #[test]
    fn required_is_exactly_non_defaulted() {
        let d = synthesize(&sort_spec());
        assert_eq!(d.required(), ["path".to_string()]);
        assert_eq!(d.function.parameters.properties.len(), 3);
    }

    #[test]
    fn descriptor_shape_matches_function_calling() {
        let v = synthesize(&sort_spec()).to_value();
        assert_eq!(v["type"], "function");
        assert_eq!(v["function"]["name"], "sort_json_content");
        assert_eq!(v["function"]["parameters"]["type"], "object");
        assert_eq!(v["function"]["parameters"]["additionalProperties"], false);
        assert_eq!(
            v["function"]["parameters"]["properties"]["keys"]["items"]["type"],
            "string"
        );
        assert_eq!(
            v["function"]["parameters"]["properties"]["keys"]["default"],
            json!([])
        );
        assert!(v["function"]["parameters"]["properties"]["output_path"]
            .get("default")
            .is_none());
    }

    #[test]
    fn zero_params_yields_empty_schema() {
        let d = synthesize(&CapabilitySpec::new("noop", "Does nothing"));
        assert!(d.function.parameters.properties.is_empty());
        assert!(d.required().is_empty());
    }

    #[test]
    fn validate_rejects_bad_name() {
        let err = CapabilitySpec::new("has space", "x").validate().unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidName(_)));
    }

    #[test]
    fn validate_rejects_long_description() {
        let err = CapabilitySpec::new("x", "a".repeat(MAX_DESCRIPTION_LEN + 1))
            .validate()
            .unwrap_err();
        assert!(matches!(err, RegistrationError::DescriptionTooLong(_)));
    }

    #[test]
    fn validate_rejects_duplicate_param() {
        let spec = CapabilitySpec::new("x", "x")
            .param(ParamSpec::required("a", ParamType::String, ""))
            .param(ParamSpec::required("a", ParamType::Integer, ""));
        assert!(matches!(
            spec.validate(),
            Err(RegistrationError::DuplicateParameter { .. })
        ));
    }

    #[test]
    fn validate_rejects_mistyped_default() {
        let spec = CapabilitySpec::new("x", "x").param(ParamSpec::optional(
            "count",
            ParamType::Integer,
            "",
            json!("10"),
        ));
        assert!(matches!(
            spec.validate(),
            Err(RegistrationError::DefaultTypeMismatch { expected: "integer", .. })
        ));
    }

    #[test]
    fn validate_rejects_items_on_scalar() {
        let spec = CapabilitySpec::new("x", "x")
            .param(ParamSpec::required("a", ParamType::String, "").items(ParamType::String));
        assert!(matches!(
            spec.validate(),
            Err(RegistrationError::ItemsOnNonArray { .. })
        ));
    }

    #[test]
    fn check_arguments_accepts_minimal_call() {
        assert!(sort_spec().check_arguments(&json!({"path": "a.json"})).is_ok());
        assert!(sort_spec()
            .check_arguments(&json!({"path": "a.json", "output_path": null}))
            .is_ok());
    }

    #[test]
    fn check_arguments_rejects_missing_required() {
        let err = sort_spec().check_arguments(&json!({})).unwrap_err();
        assert!(err.contains("path"));
        let err = sort_spec().check_arguments(&json!({"path": null})).unwrap_err();
        assert!(err.contains("missing"));
    }

    #[test]
    fn check_arguments_rejects_wrong_types() {
        let err = sort_spec().check_arguments(&json!({"path": 3})).unwrap_err();
        assert!(err.contains("must be string"));
        let err = sort_spec()
            .check_arguments(&json!({"path": "a", "keys": ["x", 1]}))
            .unwrap_err();
        assert!(err.contains("keys"));
    }

    #[test]
    fn check_arguments_rejects_unknown_and_non_object() {
        let err = sort_spec()
            .check_arguments(&json!({"path": "a", "shell": "rm -rf /"}))
            .unwrap_err();
        assert!(err.contains("unknown parameter 'shell'"));
        assert!(sort_spec().check_arguments(&json!(["a"])).is_err());
    }

    #[test]
    fn integer_accepts_integral_float_only() {
        assert!(ParamType::Integer.matches(&json!(3)));
        assert!(ParamType::Integer.matches(&json!(5.0)));
        assert!(ParamType::Integer.matches(&json!(-2.0)));
        assert!(!ParamType::Integer.matches(&json!(3.5)));
        assert!(!ParamType::Integer.matches(&json!(1e300)));
        assert!(ParamType::Number.matches(&json!(3)));
    }

    #[test]
    fn normalize_drops_nulls_and_rewrites_integral_floats() {
        let spec = CapabilitySpec::new("n", "normalize")
            .param(ParamSpec::required("path", ParamType::String, ""))
            .param(ParamSpec::optional("keys", ParamType::Array, "", json!([])))
            .param(ParamSpec::optional("count", ParamType::Integer, "", json!(10)))
            .param(ParamSpec::optional("ratio", ParamType::Number, "", json!(1.0)))
            .param(
                ParamSpec::optional("ids", ParamType::Array, "", json!([]))
                    .items(ParamType::Integer),
            );
        let args = json!({
            "path": "a.json",
            "keys": null,
            "count": 5.0,
            "ratio": 2.0,
            "ids": [1.0, 2]
        });
        assert!(spec.check_arguments(&args).is_ok());

        let normalized = spec.normalize_arguments(args);
        assert_eq!(normalized, json!({"path": "a.json", "count": 5, "ratio": 2.0, "ids": [1, 2]}));
        assert!(normalized["count"].is_u64());
        assert!(normalized["ratio"].is_f64());
    }
}
