use proptest::prelude::*;
use serde_json::{json, Value};
use task_router::tools::{synthesize, CapabilitySpec, ParamSpec, ParamType};

fn param_type() -> impl Strategy<Value = ParamType> {
    prop_oneof![
        Just(ParamType::String),
        Just(ParamType::Integer),
        Just(ParamType::Number),
        Just(ParamType::Boolean),
        Just(ParamType::Object),
        Just(ParamType::Array),
    ]
}

fn sample(ty: ParamType) -> Value {
    match ty {
        ParamType::String => json!("x"),
        ParamType::Integer => json!(7),
        ParamType::Number => json!(1.5),
        ParamType::Boolean => json!(true),
        ParamType::Object => json!({}),
        ParamType::Array => json!([]),
    }
}

/// A synthetic signature: (type, has_default, null_default) per parameter.
fn spec_strategy() -> impl Strategy<Value = CapabilitySpec> {
    prop::collection::vec((param_type(), any::<bool>(), any::<bool>()), 0..12).prop_map(
        |params| {
            params.into_iter().enumerate().fold(
                CapabilitySpec::new("synthetic", "generated"),
                |spec, (i, (ty, defaulted, null_default))| {
                    let name = format!("p{i}");
                    let param = if !defaulted {
                        ParamSpec::required(name, ty, "")
                    } else if null_default {
                        ParamSpec::optional(name, ty, "", Value::Null)
                    } else {
                        ParamSpec::optional(name, ty, "", sample(ty))
                    };
                    spec.param(param)
                },
            )
        },
    )
}

proptest! {
    #[test]
    fn required_set_is_exactly_the_non_defaulted_params(spec in spec_strategy()) {
        prop_assert!(spec.validate().is_ok());

        let descriptor = synthesize(&spec);
        let expected: Vec<String> = spec
            .params
            .iter()
            .filter(|p| p.default.is_none())
            .map(|p| p.name.clone())
            .collect();
        prop_assert_eq!(descriptor.required(), expected.as_slice());

        // Nothing dropped: every parameter has a property.
        prop_assert_eq!(descriptor.function.parameters.properties.len(), spec.params.len());
    }

    #[test]
    fn synthesis_is_byte_identical_across_runs(spec in spec_strategy()) {
        let a = serde_json::to_string(&synthesize(&spec)).unwrap();
        let b = serde_json::to_string(&synthesize(&spec)).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn required_only_arguments_pass_and_dropping_one_fails(spec in spec_strategy()) {
        let args: serde_json::Map<String, Value> = spec
            .params
            .iter()
            .filter(|p| p.is_required())
            .map(|p| (p.name.clone(), sample(p.ty)))
            .collect();
        prop_assert!(spec.check_arguments(&Value::Object(args.clone())).is_ok());

        if let Some(first) = args.keys().next().cloned() {
            let mut missing = args;
            missing.remove(&first);
            prop_assert!(spec.check_arguments(&Value::Object(missing)).is_err());
        }
    }
}
