//! JSON-object merge of `UpdateParams` partials onto a [`SimConfig`].

use serde_json::Value;
use thiserror::Error;

use gridlife_core::SimConfig;

/// Errors produced while merging a configuration patch.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("configuration patch must be a JSON object")]
    NotAnObject,
    #[error("unknown option: {0}")]
    UnknownPath(String),
    #[error("type mismatch at {0}")]
    TypeMismatch(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Merge `patch` onto `config`, returning the patched configuration. Only
/// recognized options are accepted; value types must match the current
/// configuration shape. The caller validates the result and decides
/// whether the change is structural.
pub fn apply_patch(config: &SimConfig, patch: &Value) -> Result<SimConfig, PatchError> {
    if !patch.is_object() {
        return Err(PatchError::NotAnObject);
    }
    let mut config_value = serde_json::to_value(config)
        .map_err(|err| PatchError::Serialization(err.to_string()))?;
    merge_value(&mut config_value, patch, &mut Vec::new())?;
    serde_json::from_value(config_value).map_err(|err| PatchError::Serialization(err.to_string()))
}

fn merge_value(
    target: &mut Value,
    patch: &Value,
    path: &mut Vec<String>,
) -> Result<(), PatchError> {
    match target {
        Value::Object(target_map) => {
            let Value::Object(patch_map) = patch else {
                return Err(PatchError::TypeMismatch(path.join(".")));
            };
            for (key, patch_value) in patch_map {
                path.push(key.clone());
                let Some(target_value) = target_map.get_mut(key) else {
                    return Err(PatchError::UnknownPath(path.join(".")));
                };
                merge_value(target_value, patch_value, path)?;
                path.pop();
            }
            Ok(())
        }
        Value::Array(_) => {
            if matches!(patch, Value::Array(_)) {
                *target = patch.clone();
                Ok(())
            } else {
                Err(PatchError::TypeMismatch(path.join(".")))
            }
        }
        Value::Number(_) => {
            if matches!(patch, Value::Number(_)) {
                *target = patch.clone();
                Ok(())
            } else {
                Err(PatchError::TypeMismatch(path.join(".")))
            }
        }
        Value::String(_) => {
            if matches!(patch, Value::String(_)) {
                *target = patch.clone();
                Ok(())
            } else {
                Err(PatchError::TypeMismatch(path.join(".")))
            }
        }
        Value::Bool(_) => {
            if matches!(patch, Value::Bool(_)) {
                *target = patch.clone();
                Ok(())
            } else {
                Err(PatchError::TypeMismatch(path.join(".")))
            }
        }
        Value::Null => {
            *target = patch.clone();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patch_updates_a_single_field() {
        let config = SimConfig::default();
        let patched = apply_patch(&config, &json!({ "kill_enable": true })).expect("patch");
        assert!(patched.kill_enable);
        assert_eq!(patched.size_x, config.size_x);
    }

    #[test]
    fn patch_updates_numbers_and_lists() {
        let config = SimConfig::default();
        let patched = apply_patch(
            &config,
            &json!({
                "point_mutation_rate": 0.01,
                "survival_criteria": ["left_eighth", "right_eighth"],
            }),
        )
        .expect("patch");
        assert!((patched.point_mutation_rate - 0.01).abs() < 1e-12);
        assert_eq!(patched.survival_criteria.len(), 2);
    }

    #[test]
    fn unknown_option_is_rejected() {
        let config = SimConfig::default();
        let err = apply_patch(&config, &json!({ "does_not_exist": 1 })).expect_err("unknown");
        assert!(matches!(err, PatchError::UnknownPath(path) if path == "does_not_exist"));
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let config = SimConfig::default();
        let err =
            apply_patch(&config, &json!({ "kill_enable": "yes" })).expect_err("mismatch");
        assert!(matches!(err, PatchError::TypeMismatch(path) if path == "kill_enable"));
    }

    #[test]
    fn non_object_patch_is_rejected() {
        let config = SimConfig::default();
        assert!(matches!(
            apply_patch(&config, &json!(42)),
            Err(PatchError::NotAnObject)
        ));
    }
}
