use ibis_observability::{TracingContext, TracingError};
use serde_json::{Map, Value};

use crate::schema::ValidConfig;

const FALLBACK: &str = "None";

/// Publish per-request association properties to the run's tracing context.
///
/// `user_id` and `session_id` are removed from the metadata even when
/// publishing fails.
pub fn set_tracing_properties(config: &mut ValidConfig, ctx: &mut TracingContext) -> Result<(), TracingError> {
    let user_id = config.metadata.remove("user_id");
    let session_id = config.metadata.remove("session_id");

    let mut properties = Map::new();
    properties.insert("log_type".to_string(), Value::String("tracing".to_string()));
    properties.insert("run_id".to_string(), Value::String(config.run_id.clone()));
    properties.insert("user_id".to_string(), user_id.unwrap_or_else(fallback));
    properties.insert("session_id".to_string(), session_id.unwrap_or_else(fallback));
    properties.insert(
        "commit_sha".to_string(),
        Value::String(std::env::var("COMMIT_SHA").unwrap_or_else(|_| FALLBACK.to_string())),
    );

    ctx.set_association_properties(properties)
}

fn fallback() -> Value {
    Value::String(FALLBACK.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ensure_valid_config;
    use serde_json::json;

    fn config_with(metadata: Value) -> ValidConfig {
        let mut config = ensure_valid_config(None);
        config.run_id = "run-1".to_string();
        config.metadata = metadata.as_object().cloned().unwrap();
        config
    }

    #[test]
    fn test_properties_published_and_keys_consumed() {
        let mut config = config_with(json!({"user_id": "u1", "session_id": "s1", "other": 1}));
        let mut ctx = TracingContext::new();

        set_tracing_properties(&mut config, &mut ctx).unwrap();

        assert_eq!(ctx.get("log_type"), Some(&json!("tracing")));
        assert_eq!(ctx.get("run_id"), Some(&json!("run-1")));
        assert_eq!(ctx.get("user_id"), Some(&json!("u1")));
        assert_eq!(ctx.get("session_id"), Some(&json!("s1")));
        assert!(ctx.get("commit_sha").is_some());
        assert!(!config.metadata.contains_key("user_id"));
        assert!(!config.metadata.contains_key("session_id"));
        assert_eq!(config.metadata["other"], 1);
    }

    #[test]
    fn test_missing_ids_fall_back() {
        let mut config = config_with(json!({}));
        let mut ctx = TracingContext::new();

        set_tracing_properties(&mut config, &mut ctx).unwrap();

        assert_eq!(ctx.get("user_id"), Some(&json!("None")));
        assert_eq!(ctx.get("session_id"), Some(&json!("None")));
    }

    #[test]
    fn test_non_scalar_value_fails_but_keys_removed() {
        let mut config = config_with(json!({"user_id": {"nested": true}, "session_id": "s1"}));
        let mut ctx = TracingContext::new();

        let err = set_tracing_properties(&mut config, &mut ctx).unwrap_err();

        assert_eq!(err, TracingError::NonScalarProperty { key: "user_id".to_string() });
        assert!(ctx.is_empty());
        assert!(config.metadata.is_empty());
    }
}
