//! Tool implementations, grouped by category.

pub mod analytics;
pub mod cache;
pub mod issues;

use std::collections::HashMap;

use serde_json::Value;

use crate::config::{GatewayConfig, ProjectIdent};
use crate::services::llm::types::ParameterSchema;
use crate::services::tools::trait_def::ToolResult;
use crate::utils::error::AppError;

/// Resolve the optional `project_id` argument (numeric id, numeric string,
/// or alias). Unknown names short-circuit into the contractual
/// `unknown project` failure.
pub(crate) fn resolve_project(
    config: &GatewayConfig,
    args: &Value,
) -> Result<Option<i64>, ToolResult> {
    let raw = match args.get("project_id") {
        None | Some(Value::Null) => return Ok(None),
        Some(raw) => raw,
    };
    let ident: ProjectIdent = serde_json::from_value(raw.clone()).map_err(|_| {
        ToolResult::from_error(&AppError::ToolArgument(
            "project_id must be an integer id or a string name".to_string(),
        ))
    })?;
    match config.normalize_project_id(&ident) {
        Some(id) => Ok(Some(id)),
        None => {
            let label = match ident {
                ProjectIdent::Name(name) => name,
                ProjectIdent::Id(id) => id.to_string(),
            };
            Err(ToolResult::from_error(&AppError::unknown_project(label)))
        }
    }
}

/// Required integer argument.
pub(crate) fn require_i64(args: &Value, name: &str) -> Result<i64, ToolResult> {
    args.get(name).and_then(Value::as_i64).ok_or_else(|| {
        ToolResult::from_error(&AppError::ToolArgument(format!(
            "{} is required and must be an integer",
            name
        )))
    })
}

/// Required string argument.
pub(crate) fn require_str<'a>(args: &'a Value, name: &str) -> Result<&'a str, ToolResult> {
    args.get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ToolResult::from_error(&AppError::ToolArgument(format!(
                "{} is required and must be a string",
                name
            )))
        })
}

pub(crate) fn optional_str<'a>(args: &'a Value, name: &str) -> Option<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty() && *s != "null")
}

pub(crate) fn optional_usize(args: &Value, name: &str) -> Option<usize> {
    match args.get(name) {
        Some(Value::Number(n)) => n.as_u64().map(|v| v as usize),
        // Models sometimes send numbers as strings.
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

/// The shared `project_id` parameter schema.
pub(crate) fn project_id_param() -> ParameterSchema {
    ParameterSchema::integer_or_string(Some(
        "Project ID or name (e.g. 6 or 'ncel'). Optional; omit for all projects.",
    ))
}

pub(crate) fn schema(
    description: &str,
    properties: Vec<(&str, ParameterSchema)>,
    required: &[&str],
) -> ParameterSchema {
    let props: HashMap<String, ParameterSchema> = properties
        .into_iter()
        .map(|(name, schema)| (name.to_string(), schema))
        .collect();
    ParameterSchema::object(
        Some(description),
        props,
        required.iter().map(|r| r.to_string()).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GatewayConfig {
        GatewayConfig::for_tests("http://localhost:3000")
    }

    #[test]
    fn test_resolve_project_absent_is_none() {
        let args = serde_json::json!({});
        assert_eq!(resolve_project(&config(), &args).unwrap(), None);
        let args = serde_json::json!({ "project_id": null });
        assert_eq!(resolve_project(&config(), &args).unwrap(), None);
    }

    #[test]
    fn test_resolve_project_both_forms() {
        let by_id = serde_json::json!({ "project_id": 6 });
        let by_name = serde_json::json!({ "project_id": "NCEL" });
        assert_eq!(resolve_project(&config(), &by_id).unwrap(), Some(6));
        assert_eq!(resolve_project(&config(), &by_name).unwrap(), Some(6));
    }

    #[test]
    fn test_resolve_project_unknown_is_contract_error() {
        let args = serde_json::json!({ "project_id": "atlantis" });
        let result = resolve_project(&config(), &args).unwrap_err();
        assert!(!result.success);
        assert_eq!(result.payload["kind"], "unknown_project");
        assert!(result.payload["error"]
            .as_str()
            .unwrap()
            .to_lowercase()
            .contains("unknown project"));
    }

    #[test]
    fn test_optional_usize_parses_string_numbers() {
        let args = serde_json::json!({ "weeks": "6" });
        assert_eq!(optional_usize(&args, "weeks"), Some(6));
        let args = serde_json::json!({ "weeks": 4 });
        assert_eq!(optional_usize(&args, "weeks"), Some(4));
        let args = serde_json::json!({ "weeks": "many" });
        assert_eq!(optional_usize(&args, "weeks"), None);
    }

    #[test]
    fn test_require_helpers() {
        let args = serde_json::json!({ "issue_id": 42, "subject": "title" });
        assert_eq!(require_i64(&args, "issue_id").unwrap(), 42);
        assert_eq!(require_str(&args, "subject").unwrap(), "title");
        assert!(require_i64(&args, "missing").is_err());
        assert!(require_str(&args, "missing").is_err());
    }
}
