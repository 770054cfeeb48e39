//! Cache Control
//!
//! One tool and one shared action function. The HTTP control endpoint and
//! the tool both dispatch through `cache_control_action` so the wire shape
//! stays identical.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::services::cache::CacheEngine;
use crate::services::llm::types::ParameterSchema;
use crate::services::tools::trait_def::{Tool, ToolCategory, ToolContext, ToolResult};

/// Execute one cache-control action and produce the wire response.
pub async fn cache_control_action(cache: &Arc<CacheEngine>, action: &str) -> Value {
    match action {
        "on" => {
            let already = cache.is_enabled() && cache.is_initialized();
            match cache.enable().await {
                Ok(info) => json!({
                    "success": true,
                    "status": "enabled",
                    "message": if already {
                        "cache is already enabled"
                    } else {
                        "cache enabled and initialized"
                    },
                    "cache_info": info,
                }),
                Err(err) => json!({
                    "success": false,
                    "error": format!("failed to initialize cache: {}", err),
                    "kind": err.kind(),
                }),
            }
        }
        "off" => {
            let info = cache.disable();
            json!({
                "success": true,
                "status": "disabled",
                "message": "cache disabled; analytics fall back to direct tracker queries",
                "cache_info": info,
            })
        }
        "refresh" => match cache.refresh().await {
            Ok(info) => json!({
                "success": true,
                "status": "enabled",
                "message": "cache refreshed",
                "cache_info": info,
            }),
            Err(err) => json!({
                "success": false,
                "error": format!("failed to refresh cache: {}", err),
                "kind": err.kind(),
            }),
        },
        "status" => {
            let info = cache.status();
            json!({
                "success": true,
                "status": if info.enabled { "enabled" } else { "disabled" },
                "cache_info": info,
            })
        }
        other => json!({
            "success": false,
            "error": format!(
                "unknown action: {}. Use 'on', 'off', 'refresh', or 'status'",
                other
            ),
        }),
    }
}

pub struct CacheControl;

#[async_trait]
impl Tool for CacheControl {
    fn name(&self) -> &str {
        "tracker_cache_control"
    }

    fn description(&self) -> &str {
        "Control the analytics cache (on/off/refresh/status). The cache enables fast \
         aggregate analytics."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::CacheControl
    }

    fn parameters_schema(&self) -> ParameterSchema {
        super::schema(
            "Cache control parameters",
            vec![(
                "action",
                ParameterSchema::string_enum(
                    Some("'on' to enable, 'off' to disable, 'refresh' to update, 'status' to inspect"),
                    &["on", "off", "refresh", "status"],
                ),
            )],
            &["action"],
        )
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> ToolResult {
        let action = args
            .get("action")
            .and_then(Value::as_str)
            .unwrap_or("status");
        ToolResult::ok(cache_control_action(&ctx.cache, action).await)
    }
}
