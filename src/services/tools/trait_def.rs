//! Tool Trait and Registry
//!
//! Defines the unified `Tool` trait interface and the categorized
//! `ToolRegistry` used for phase-2 tool exposure. Tools are registered once
//! at startup and dispatched dynamically by name; the registry also produces
//! the per-category definition subsets shown to the model.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::GatewayConfig;
use crate::services::cache::CacheEngine;
use crate::services::llm::types::{ParameterSchema, ToolDefinition};
use crate::services::tracker::TrackerClient;
use crate::utils::error::AppError;

/// The closed set of tool categories used in phase-1 selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolCategory {
    TrackerCore,
    TrackerAnalytics,
    CacheControl,
}

impl ToolCategory {
    /// Match order matters: analytic terms win over the generic issue
    /// vocabulary, and cache vocabulary wins over core.
    pub fn all() -> [ToolCategory; 3] {
        [
            ToolCategory::TrackerAnalytics,
            ToolCategory::CacheControl,
            ToolCategory::TrackerCore,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCategory::TrackerCore => "tracker-core",
            ToolCategory::TrackerAnalytics => "tracker-analytics",
            ToolCategory::CacheControl => "cache-control",
        }
    }

    pub fn parse(name: &str) -> Option<ToolCategory> {
        match name {
            "tracker-core" => Some(ToolCategory::TrackerCore),
            "tracker-analytics" => Some(ToolCategory::TrackerAnalytics),
            "cache-control" => Some(ToolCategory::CacheControl),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolCategory::TrackerCore => "List, inspect, create, and update tracker issues",
            ToolCategory::TrackerAnalytics => {
                "Sprint, backlog, bug, workload, velocity, and throughput analytics"
            }
            ToolCategory::CacheControl => "Enable, disable, refresh, or inspect the analytics cache",
        }
    }

    /// Distinguishing terms for the phase-1 keyword prefilter.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            ToolCategory::TrackerAnalytics => &[
                "sprint",
                "backlog",
                "bug",
                "bugs",
                "velocity",
                "burndown",
                "throughput",
                "workload",
                "cycle",
                "lead time",
                "release",
                "analytics",
                "metrics",
                "trend",
                "committed",
                "blocked",
                "in progress",
            ],
            ToolCategory::CacheControl => &["cache", "snapshot", "refresh"],
            ToolCategory::TrackerCore => &[
                "issue", "issues", "ticket", "tickets", "project", "projects", "task", "tasks",
                "version", "create", "update",
            ],
        }
    }
}

impl std::fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared state handed to every tool execution.
pub struct ToolContext {
    pub config: Arc<GatewayConfig>,
    pub tracker: Arc<TrackerClient>,
    pub cache: Arc<CacheEngine>,
    /// Cooperative cancellation: tools abandon work at their next await when
    /// the inbound request is gone.
    pub cancellation_token: CancellationToken,
}

/// Result of a tool execution. The payload is the exact JSON object fed back
/// to the model and, for analytics, surfaced verbatim to the renderer.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub success: bool,
    pub payload: Value,
}

impl ToolResult {
    pub fn ok(payload: Value) -> Self {
        let success = payload
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        Self { success, payload }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: serde_json::json!({
                "success": false,
                "error": message.into(),
            }),
        }
    }

    pub fn from_error(err: &AppError) -> Self {
        Self {
            success: false,
            payload: serde_json::json!({
                "success": false,
                "error": err.to_string(),
                "kind": err.kind(),
            }),
        }
    }

    /// Serialized form for the tool-role message.
    pub fn to_content(&self) -> String {
        serde_json::to_string_pretty(&self.payload).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Unified tool interface. Each tool declares its identity, category, and
/// parameter schema, and executes against the shared context.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn category(&self) -> ToolCategory;

    /// JSON schema describing the tool's input parameters.
    fn parameters_schema(&self) -> ParameterSchema;

    async fn execute(&self, ctx: &ToolContext, args: Value) -> ToolResult;
}

/// Registry of available tools with O(1) lookup and deterministic ordering.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Insertion order for deterministic iteration
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a tool. A tool with the same name replaces the previous one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if !self.tools.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// All definitions in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.parameters_schema(),
            })
            .collect()
    }

    /// Definitions in one category, honoring the deployer's enabled set.
    /// Categories absent from the set default to enabled.
    pub fn definitions_for_category(
        &self,
        category: ToolCategory,
        enabled: &HashMap<String, bool>,
    ) -> Vec<ToolDefinition> {
        if !*enabled.get(category.as_str()).unwrap_or(&true) {
            return Vec::new();
        }
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .filter(|tool| tool.category() == category)
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.parameters_schema(),
            })
            .collect()
    }

    /// Tool metadata for the listing endpoint.
    pub fn catalogue(&self) -> Vec<(String, String, ToolCategory)> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| {
                (
                    tool.name().to_string(),
                    tool.description().to_string(),
                    tool.category(),
                )
            })
            .collect()
    }

    /// Execute a tool by name. Unknown names produce a tool-level error
    /// result, never a panic, so the model can recover within the loop.
    pub async fn execute(&self, name: &str, ctx: &ToolContext, args: Value) -> ToolResult {
        match self.tools.get(name) {
            Some(tool) => tool.execute(ctx, args).await,
            None => ToolResult::from_error(&AppError::UnknownTool(name.to_string())),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockTool {
        tool_name: String,
        tool_category: ToolCategory,
    }

    impl MockTool {
        fn new(name: &str, category: ToolCategory) -> Self {
            Self {
                tool_name: name.to_string(),
                tool_category: category,
            }
        }
    }

    #[async_trait]
    impl Tool for MockTool {
        fn name(&self) -> &str {
            &self.tool_name
        }

        fn description(&self) -> &str {
            "A mock tool"
        }

        fn category(&self) -> ToolCategory {
            self.tool_category
        }

        fn parameters_schema(&self) -> ParameterSchema {
            ParameterSchema::object(None, HashMap::new(), vec![])
        }

        async fn execute(&self, _ctx: &ToolContext, _args: Value) -> ToolResult {
            ToolResult::ok(serde_json::json!({"success": true, "tool": self.tool_name}))
        }
    }

    fn make_test_context() -> ToolContext {
        let config = Arc::new(GatewayConfig::for_tests("http://127.0.0.1:1"));
        let tracker = Arc::new(TrackerClient::new(&config));
        let cache = Arc::new(CacheEngine::new(Arc::clone(&config), Arc::clone(&tracker)));
        ToolContext {
            config,
            tracker,
            cache,
            cancellation_token: CancellationToken::new(),
        }
    }

    #[test]
    fn test_category_round_trip() {
        for category in ToolCategory::all() {
            assert_eq!(ToolCategory::parse(category.as_str()), Some(category));
        }
        assert_eq!(ToolCategory::parse("music"), None);
    }

    #[test]
    fn test_registry_register_and_definitions_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(MockTool::new("b_tool", ToolCategory::TrackerCore)));
        registry.register(Arc::new(MockTool::new(
            "a_tool",
            ToolCategory::TrackerAnalytics,
        )));

        let defs = registry.definitions();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].name, "b_tool");
        assert_eq!(defs[1].name, "a_tool");
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(MockTool::new("t", ToolCategory::TrackerCore)));
        registry.register(Arc::new(MockTool::new("t", ToolCategory::CacheControl)));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("t").unwrap().category(),
            ToolCategory::CacheControl
        );
    }

    #[test]
    fn test_definitions_for_category_filters() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(MockTool::new("core", ToolCategory::TrackerCore)));
        registry.register(Arc::new(MockTool::new(
            "stats",
            ToolCategory::TrackerAnalytics,
        )));

        let enabled = HashMap::new();
        let defs = registry.definitions_for_category(ToolCategory::TrackerAnalytics, &enabled);
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "stats");
    }

    #[test]
    fn test_disabled_category_yields_no_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(MockTool::new("core", ToolCategory::TrackerCore)));

        let enabled = HashMap::from([("tracker-core".to_string(), false)]);
        let defs = registry.definitions_for_category(ToolCategory::TrackerCore, &enabled);
        assert!(defs.is_empty());
    }

    #[tokio::test]
    async fn test_execute_unknown_tool_is_recoverable() {
        let registry = ToolRegistry::new();
        let ctx = make_test_context();
        let result = registry.execute("nonexistent", &ctx, Value::Null).await;
        assert!(!result.success);
        assert_eq!(result.payload["kind"], "unknown_tool");
    }

    #[tokio::test]
    async fn test_execute_known_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(MockTool::new("t", ToolCategory::TrackerCore)));
        let ctx = make_test_context();
        let result = registry.execute("t", &ctx, Value::Null).await;
        assert!(result.success);
        assert_eq!(result.payload["tool"], "t");
    }

    #[test]
    fn test_tool_result_reads_success_from_payload() {
        let failed = ToolResult::ok(serde_json::json!({"success": false, "error": "nope"}));
        assert!(!failed.success);
        let passed = ToolResult::ok(serde_json::json!({"success": true}));
        assert!(passed.success);
    }

    #[test]
    fn test_tool_result_content_is_json() {
        let result = ToolResult::err("boom");
        let parsed: Value = serde_json::from_str(&result.to_content()).unwrap();
        assert_eq!(parsed["success"], false);
        assert_eq!(parsed["error"], "boom");
    }
}
