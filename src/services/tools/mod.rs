//! Tool catalogue: trait, registry, and the tool implementations.

pub mod impls;
pub mod trait_def;

use std::sync::Arc;

pub use trait_def::{Tool, ToolCategory, ToolContext, ToolRegistry, ToolResult};

/// Build the full registry. Registration order is the order tools are shown
/// to the model within a category.
pub fn build_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    // tracker-core
    registry.register(Arc::new(impls::issues::ListProjects));
    registry.register(Arc::new(impls::issues::ListIssues));
    registry.register(Arc::new(impls::issues::GetIssue));
    registry.register(Arc::new(impls::issues::ListVersions));
    registry.register(Arc::new(impls::issues::CreateIssue));
    registry.register(Arc::new(impls::issues::UpdateIssue));

    // tracker-analytics
    registry.register(Arc::new(impls::analytics::SprintStatus));
    registry.register(Arc::new(impls::analytics::BacklogAnalytics));
    registry.register(Arc::new(impls::analytics::TeamWorkload));
    registry.register(Arc::new(impls::analytics::CycleTime));
    registry.register(Arc::new(impls::analytics::BugAnalytics));
    registry.register(Arc::new(impls::analytics::ReleaseStatus));
    registry.register(Arc::new(impls::analytics::VelocityTrend));
    registry.register(Arc::new(impls::analytics::Throughput));
    registry.register(Arc::new(impls::analytics::TasksInProgress));
    registry.register(Arc::new(impls::analytics::BlockedTasks));

    // cache-control
    registry.register(Arc::new(impls::cache::CacheControl));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_registry_has_all_tools() {
        let registry = build_registry();
        assert_eq!(registry.len(), 17);
        for name in [
            "tracker_list_projects",
            "tracker_list_issues",
            "tracker_get_issue",
            "tracker_list_versions",
            "tracker_create_issue",
            "tracker_update_issue",
            "tracker_sprint_status",
            "tracker_backlog_analytics",
            "tracker_team_workload",
            "tracker_cycle_time",
            "tracker_bug_analytics",
            "tracker_release_status",
            "tracker_velocity_trend",
            "tracker_throughput",
            "tracker_tasks_in_progress",
            "tracker_blocked_tasks",
            "tracker_cache_control",
        ] {
            assert!(registry.get(name).is_some(), "missing tool {}", name);
        }
    }

    #[test]
    fn test_category_subsets_partition_the_catalogue() {
        let registry = build_registry();
        let enabled = HashMap::new();
        let core = registry.definitions_for_category(ToolCategory::TrackerCore, &enabled);
        let stats = registry.definitions_for_category(ToolCategory::TrackerAnalytics, &enabled);
        let cache = registry.definitions_for_category(ToolCategory::CacheControl, &enabled);
        assert_eq!(core.len(), 6);
        assert_eq!(stats.len(), 10);
        assert_eq!(cache.len(), 1);
        assert_eq!(core.len() + stats.len() + cache.len(), registry.len());
    }

    #[test]
    fn test_definitions_serialize_for_the_wire() {
        let registry = build_registry();
        for def in registry.definitions() {
            let json = serde_json::to_value(&def).unwrap();
            assert!(json["name"].is_string());
            assert!(!json["description"].as_str().unwrap().is_empty());
            assert_eq!(json["input_schema"]["type"], "object");
        }
    }

    #[test]
    fn test_project_id_params_accept_both_forms() {
        let registry = build_registry();
        let defs = registry.definitions();
        let sprint = defs
            .iter()
            .find(|d| d.name == "tracker_sprint_status")
            .unwrap();
        let props = sprint.input_schema.properties.as_ref().unwrap();
        let project = props.get("project_id").unwrap();
        assert_eq!(
            project.schema_type,
            serde_json::json!(["integer", "string"])
        );
    }
}
