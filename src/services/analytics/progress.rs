//! In-Progress and Blocked Counts
//!
//! The two single-number aggregations: open issues currently in progress and
//! open issues sitting in the configured blocked status.

use serde_json::{json, Value};

use crate::config::GatewayConfig;
use crate::models::Snapshot;

pub fn tasks_in_progress(snapshot: &Snapshot, project_id: Option<i64>) -> Value {
    let count = snapshot
        .project_issues(project_id)
        .iter()
        .filter(|i| i.has_status("in_progress"))
        .count();
    json!({
        "success": true,
        "in_progress_count": count,
        "project_id": project_id,
    })
}

pub fn blocked_tasks(snapshot: &Snapshot, config: &GatewayConfig, project_id: Option<i64>) -> Value {
    let count = snapshot
        .project_issues(project_id)
        .iter()
        .filter(|i| i.has_status(&config.blocked_status))
        .count();
    json!({
        "success": true,
        "blocked_count": count,
        "project_id": project_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::analytics::fixtures::{issue, snapshot, ts};

    fn fixture() -> Snapshot {
        snapshot(
            vec![
                issue(1).status("In Progress").build(),
                issue(2).status("In Progress").build(),
                issue(3).status("Feedback").build(),
                issue(4).build(),
                issue(5).closed(ts(2026, 1, 20)).build(),
                issue(6).project(7).status("In Progress").build(),
            ],
            vec![],
        )
    }

    #[test]
    fn test_in_progress_scoped_to_project() {
        let result = tasks_in_progress(&fixture(), Some(6));
        assert_eq!(result["in_progress_count"], 2);
        assert_eq!(result["project_id"], 6);
    }

    #[test]
    fn test_in_progress_all_projects() {
        let result = tasks_in_progress(&fixture(), None);
        assert_eq!(result["in_progress_count"], 3);
        assert_eq!(result["project_id"], Value::Null);
    }

    #[test]
    fn test_blocked_uses_configured_status() {
        let config = GatewayConfig::for_tests("http://localhost:3000");
        let result = blocked_tasks(&fixture(), &config, Some(6));
        assert_eq!(result["blocked_count"], 1);

        let mut custom = GatewayConfig::for_tests("http://localhost:3000");
        custom.blocked_status = "in_progress".to_string();
        let result = blocked_tasks(&fixture(), &custom, Some(6));
        assert_eq!(result["blocked_count"], 2);
    }
}
