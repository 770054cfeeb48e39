//! Direct Counts
//!
//! Exact live cardinalities straight from the tracker's `total_count` field,
//! bypassing the cache and its page cap. Used for bug counts, sprint sizes,
//! and backlog totals when the snapshot is unavailable or exactness matters.

use serde_json::{json, Value};

use crate::config::GatewayConfig;
use crate::services::tracker::{IssueQuery, TrackerClient, TrackerError};

use super::percentage;

/// Open/closed/total bug counts for a project (or all projects).
pub async fn bug_count(
    tracker: &TrackerClient,
    config: &GatewayConfig,
    project_id: Option<i64>,
) -> Result<Value, TrackerError> {
    let bug_tracker = config.tracker_id("bug").unwrap_or(1);

    let open = tracker
        .count_issues(
            &IssueQuery::new()
                .project(project_id)
                .status("open")
                .tracker(bug_tracker),
        )
        .await?;
    let total = tracker
        .count_issues(
            &IssueQuery::new()
                .project(project_id)
                .status("*")
                .tracker(bug_tracker),
        )
        .await?;

    Ok(json!({
        "success": true,
        "bug_metrics": {
            "open_bugs": open,
            "closed_bugs": total.saturating_sub(open),
            "total_bugs": total,
            "project_id": project_id,
        },
    }))
}

/// Committed/completed/remaining for a sprint, or for the whole project when
/// no version id is known.
pub async fn sprint_count(
    tracker: &TrackerClient,
    project_id: Option<i64>,
    fixed_version_id: Option<i64>,
) -> Result<Value, TrackerError> {
    let scoped = |status: &str| {
        let mut query = IssueQuery::new().project(project_id).status(status);
        if let Some(version) = fixed_version_id {
            query = query.fixed_version(version);
        }
        query
    };

    let open = tracker.count_issues(&scoped("open")).await?;
    let closed = tracker.count_issues(&scoped("closed")).await?;
    let committed = open + closed;

    Ok(json!({
        "success": true,
        "sprint": null,
        "metrics": {
            "committed": committed,
            "completed": closed,
            "remaining": open,
            "completion_percentage": percentage(closed as usize, committed as usize),
        },
    }))
}

/// Total open issues for a project (or all projects).
pub async fn backlog_count(
    tracker: &TrackerClient,
    project_id: Option<i64>,
) -> Result<Value, TrackerError> {
    let total = tracker
        .count_issues(&IssueQuery::new().project(project_id).status("open"))
        .await?;

    Ok(json!({
        "success": true,
        "backlog": {
            "total_open": total,
            "project_id": project_id,
        },
    }))
}
