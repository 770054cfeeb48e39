//! Velocity Trend
//!
//! Completed-issue velocity over the most recent closed sprints, oldest
//! first, with a ±10% band deciding the trend.

use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::models::{Snapshot, VersionRecord, VersionStatus};

use super::round1;

pub const DEFAULT_SPRINTS: usize = 5;

pub fn velocity_trend(snapshot: &Snapshot, project_id: Option<i64>, sprints: usize) -> Value {
    let mut closed_versions: Vec<&VersionRecord> = snapshot
        .project_versions(project_id)
        .into_iter()
        .filter(|v| v.status == VersionStatus::Closed)
        .collect();
    // Most recent N by due date, reported oldest → newest. Versions without
    // a due date sort oldest.
    closed_versions.sort_by_key(|v| v.due_date.unwrap_or(NaiveDate::MIN));
    let skip = closed_versions.len().saturating_sub(sprints);
    let recent = &closed_versions[skip..];

    let issues = snapshot.project_issues(project_id);
    let per_sprint: Vec<Value> = recent
        .iter()
        .map(|version| {
            let completed = issues
                .iter()
                .filter(|i| i.fixed_version_id == Some(version.id) && i.is_closed())
                .count();
            json!({
                "sprint": version.name,
                "due_date": version.due_date,
                "completed_issues": completed,
            })
        })
        .collect();

    let values: Vec<f64> = per_sprint
        .iter()
        .map(|v| v["completed_issues"].as_u64().unwrap_or(0) as f64)
        .collect();
    let average = if values.is_empty() {
        0.0
    } else {
        round1(values.iter().sum::<f64>() / values.len() as f64)
    };

    let trend = match (values.first(), values.last()) {
        (Some(&first), Some(&last)) if values.len() >= 2 => {
            if last > first * 1.1 {
                "increasing"
            } else if last < first * 0.9 {
                "decreasing"
            } else {
                "stable"
            }
        }
        _ => "stable",
    };

    json!({
        "success": true,
        "sprints_analyzed": per_sprint.len(),
        "average_velocity": average,
        "velocity_trend": trend,
        "per_sprint": per_sprint,
    })
}
