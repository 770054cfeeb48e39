//! Sprint Status
//!
//! Commitment, completion, and burndown for one sprint (tracker version).

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::config::GatewayConfig;
use crate::models::Snapshot;

use super::{percentage, round1};

/// Sprint status over the snapshot.
///
/// Version resolution: an explicit name matches issues by their fixed-version
/// name (so data survives even when the versions endpoint was denied during
/// refresh); with no name, the open version with the nearest due date is the
/// current sprint. A project with no resolvable sprint reports zeroed
/// metrics and `sprint: null`.
pub fn sprint_status(
    snapshot: &Snapshot,
    config: &GatewayConfig,
    project_id: Option<i64>,
    version_name: Option<&str>,
) -> Value {
    let issues = snapshot.project_issues(project_id);

    let (base, sprint) = match version_name {
        Some(name) => {
            let needle = name.to_lowercase();
            let base: Vec<_> = issues
                .iter()
                .copied()
                .filter(|i| {
                    i.fixed_version_name
                        .as_deref()
                        .is_some_and(|v| v.to_lowercase() == needle)
                })
                .collect();
            let sprint = match snapshot.find_version(project_id, name) {
                Some(v) => json!({ "name": v.name, "due_date": v.due_date }),
                None => json!({ "name": name, "due_date": null }),
            };
            (base, sprint)
        }
        None => match snapshot.active_version(project_id) {
            Some(v) => {
                let base: Vec<_> = issues
                    .iter()
                    .copied()
                    .filter(|i| i.fixed_version_id == Some(v.id))
                    .collect();
                (base, json!({ "name": v.name, "due_date": v.due_date }))
            }
            None => (Vec::new(), Value::Null),
        },
    };

    let committed = base.len();
    let completed = base.iter().filter(|i| i.is_closed()).count();
    let in_progress = base.iter().filter(|i| i.has_status("in_progress")).count();
    let blocked = base
        .iter()
        .filter(|i| i.has_status(&config.blocked_status))
        .count();
    let remaining = committed - completed;
    let completion_pct = percentage(completed, committed);

    let total_estimated: f64 = base.iter().filter_map(|i| i.estimated_hours).sum();
    let total_spent: f64 = base.iter().filter_map(|i| i.spent_hours).sum();

    let mut breakdown_by_status: BTreeMap<String, usize> = BTreeMap::new();
    for issue in &base {
        *breakdown_by_status
            .entry(issue.status_name.clone())
            .or_insert(0) += 1;
    }

    json!({
        "success": true,
        "sprint": sprint,
        "metrics": {
            "committed": committed,
            "completed": completed,
            "in_progress": in_progress,
            "blocked": blocked,
            "remaining": remaining,
            "completion_percentage": completion_pct,
            "total_estimated_hours": round1(total_estimated),
            "total_spent_hours": round1(total_spent),
        },
        "breakdown_by_status": breakdown_by_status,
        "burndown_assessment": if completion_pct >= 50.0 { "on_track" } else { "behind" },
    })
}
