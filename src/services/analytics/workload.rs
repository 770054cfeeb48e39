//! Team Workload
//!
//! Open-issue distribution per assignee, with unassigned work grouped under
//! the literal "Unassigned".

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::config::GatewayConfig;
use crate::models::Snapshot;

pub const UNASSIGNED: &str = "Unassigned";

pub fn team_workload(snapshot: &Snapshot, config: &GatewayConfig, project_id: Option<i64>) -> Value {
    let open: Vec<_> = snapshot
        .project_issues(project_id)
        .into_iter()
        .filter(|i| i.is_open())
        .collect();

    let mut workload: BTreeMap<String, u64> = BTreeMap::new();
    let mut unassigned: u64 = 0;
    for issue in &open {
        let member = match issue.assignee_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                unassigned += 1;
                UNASSIGNED.to_string()
            }
        };
        *workload.entry(member).or_insert(0) += 1;
    }

    // Unassigned work is visible in the map but a backlog bucket is not an
    // overloaded person.
    let overloaded: BTreeMap<&String, u64> = workload
        .iter()
        .filter(|(name, count)| **count > config.overload_threshold && name.as_str() != UNASSIGNED)
        .map(|(name, count)| (name, *count))
        .collect();

    json!({
        "success": true,
        "workload_by_member": workload,
        "total_open_issues": open.len(),
        "unassigned_issues": unassigned,
        "team_size": workload.len(),
        "overloaded_members": overloaded,
    })
}
