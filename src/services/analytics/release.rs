//! Release Status
//!
//! Completion per tracker version. A named version yields a single-element
//! list; otherwise every version of the project is reported.

use serde_json::{json, Value};

use crate::models::{Snapshot, VersionRecord};

use super::percentage;

pub fn release_status(
    snapshot: &Snapshot,
    project_id: Option<i64>,
    version_name: Option<&str>,
) -> Value {
    let versions = snapshot.project_versions(project_id);

    let targets: Vec<&VersionRecord> = match version_name {
        Some(name) => {
            let needle = name.to_lowercase();
            versions
                .into_iter()
                .filter(|v| v.name.to_lowercase().contains(&needle))
                .collect()
        }
        None => versions,
    };

    if targets.is_empty() {
        if let Some(name) = version_name {
            return json!({
                "success": false,
                "error": format!("no version matching '{}' found", name),
            });
        }
    }

    let issues = snapshot.project_issues(project_id);
    let releases: Vec<Value> = targets
        .iter()
        .map(|version| {
            let on_version: Vec<_> = issues
                .iter()
                .filter(|i| i.fixed_version_id == Some(version.id))
                .collect();
            let total = on_version.len();
            let closed = on_version.iter().filter(|i| i.is_closed()).count();
            json!({
                "version_name": version.name,
                "total_issues": total,
                "closed_issues": closed,
                "open_issues": total - closed,
                "completion_percentage": percentage(closed, total),
                "due_date": version.due_date,
            })
        })
        .collect();

    json!({ "success": true, "releases": releases })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VersionStatus;
    use crate::services::analytics::fixtures::{date, issue, snapshot, ts, version};

    fn fixture() -> Snapshot {
        let issues = vec![
            issue(1).version(3, "1.0").closed(ts(2026, 1, 10)).build(),
            issue(2).version(3, "1.0").build(),
            issue(3).version(4, "1.1").build(),
        ];
        snapshot(
            issues,
            vec![
                version(3, "1.0", VersionStatus::Open, Some(date(2026, 2, 1))),
                version(4, "1.1", VersionStatus::Open, None),
            ],
        )
    }

    #[test]
    fn test_all_versions_listed() {
        let result = release_status(&fixture(), Some(6), None);
        let releases = result["releases"].as_array().unwrap();
        assert_eq!(releases.len(), 2);
        assert_eq!(releases[0]["version_name"], "1.0");
        assert_eq!(releases[0]["total_issues"], 2);
        assert_eq!(releases[0]["closed_issues"], 1);
        assert_eq!(releases[0]["open_issues"], 1);
        assert_eq!(releases[0]["completion_percentage"], 50.0);
        assert_eq!(releases[0]["due_date"], "2026-02-01");
    }

    #[test]
    fn test_named_version_yields_single_entry() {
        let result = release_status(&fixture(), Some(6), Some("1.1"));
        let releases = result["releases"].as_array().unwrap();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0]["version_name"], "1.1");
        assert_eq!(releases[0]["completion_percentage"], 0.0);
        assert_eq!(releases[0]["due_date"], Value::Null);
    }

    #[test]
    fn test_unknown_version_is_an_error() {
        let result = release_status(&fixture(), Some(6), Some("9.9"));
        assert_eq!(result["success"], false);
    }

    #[test]
    fn test_project_without_versions() {
        let snap = snapshot(vec![], vec![]);
        let result = release_status(&snap, Some(6), None);
        assert_eq!(result["success"], true);
        assert_eq!(result["releases"].as_array().unwrap().len(), 0);
    }
}
