//! Bug Analytics
//!
//! Defect totals, critical-open pressure, bug-to-story ratio, and average
//! resolution time over the snapshot.

use serde_json::{json, Value};

use crate::models::Snapshot;

use super::{mean, round2};

pub fn bug_analytics(snapshot: &Snapshot, project_id: Option<i64>) -> Value {
    let issues = snapshot.project_issues(project_id);
    let bugs: Vec<_> = issues
        .iter()
        .copied()
        .filter(|i| i.has_tracker("bug"))
        .collect();

    let total_bugs = bugs.len();
    let open_bugs: Vec<_> = bugs.iter().copied().filter(|i| i.is_open()).collect();
    let closed_bugs = total_bugs - open_bugs.len();

    let count_priority = |name: &str| {
        open_bugs
            .iter()
            .filter(|i| i.priority_name.eq_ignore_ascii_case(name))
            .count()
    };
    let high = count_priority("high");
    let urgent = count_priority("urgent");
    let immediate = count_priority("immediate");

    let open_stories = issues
        .iter()
        .filter(|i| i.has_tracker("story") && i.is_open())
        .count();
    let bug_to_story_ratio = if open_stories > 0 {
        Some(round2(open_bugs.len() as f64 / open_stories as f64))
    } else {
        None
    };

    let resolution_days: Vec<f64> = bugs
        .iter()
        .filter_map(|i| {
            i.closed_on
                .map(|closed| (closed - i.created_on).num_seconds() as f64 / 86_400.0)
        })
        .collect();

    json!({
        "success": true,
        "bug_metrics": {
            "total_bugs": total_bugs,
            "open_bugs": open_bugs.len(),
            "closed_bugs": closed_bugs,
            "critical_open": {
                "high": high,
                "urgent": urgent,
                "immediate": immediate,
                "total_critical": high + urgent + immediate,
            },
            "bug_to_story_ratio": bug_to_story_ratio,
            "average_resolution_days": mean(&resolution_days),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::analytics::fixtures::{issue, snapshot, ts};

    /// The seed fixture: 3 bugs (2 closed, 1 open urgent), 2 stories
    /// (1 closed).
    fn seed() -> Vec<crate::models::IssueRecord> {
        vec![
            issue(1).tracker("Bug").closed(ts(2026, 1, 10)).build(),
            issue(2).tracker("Bug").closed(ts(2026, 1, 12)).build(),
            issue(3).tracker("Bug").priority("Urgent").build(),
            issue(4).tracker("Story").closed(ts(2026, 1, 14)).build(),
            issue(5).tracker("Story").build(),
        ]
    }

    #[test]
    fn test_seed_fixture_metrics() {
        let snap = snapshot(seed(), vec![]);
        let result = bug_analytics(&snap, Some(6));
        let metrics = &result["bug_metrics"];
        assert_eq!(result["success"], true);
        assert_eq!(metrics["total_bugs"], 3);
        assert_eq!(metrics["open_bugs"], 1);
        assert_eq!(metrics["closed_bugs"], 2);
        assert_eq!(metrics["critical_open"]["urgent"], 1);
        assert_eq!(metrics["critical_open"]["total_critical"], 1);
        assert_eq!(metrics["bug_to_story_ratio"], 1.0);
    }

    #[test]
    fn test_total_equals_open_plus_closed() {
        let snap = snapshot(seed(), vec![]);
        let result = bug_analytics(&snap, Some(6));
        let metrics = &result["bug_metrics"];
        assert_eq!(
            metrics["total_bugs"].as_u64().unwrap(),
            metrics["open_bugs"].as_u64().unwrap() + metrics["closed_bugs"].as_u64().unwrap()
        );
    }

    #[test]
    fn test_no_open_stories_yields_null_ratio() {
        let issues = vec![
            issue(1).tracker("Bug").build(),
            issue(2).tracker("Story").closed(ts(2026, 1, 10)).build(),
        ];
        let snap = snapshot(issues, vec![]);
        let result = bug_analytics(&snap, Some(6));
        assert_eq!(result["bug_metrics"]["bug_to_story_ratio"], Value::Null);
    }

    #[test]
    fn test_resolution_days() {
        let issues = vec![
            issue(1)
                .tracker("Bug")
                .created(ts(2026, 1, 1))
                .closed(ts(2026, 1, 5))
                .build(),
            issue(2)
                .tracker("Bug")
                .created(ts(2026, 1, 1))
                .closed(ts(2026, 1, 11))
                .build(),
        ];
        let snap = snapshot(issues, vec![]);
        let result = bug_analytics(&snap, Some(6));
        assert_eq!(result["bug_metrics"]["average_resolution_days"], 7.0);
    }

    #[test]
    fn test_empty_sample_means_null_resolution() {
        let snap = snapshot(vec![issue(1).tracker("Bug").build()], vec![]);
        let result = bug_analytics(&snap, Some(6));
        assert_eq!(
            result["bug_metrics"]["average_resolution_days"],
            Value::Null
        );
    }
}
