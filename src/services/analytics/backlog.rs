//! Backlog Analytics
//!
//! Open-issue totals, priority pressure, estimation coverage, aging, and the
//! current calendar month's churn.

use chrono::{DateTime, Datelike, Utc};
use serde_json::{json, Value};

use crate::models::Snapshot;

use super::{mean, percentage};

pub fn backlog_analytics(snapshot: &Snapshot, project_id: Option<i64>, now: DateTime<Utc>) -> Value {
    let issues = snapshot.project_issues(project_id);
    let open: Vec<_> = issues.iter().copied().filter(|i| i.is_open()).collect();

    let total_open = open.len();
    let high_priority_open = open.iter().filter(|i| i.is_critical()).count();
    let unestimated = open
        .iter()
        .filter(|i| i.estimated_hours.map_or(true, |h| h == 0.0))
        .count();

    let ages: Vec<f64> = open
        .iter()
        .map(|i| (now - i.created_on).num_seconds() as f64 / 86_400.0)
        .collect();

    let created_this_month = issues
        .iter()
        .filter(|i| same_month(i.created_on, now))
        .count();
    let closed_this_month = issues
        .iter()
        .filter(|i| i.closed_on.is_some_and(|c| same_month(c, now)))
        .count();

    json!({
        "success": true,
        "backlog": {
            "total_open": total_open,
            "high_priority_open": high_priority_open,
            "unestimated_percentage": percentage(unestimated, total_open),
        },
        "aging": {
            "average_days_open": mean(&ages),
        },
        "monthly_activity": {
            "month": format!("{:04}-{:02}", now.year(), now.month()),
            "created_this_month": created_this_month,
            "closed_this_month": closed_this_month,
            "net_change": created_this_month as i64 - closed_this_month as i64,
        },
    })
}

fn same_month(instant: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    instant.year() == now.year() && instant.month() == now.month()
}
