//! Throughput
//!
//! Created vs closed per aligned ISO week. `net = created − closed`, so a
//! positive net throughput means scope is growing faster than it is closing.

use chrono::{DateTime, Datelike, Days, Utc};
use serde_json::{json, Value};

use crate::models::Snapshot;

use super::round1;

pub const DEFAULT_WEEKS: usize = 4;

pub fn throughput(
    snapshot: &Snapshot,
    project_id: Option<i64>,
    weeks: usize,
    now: DateTime<Utc>,
) -> Value {
    let issues = snapshot.project_issues(project_id);
    let weeks = weeks.max(1);

    // Monday of the current ISO week anchors the aligned windows.
    let today = now.date_naive();
    let monday = today - Days::new(today.weekday().num_days_from_monday() as u64);

    let mut weekly = Vec::with_capacity(weeks);
    let mut total_created = 0u64;
    let mut total_closed = 0u64;

    for back in (0..weeks).rev() {
        let start = monday - Days::new(7 * back as u64);
        let end = start + Days::new(7);
        let created = issues
            .iter()
            .filter(|i| {
                let date = i.created_on.date_naive();
                date >= start && date < end
            })
            .count() as u64;
        let closed = issues
            .iter()
            .filter(|i| {
                i.closed_on.is_some_and(|c| {
                    let date = c.date_naive();
                    date >= start && date < end
                })
            })
            .count() as u64;

        total_created += created;
        total_closed += closed;
        let iso = start.iso_week();
        weekly.push(json!({
            "week": format!("{:04}-W{:02}", iso.year(), iso.week()),
            "created": created,
            "closed": closed,
            "net": created as i64 - closed as i64,
        }));
    }

    let net_throughput = total_created as i64 - total_closed as i64;

    json!({
        "success": true,
        "period_weeks": weeks,
        "weekly_breakdown": weekly,
        "avg_created_per_week": round1(total_created as f64 / weeks as f64),
        "avg_closed_per_week": round1(total_closed as f64 / weeks as f64),
        "net_throughput": net_throughput,
        "trend": if net_throughput >= 0 { "positive" } else { "negative" },
    })
}
