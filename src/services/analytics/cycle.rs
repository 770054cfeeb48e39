//! Cycle Time
//!
//! Lead time (created → closed) and cycle time (start → closed, falling back
//! to created when no start date is recorded) over the snapshot, plus
//! journal-based reopen detection against the live tracker.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Value};

use crate::config::{is_closed_status, GatewayConfig};
use crate::models::{IssueRecord, Snapshot};
use crate::services::tracker::TrackerClient;
use crate::services::tracker::types::RawIssue;

use super::{mean, round1};

pub async fn cycle_time(
    snapshot: &Snapshot,
    tracker: &TrackerClient,
    config: &GatewayConfig,
    project_id: Option<i64>,
) -> Value {
    let mut closed: Vec<&IssueRecord> = snapshot
        .project_issues(project_id)
        .into_iter()
        .filter(|i| i.closed_on.is_some())
        .collect();
    closed.sort_by_key(|i| std::cmp::Reverse(i.closed_on));

    let lead_times: Vec<f64> = closed
        .iter()
        .filter_map(|i| i.closed_on.map(|c| days_between(i.created_on, c)))
        .collect();

    let mut cycle_times = Vec::new();
    let mut fallback_used = false;
    for issue in &closed {
        let Some(closed_on) = issue.closed_on else {
            continue;
        };
        match issue.start_date {
            Some(start) => cycle_times.push(days_between(date_start(start), closed_on)),
            None => {
                fallback_used = true;
                cycle_times.push(days_between(issue.created_on, closed_on));
            }
        }
    }

    // Journals are not projected into the snapshot; sample the most recently
    // closed issues live.
    let sample: Vec<&IssueRecord> = closed
        .iter()
        .copied()
        .take(config.journal_sample_size)
        .collect();
    let reopened = detect_reopens(tracker, config, &sample).await;

    let reopened_value = match reopened {
        Some(count) => json!({
            "count": count,
            "percentage": if sample.is_empty() {
                0.0
            } else {
                round1(count as f64 * 100.0 / sample.len() as f64)
            },
        }),
        None => json!({ "count": null, "reason": "journal_unavailable" }),
    };

    json!({
        "success": true,
        "sample_size": sample.len(),
        "lead_time": {
            "average_days": mean(&lead_times),
        },
        "cycle_time": {
            "average_days": mean(&cycle_times),
            "fallback_used": fallback_used,
        },
        "reopened_tickets": reopened_value,
    })
}

/// Count issues whose journal shows a closed → open status transition.
/// `None` when no journal could be retrieved for a non-empty sample.
async fn detect_reopens(
    tracker: &TrackerClient,
    config: &GatewayConfig,
    sample: &[&IssueRecord],
) -> Option<u64> {
    if sample.is_empty() {
        return Some(0);
    }

    let closed_ids: Vec<i64> = crate::config::CLOSED_STATUSES
        .iter()
        .filter_map(|name| config.status_id(name))
        .collect();

    let mut reopened = 0u64;
    let mut journals_seen = false;
    for issue in sample {
        match tracker.get_issue_with_journal(issue.id).await {
            Ok(raw) => {
                journals_seen = true;
                if journal_shows_reopen(&raw, &closed_ids) {
                    reopened += 1;
                }
            }
            Err(err) => {
                tracing::debug!(issue_id = issue.id, error = %err, "journal fetch failed");
            }
        }
    }

    if journals_seen {
        Some(reopened)
    } else {
        None
    }
}

fn journal_shows_reopen(raw: &RawIssue, closed_ids: &[i64]) -> bool {
    raw.journals.iter().any(|journal| {
        journal.details.iter().any(|detail| {
            if detail.name != "status_id" {
                return false;
            }
            let (old, new) = (detail.old_value.as_deref(), detail.new_value.as_deref());
            match (
                old.and_then(|v| v.parse::<i64>().ok()),
                new.and_then(|v| v.parse::<i64>().ok()),
            ) {
                (Some(old_id), Some(new_id)) => {
                    closed_ids.contains(&old_id) && !closed_ids.contains(&new_id)
                }
                // Some deployments journal status names instead of ids.
                _ => match (old, new) {
                    (Some(old_name), Some(new_name)) => is_reopen_transition(old_name, new_name),
                    _ => false,
                },
            }
        })
    })
}

/// Reopen = a transition from a closed status back to an open one.
pub fn is_reopen_transition(old_status: &str, new_status: &str) -> bool {
    is_closed_status(old_status) && !is_closed_status(new_status)
}

fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_seconds() as f64 / 86_400.0
}

fn date_start(date: NaiveDate) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(date.and_time(chrono::NaiveTime::MIN), Utc)
}
