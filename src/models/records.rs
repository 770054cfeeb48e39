//! Snapshot Records
//!
//! The normalized tabular projection of the tracker. A `Snapshot` is built
//! wholesale by a cache refresh and never edited per-row; aggregations take
//! an `Arc<Snapshot>` at call entry and operate only on that value.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{is_closed_status, is_critical_priority};

/// One issue, flattened from the tracker's nested JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRecord {
    pub id: i64,
    pub subject: String,
    pub project_id: i64,
    pub project_name: String,
    pub tracker_id: i64,
    pub tracker_name: String,
    pub status_id: i64,
    pub status_name: String,
    pub priority_id: i64,
    pub priority_name: String,
    pub assignee_id: Option<i64>,
    pub assignee_name: Option<String>,
    pub fixed_version_id: Option<i64>,
    pub fixed_version_name: Option<String>,
    pub estimated_hours: Option<f64>,
    pub spent_hours: Option<f64>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    pub closed_on: Option<DateTime<Utc>>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub done_ratio: u8,
}

impl IssueRecord {
    /// Whether the status belongs to the closed partition
    /// ({closed, rejected, cancelled}).
    pub fn is_closed(&self) -> bool {
        is_closed_status(&self.status_name)
    }

    pub fn is_open(&self) -> bool {
        !self.is_closed()
    }

    /// Whether the priority counts as critical ({high, urgent, immediate}).
    pub fn is_critical(&self) -> bool {
        is_critical_priority(&self.priority_name)
    }

    /// Case-insensitive status comparison.
    pub fn has_status(&self, name: &str) -> bool {
        normalized(&self.status_name) == normalized(name)
    }

    /// Case-insensitive tracker (issue type) comparison.
    pub fn has_tracker(&self, name: &str) -> bool {
        normalized(&self.tracker_name) == normalized(name)
    }
}

/// Status names arrive with deployment-specific spacing ("In Progress");
/// comparisons collapse to lowercase with underscores.
fn normalized(name: &str) -> String {
    name.to_lowercase().replace([' ', '-'], "_")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: i64,
    pub identifier: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    Open,
    Locked,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRecord {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub status: VersionStatus,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
}

/// An endpoint that failed during a refresh, surfaced in cache status so a
/// "users endpoint returned 403" is visible without log spelunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointError {
    pub endpoint: String,
    pub status: u16,
}

/// Snapshot bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotMeta {
    pub last_updated: DateTime<Utc>,
    pub ttl_seconds: u64,
    /// Set when the issue listing hit the page cap before exhausting
    /// `total_count`; direct counts remain exact regardless.
    pub issues_truncated: bool,
    pub endpoint_errors: Vec<EndpointError>,
    pub refresh_duration_ms: u64,
}

/// The immutable analytical projection. Replaced wholesale on refresh.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub issues: Vec<IssueRecord>,
    pub projects: Vec<ProjectRecord>,
    pub versions: Vec<VersionRecord>,
    pub users: Vec<UserRecord>,
    pub meta: SnapshotMeta,
}

impl Snapshot {
    /// Issues of one project, or all issues when no project is given.
    pub fn project_issues(&self, project_id: Option<i64>) -> Vec<&IssueRecord> {
        self.issues
            .iter()
            .filter(|i| project_id.map_or(true, |p| i.project_id == p))
            .collect()
    }

    /// Versions of one project, or all versions when no project is given.
    pub fn project_versions(&self, project_id: Option<i64>) -> Vec<&VersionRecord> {
        self.versions
            .iter()
            .filter(|v| project_id.map_or(true, |p| v.project_id == p))
            .collect()
    }

    /// Case-insensitive version lookup by name within a project scope.
    pub fn find_version(&self, project_id: Option<i64>, name: &str) -> Option<&VersionRecord> {
        let needle = name.to_lowercase();
        self.project_versions(project_id)
            .into_iter()
            .find(|v| v.name.to_lowercase() == needle)
    }

    /// The open version with the nearest due date: the current sprint when
    /// no version is named explicitly. Versions without a due date sort last.
    pub fn active_version(&self, project_id: Option<i64>) -> Option<&VersionRecord> {
        self.project_versions(project_id)
            .into_iter()
            .filter(|v| v.status == VersionStatus::Open)
            .min_by_key(|v| v.due_date.unwrap_or(NaiveDate::MAX))
    }

    pub fn age_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.meta.last_updated).num_seconds().max(0)
    }

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.age_seconds(now) as u64 > self.meta.ttl_seconds
    }
}
