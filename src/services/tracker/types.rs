//! Tracker Wire Types
//!
//! Raw deserialization shapes for the tracker's REST payloads, plus the
//! flattening into snapshot records. The tracker nests every association as
//! `{"id": …, "name": …}`; records carry both sides flattened.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::models::{IssueRecord, ProjectRecord, UserRecord, VersionRecord, VersionStatus};

/// A nested `{id, name}` association.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedRef {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawIssue {
    pub id: i64,
    #[serde(default)]
    pub subject: String,
    pub project: NamedRef,
    pub tracker: NamedRef,
    pub status: NamedRef,
    pub priority: NamedRef,
    #[serde(default)]
    pub assigned_to: Option<NamedRef>,
    #[serde(default)]
    pub fixed_version: Option<NamedRef>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub spent_hours: Option<f64>,
    pub created_on: String,
    pub updated_on: String,
    #[serde(default)]
    pub closed_on: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub done_ratio: Option<i64>,
    #[serde(default)]
    pub journals: Vec<RawJournal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawJournal {
    #[serde(default)]
    pub created_on: Option<String>,
    #[serde(default)]
    pub details: Vec<RawJournalDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawJournalDetail {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub old_value: Option<String>,
    #[serde(default)]
    pub new_value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IssuesPage {
    #[serde(default)]
    pub issues: Vec<RawIssue>,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub limit: u64,
}

#[derive(Debug, Deserialize)]
pub struct IssueEnvelope {
    pub issue: RawIssue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawProject {
    pub id: i64,
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectsPage {
    #[serde(default)]
    pub projects: Vec<RawProject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawVersion {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VersionsPage {
    #[serde(default)]
    pub versions: Vec<RawVersion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUser {
    pub id: i64,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UsersPage {
    #[serde(default)]
    pub users: Vec<RawUser>,
}

impl RawIssue {
    /// Flatten into an `IssueRecord`. Required instants must parse; optional
    /// dates that fail to parse are dropped rather than failing the row.
    pub fn into_record(self) -> Option<IssueRecord> {
        let created_on = parse_instant(&self.created_on)?;
        let updated_on = parse_instant(&self.updated_on)?;
        Some(IssueRecord {
            id: self.id,
            subject: self.subject,
            project_id: self.project.id,
            project_name: self.project.name,
            tracker_id: self.tracker.id,
            tracker_name: self.tracker.name,
            status_id: self.status.id,
            status_name: self.status.name,
            priority_id: self.priority.id,
            priority_name: self.priority.name,
            assignee_id: self.assigned_to.as_ref().map(|a| a.id),
            assignee_name: self.assigned_to.map(|a| a.name),
            fixed_version_id: self.fixed_version.as_ref().map(|v| v.id),
            fixed_version_name: self.fixed_version.map(|v| v.name),
            estimated_hours: self.estimated_hours,
            spent_hours: self.spent_hours,
            created_on,
            updated_on,
            closed_on: self.closed_on.as_deref().and_then(parse_instant),
            start_date: self.start_date.as_deref().and_then(parse_date),
            due_date: self.due_date.as_deref().and_then(parse_date),
            done_ratio: self.done_ratio.unwrap_or(0).clamp(0, 100) as u8,
        })
    }
}

impl RawProject {
    pub fn into_record(self) -> ProjectRecord {
        ProjectRecord {
            id: self.id,
            identifier: self.identifier,
            name: self.name,
            description: self.description,
        }
    }
}

impl RawVersion {
    pub fn into_record(self, project_id: i64) -> VersionRecord {
        let status = match self.status.as_deref() {
            Some("locked") => VersionStatus::Locked,
            Some("closed") => VersionStatus::Closed,
            _ => VersionStatus::Open,
        };
        VersionRecord {
            id: self.id,
            project_id,
            name: self.name,
            status,
            due_date: self.due_date.as_deref().and_then(parse_date),
        }
    }
}

impl RawUser {
    pub fn into_record(self) -> UserRecord {
        let name = match self.name {
            Some(name) if !name.is_empty() => name,
            _ => {
                let first = self.firstname.unwrap_or_default();
                let last = self.lastname.unwrap_or_default();
                let joined = format!("{} {}", first, last).trim().to_string();
                if joined.is_empty() {
                    self.login.unwrap_or_default()
                } else {
                    joined
                }
            }
        };
        UserRecord { id: self.id, name }
    }
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_flattening() {
        let raw: RawIssue = serde_json::from_value(serde_json::json!({
            "id": 101,
            "subject": "Login fails on Safari",
            "project": {"id": 6, "name": "NCEL"},
            "tracker": {"id": 1, "name": "Bug"},
            "status": {"id": 5, "name": "Closed"},
            "priority": {"id": 4, "name": "Urgent"},
            "assigned_to": {"id": 9, "name": "Dana Miles"},
            "fixed_version": {"id": 3, "name": "Week-7"},
            "estimated_hours": 4.0,
            "created_on": "2026-01-10T08:00:00Z",
            "updated_on": "2026-01-15T08:00:00Z",
            "closed_on": "2026-01-15T08:00:00Z",
            "start_date": "2026-01-11",
            "done_ratio": 100
        }))
        .unwrap();

        let record = raw.into_record().unwrap();
        assert_eq!(record.id, 101);
        assert_eq!(record.project_id, 6);
        assert_eq!(record.project_name, "NCEL");
        assert_eq!(record.tracker_name, "Bug");
        assert_eq!(record.assignee_name.as_deref(), Some("Dana Miles"));
        assert_eq!(record.fixed_version_name.as_deref(), Some("Week-7"));
        assert!(record.closed_on.is_some());
        assert_eq!(record.done_ratio, 100);
        assert!(record.is_closed());
    }

    #[test]
    fn test_issue_nullable_fields_default() {
        let raw: RawIssue = serde_json::from_value(serde_json::json!({
            "id": 102,
            "subject": "Add export button",
            "project": {"id": 6, "name": "NCEL"},
            "tracker": {"id": 2, "name": "Feature"},
            "status": {"id": 1, "name": "New"},
            "priority": {"id": 2, "name": "Normal"},
            "created_on": "2026-01-10T08:00:00Z",
            "updated_on": "2026-01-10T08:00:00Z"
        }))
        .unwrap();

        let record = raw.into_record().unwrap();
        assert!(record.assignee_name.is_none());
        assert!(record.fixed_version_id.is_none());
        assert!(record.closed_on.is_none());
        assert!(record.estimated_hours.is_none());
        assert_eq!(record.done_ratio, 0);
        assert!(record.is_open());
    }

    #[test]
    fn test_unparseable_created_on_drops_row() {
        let raw: RawIssue = serde_json::from_value(serde_json::json!({
            "id": 103,
            "subject": "bad timestamps",
            "project": {"id": 6, "name": "NCEL"},
            "tracker": {"id": 1, "name": "Bug"},
            "status": {"id": 1, "name": "New"},
            "priority": {"id": 2, "name": "Normal"},
            "created_on": "not-a-date",
            "updated_on": "2026-01-10T08:00:00Z"
        }))
        .unwrap();
        assert!(raw.into_record().is_none());
    }

    #[test]
    fn test_user_display_name_fallbacks() {
        let from_name: RawUser =
            serde_json::from_value(serde_json::json!({"id": 1, "name": "Dana Miles"})).unwrap();
        assert_eq!(from_name.into_record().name, "Dana Miles");

        let from_parts: RawUser = serde_json::from_value(
            serde_json::json!({"id": 2, "firstname": "Ray", "lastname": "Ozu"}),
        )
        .unwrap();
        assert_eq!(from_parts.into_record().name, "Ray Ozu");

        let from_login: RawUser =
            serde_json::from_value(serde_json::json!({"id": 3, "login": "rozu"})).unwrap();
        assert_eq!(from_login.into_record().name, "rozu");
    }

    #[test]
    fn test_version_status_parsing() {
        let raw: RawVersion = serde_json::from_value(serde_json::json!({
            "id": 3, "name": "Week-7", "status": "closed", "due_date": "2026-02-15"
        }))
        .unwrap();
        let record = raw.into_record(6);
        assert_eq!(record.status, VersionStatus::Closed);
        assert_eq!(record.project_id, 6);
        assert!(record.due_date.is_some());
    }
}
