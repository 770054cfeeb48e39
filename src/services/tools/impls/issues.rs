//! Core Tracker Tools
//!
//! Listing, inspection, and mutation of raw tracker entities. Mutations
//! perform no cache write-through; the snapshot catches up on the next
//! refresh.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::models::IssueRecord;
use crate::services::llm::types::ParameterSchema;
use crate::services::tools::trait_def::{Tool, ToolCategory, ToolContext, ToolResult};
use crate::services::tracker::IssueQuery;
use crate::utils::error::AppError;

use super::{
    optional_str, optional_usize, project_id_param, require_i64, require_str, resolve_project,
    schema,
};

/// Listing page ceiling; analytics tools answer counting questions.
const LIST_LIMIT_CAP: usize = 100;
const LIST_LIMIT_DEFAULT: usize = 25;

fn issue_summary(issue: &IssueRecord) -> Value {
    json!({
        "id": issue.id,
        "subject": issue.subject,
        "project": issue.project_name,
        "tracker": issue.tracker_name,
        "status": issue.status_name,
        "priority": issue.priority_name,
        "assigned_to": issue.assignee_name,
        "fixed_version": issue.fixed_version_name,
        "created_on": issue.created_on.to_rfc3339(),
        "updated_on": issue.updated_on.to_rfc3339(),
    })
}

pub struct ListProjects;

#[async_trait]
impl Tool for ListProjects {
    fn name(&self) -> &str {
        "tracker_list_projects"
    }

    fn description(&self) -> &str {
        "List tracker projects."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::TrackerCore
    }

    fn parameters_schema(&self) -> ParameterSchema {
        schema("No parameters", vec![], &[])
    }

    async fn execute(&self, ctx: &ToolContext, _args: Value) -> ToolResult {
        match ctx.tracker.list_projects().await {
            Ok(projects) => ToolResult::ok(json!({
                "success": true,
                "count": projects.len(),
                "projects": projects,
            })),
            Err(err) => ToolResult::from_error(&AppError::from(err)),
        }
    }
}

pub struct ListIssues;

#[async_trait]
impl Tool for ListIssues {
    fn name(&self) -> &str {
        "tracker_list_issues"
    }

    fn description(&self) -> &str {
        "List tracker issues (basic list only). For counts, metrics, or analytics use the \
         analytics tools instead."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::TrackerCore
    }

    fn parameters_schema(&self) -> ParameterSchema {
        schema(
            "Issue listing parameters",
            vec![
                ("project_id", project_id_param()),
                (
                    "status",
                    ParameterSchema::string_enum(
                        Some("Filter by status (default: open)"),
                        &["open", "closed", "all"],
                    ),
                ),
                (
                    "limit",
                    ParameterSchema::integer(Some("Max issues to return (default: 25)")),
                ),
            ],
            &[],
        )
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> ToolResult {
        let project_id = match resolve_project(&ctx.config, &args) {
            Ok(id) => id,
            Err(result) => return result,
        };
        // Models hand back creative status values; anything unknown means all.
        let status = match optional_str(&args, "status").unwrap_or("open") {
            "open" => "open",
            "closed" | "completed" | "done" => "closed",
            _ => "*",
        };
        let limit = optional_usize(&args, "limit")
            .unwrap_or(LIST_LIMIT_DEFAULT)
            .min(LIST_LIMIT_CAP);

        let query = IssueQuery::new().project(project_id).status(status);
        match ctx.tracker.list_issues(&query, limit).await {
            Ok((issues, truncated)) => ToolResult::ok(json!({
                "success": true,
                "count": issues.len(),
                "truncated": truncated,
                "issues": issues.iter().map(issue_summary).collect::<Vec<_>>(),
            })),
            Err(err) => ToolResult::from_error(&AppError::from(err)),
        }
    }
}

pub struct GetIssue;

#[async_trait]
impl Tool for GetIssue {
    fn name(&self) -> &str {
        "tracker_get_issue"
    }

    fn description(&self) -> &str {
        "Get one tracker issue in detail, including its change journal."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::TrackerCore
    }

    fn parameters_schema(&self) -> ParameterSchema {
        schema(
            "Issue fetch parameters",
            vec![("issue_id", ParameterSchema::integer(Some("Issue ID")))],
            &["issue_id"],
        )
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> ToolResult {
        let issue_id = match require_i64(&args, "issue_id") {
            Ok(id) => id,
            Err(result) => return result,
        };
        match ctx.tracker.get_issue_with_journal(issue_id).await {
            Ok(raw) => {
                let journal_entries = raw.journals.len();
                match raw.into_record() {
                    Some(record) => {
                        let mut issue = issue_summary(&record);
                        issue["done_ratio"] = json!(record.done_ratio);
                        issue["estimated_hours"] = json!(record.estimated_hours);
                        issue["spent_hours"] = json!(record.spent_hours);
                        issue["closed_on"] = json!(record.closed_on.map(|c| c.to_rfc3339()));
                        issue["start_date"] = json!(record.start_date);
                        issue["due_date"] = json!(record.due_date);
                        ToolResult::ok(json!({
                            "success": true,
                            "issue": issue,
                            "journal_entries": journal_entries,
                        }))
                    }
                    None => ToolResult::from_error(&AppError::Tracker(
                        crate::services::tracker::TrackerError::Malformed(format!(
                            "issue {} carries unparseable timestamps",
                            issue_id
                        )),
                    )),
                }
            }
            Err(err) => ToolResult::from_error(&AppError::from(err)),
        }
    }
}

pub struct ListVersions;

#[async_trait]
impl Tool for ListVersions {
    fn name(&self) -> &str {
        "tracker_list_versions"
    }

    fn description(&self) -> &str {
        "List versions (sprints/releases) of a project."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::TrackerCore
    }

    fn parameters_schema(&self) -> ParameterSchema {
        schema(
            "Version listing parameters",
            vec![("project_id", project_id_param())],
            &["project_id"],
        )
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> ToolResult {
        let project_id = match resolve_project(&ctx.config, &args) {
            Ok(Some(id)) => id,
            Ok(None) => {
                return ToolResult::from_error(&AppError::ToolArgument(
                    "project_id is required".to_string(),
                ))
            }
            Err(result) => return result,
        };
        match ctx.tracker.list_versions(project_id).await {
            Ok(versions) => ToolResult::ok(json!({
                "success": true,
                "count": versions.len(),
                "versions": versions,
            })),
            Err(err) => ToolResult::from_error(&AppError::from(err)),
        }
    }
}

pub struct CreateIssue;

#[async_trait]
impl Tool for CreateIssue {
    fn name(&self) -> &str {
        "tracker_create_issue"
    }

    fn description(&self) -> &str {
        "Create a tracker issue."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::TrackerCore
    }

    fn parameters_schema(&self) -> ParameterSchema {
        schema(
            "Issue creation parameters",
            vec![
                ("project_id", project_id_param()),
                ("subject", ParameterSchema::string(Some("Title"))),
                (
                    "description",
                    ParameterSchema::string(Some("Description (optional)")),
                ),
                (
                    "tracker_id",
                    ParameterSchema::integer(Some("Tracker/type id (optional)")),
                ),
                (
                    "priority_id",
                    ParameterSchema::integer(Some("Priority id (optional)")),
                ),
            ],
            &["project_id", "subject"],
        )
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> ToolResult {
        let project_id = match resolve_project(&ctx.config, &args) {
            Ok(Some(id)) => id,
            Ok(None) => {
                return ToolResult::from_error(&AppError::ToolArgument(
                    "project_id is required".to_string(),
                ))
            }
            Err(result) => return result,
        };
        let subject = match require_str(&args, "subject") {
            Ok(subject) => subject.to_string(),
            Err(result) => return result,
        };

        let mut body = json!({
            "project_id": project_id,
            "subject": subject,
        });
        if let Some(description) = optional_str(&args, "description") {
            body["description"] = json!(description);
        }
        if let Some(tracker_id) = args.get("tracker_id").and_then(Value::as_i64) {
            body["tracker_id"] = json!(tracker_id);
        }
        if let Some(priority_id) = args.get("priority_id").and_then(Value::as_i64) {
            body["priority_id"] = json!(priority_id);
        }

        match ctx.tracker.create_issue(body).await {
            Ok(created) => {
                let id = created["issue"]["id"].clone();
                ToolResult::ok(json!({
                    "success": true,
                    "message": format!("Issue #{} created", id),
                    "issue": created["issue"],
                }))
            }
            Err(err) => ToolResult::from_error(&AppError::from(err)),
        }
    }
}

pub struct UpdateIssue;

#[async_trait]
impl Tool for UpdateIssue {
    fn name(&self) -> &str {
        "tracker_update_issue"
    }

    fn description(&self) -> &str {
        "Update a tracker issue: status, priority, assignee, done ratio, or add a comment."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::TrackerCore
    }

    fn parameters_schema(&self) -> ParameterSchema {
        schema(
            "Issue update parameters",
            vec![
                ("issue_id", ParameterSchema::integer(Some("Issue ID"))),
                ("notes", ParameterSchema::string(Some("Comment to add"))),
                ("status_id", ParameterSchema::integer(Some("New status id"))),
                (
                    "priority_id",
                    ParameterSchema::integer(Some("New priority id")),
                ),
                (
                    "assigned_to_id",
                    ParameterSchema::integer(Some("New assignee id")),
                ),
                (
                    "done_ratio",
                    ParameterSchema::integer(Some("Completion percent, 0-100")),
                ),
            ],
            &["issue_id"],
        )
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> ToolResult {
        let issue_id = match require_i64(&args, "issue_id") {
            Ok(id) => id,
            Err(result) => return result,
        };

        let mut body = json!({});
        for field in ["status_id", "priority_id", "assigned_to_id", "done_ratio"] {
            if let Some(value) = args.get(field).and_then(Value::as_i64) {
                body[field] = json!(value);
            }
        }
        if let Some(notes) = optional_str(&args, "notes") {
            body["notes"] = json!(notes);
        }
        if body.as_object().map_or(true, |o| o.is_empty()) {
            return ToolResult::from_error(&AppError::ToolArgument(
                "nothing to update: provide notes, status_id, priority_id, assigned_to_id, \
                 or done_ratio"
                    .to_string(),
            ));
        }

        match ctx.tracker.update_issue(issue_id, body).await {
            Ok(()) => ToolResult::ok(json!({
                "success": true,
                "message": format!("Issue #{} updated", issue_id),
            })),
            Err(err) => ToolResult::from_error(&AppError::from(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::services::cache::CacheEngine;
    use crate::services::tracker::TrackerClient;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn context() -> ToolContext {
        let config = Arc::new(GatewayConfig::for_tests("http://127.0.0.1:1"));
        let tracker = Arc::new(TrackerClient::new(&config));
        let cache = Arc::new(CacheEngine::new(Arc::clone(&config), Arc::clone(&tracker)));
        ToolContext {
            config,
            tracker,
            cache,
            cancellation_token: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn test_get_issue_requires_id() {
        let ctx = context();
        let result = GetIssue.execute(&ctx, json!({})).await;
        assert!(!result.success);
        assert_eq!(result.payload["kind"], "tool_argument_invalid");
    }

    #[tokio::test]
    async fn test_list_versions_requires_project() {
        let ctx = context();
        let result = ListVersions.execute(&ctx, json!({})).await;
        assert!(!result.success);
        assert_eq!(result.payload["kind"], "tool_argument_invalid");
    }

    #[tokio::test]
    async fn test_create_issue_requires_subject() {
        let ctx = context();
        let result = CreateIssue.execute(&ctx, json!({"project_id": 6})).await;
        assert!(!result.success);
        assert_eq!(result.payload["kind"], "tool_argument_invalid");
    }

    #[tokio::test]
    async fn test_update_issue_rejects_empty_update() {
        let ctx = context();
        let result = UpdateIssue.execute(&ctx, json!({"issue_id": 12})).await;
        assert!(!result.success);
        assert!(result.payload["error"]
            .as_str()
            .unwrap()
            .contains("nothing to update"));
    }
}
