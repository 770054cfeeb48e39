//! Analytics Tools
//!
//! The ten aggregations over the snapshot. Bug, sprint, and backlog tools
//! are hybrid: they serve from the cache when a snapshot exists and fall
//! back to live direct counts otherwise, so exact totals stay available with
//! the cache off.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::services::analytics;
use crate::services::llm::types::ParameterSchema;
use crate::services::tools::trait_def::{Tool, ToolCategory, ToolContext, ToolResult};
use crate::services::tracker::TrackerError;
use crate::utils::error::AppError;

use super::{optional_str, optional_usize, project_id_param, resolve_project, schema};

fn direct_result(result: Result<Value, TrackerError>) -> ToolResult {
    match result {
        Ok(payload) => ToolResult::ok(payload),
        Err(err) => ToolResult::from_error(&AppError::from(err)),
    }
}

/// Cache-only aggregations fail with `cache_unavailable` when no snapshot
/// exists; the model surfaces the error so the user can turn the cache on.
fn cache_required(err: AppError) -> ToolResult {
    ToolResult::from_error(&err)
}

pub struct SprintStatus;

#[async_trait]
impl Tool for SprintStatus {
    fn name(&self) -> &str {
        "tracker_sprint_status"
    }

    fn description(&self) -> &str {
        "Get sprint status analytics: committed, completed, in-progress, blocked, remaining, \
         completion percentage, estimated vs spent hours, burndown assessment."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::TrackerAnalytics
    }

    fn parameters_schema(&self) -> ParameterSchema {
        schema(
            "Sprint status parameters",
            vec![
                ("project_id", project_id_param()),
                (
                    "version_name",
                    ParameterSchema::string(Some("Sprint/version name (optional)")),
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
        let version_name = optional_str(&args, "version_name");

        match ctx.cache.read() {
            Ok(snapshot) => ToolResult::ok(analytics::sprint::sprint_status(
                &snapshot,
                &ctx.config,
                project_id,
                version_name,
            )),
            // No snapshot: exact committed/completed via live counts.
            Err(_) => direct_result(
                analytics::counts::sprint_count(&ctx.tracker, project_id, None).await,
            ),
        }
    }
}

pub struct BacklogAnalytics;

#[async_trait]
impl Tool for BacklogAnalytics {
    fn name(&self) -> &str {
        "tracker_backlog_analytics"
    }

    fn description(&self) -> &str {
        "Get backlog metrics: open totals, high-priority pressure, estimation coverage, \
         aging, and this month's created/closed churn."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::TrackerAnalytics
    }

    fn parameters_schema(&self) -> ParameterSchema {
        schema(
            "Backlog analytics parameters",
            vec![("project_id", project_id_param())],
            &[],
        )
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> ToolResult {
        let project_id = match resolve_project(&ctx.config, &args) {
            Ok(id) => id,
            Err(result) => return result,
        };

        match ctx.cache.read() {
            Ok(snapshot) => ToolResult::ok(analytics::backlog::backlog_analytics(
                &snapshot,
                project_id,
                Utc::now(),
            )),
            Err(_) => {
                direct_result(analytics::counts::backlog_count(&ctx.tracker, project_id).await)
            }
        }
    }
}

pub struct BugAnalytics;

#[async_trait]
impl Tool for BugAnalytics {
    fn name(&self) -> &str {
        "tracker_bug_analytics"
    }

    fn description(&self) -> &str {
        "Get bug counts and metrics. USE THIS for questions about bugs: total/open/closed \
         bugs, critical open bugs, bug-to-story ratio, average resolution days."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::TrackerAnalytics
    }

    fn parameters_schema(&self) -> ParameterSchema {
        schema(
            "Bug analytics parameters",
            vec![("project_id", project_id_param())],
            &[],
        )
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> ToolResult {
        let project_id = match resolve_project(&ctx.config, &args) {
            Ok(id) => id,
            Err(result) => return result,
        };

        match ctx.cache.read() {
            Ok(snapshot) => {
                ToolResult::ok(analytics::bugs::bug_analytics(&snapshot, project_id))
            }
            Err(_) => direct_result(
                analytics::counts::bug_count(&ctx.tracker, &ctx.config, project_id).await,
            ),
        }
    }
}

pub struct TeamWorkload;

#[async_trait]
impl Tool for TeamWorkload {
    fn name(&self) -> &str {
        "tracker_team_workload"
    }

    fn description(&self) -> &str {
        "Get open-issue workload per team member, unassigned work, and overloaded members."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::TrackerAnalytics
    }

    fn parameters_schema(&self) -> ParameterSchema {
        schema(
            "Team workload parameters",
            vec![("project_id", project_id_param())],
            &[],
        )
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> ToolResult {
        let project_id = match resolve_project(&ctx.config, &args) {
            Ok(id) => id,
            Err(result) => return result,
        };
        match ctx.cache.read() {
            Ok(snapshot) => ToolResult::ok(analytics::workload::team_workload(
                &snapshot,
                &ctx.config,
                project_id,
            )),
            Err(err) => cache_required(err),
        }
    }
}

pub struct CycleTime;

#[async_trait]
impl Tool for CycleTime {
    fn name(&self) -> &str {
        "tracker_cycle_time"
    }

    fn description(&self) -> &str {
        "Get lead time and cycle time over closed issues, plus journal-based reopened-ticket \
         detection."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::TrackerAnalytics
    }

    fn parameters_schema(&self) -> ParameterSchema {
        schema(
            "Cycle time parameters",
            vec![("project_id", project_id_param())],
            &[],
        )
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> ToolResult {
        let project_id = match resolve_project(&ctx.config, &args) {
            Ok(id) => id,
            Err(result) => return result,
        };
        match ctx.cache.read() {
            Ok(snapshot) => ToolResult::ok(
                analytics::cycle::cycle_time(&snapshot, &ctx.tracker, &ctx.config, project_id)
                    .await,
            ),
            Err(err) => cache_required(err),
        }
    }
}

pub struct ReleaseStatus;

#[async_trait]
impl Tool for ReleaseStatus {
    fn name(&self) -> &str {
        "tracker_release_status"
    }

    fn description(&self) -> &str {
        "Get release/version completion status: total, closed, open issues and completion \
         percentage per release."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::TrackerAnalytics
    }

    fn parameters_schema(&self) -> ParameterSchema {
        schema(
            "Release status parameters",
            vec![
                ("project_id", project_id_param()),
                (
                    "version_name",
                    ParameterSchema::string(Some("Release/version name (optional)")),
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
        match ctx.cache.read() {
            Ok(snapshot) => ToolResult::ok(analytics::release::release_status(
                &snapshot,
                project_id,
                optional_str(&args, "version_name"),
            )),
            Err(err) => cache_required(err),
        }
    }
}

pub struct VelocityTrend;

#[async_trait]
impl Tool for VelocityTrend {
    fn name(&self) -> &str {
        "tracker_velocity_trend"
    }

    fn description(&self) -> &str {
        "Get completed-issue velocity over the last N closed sprints with a trend assessment."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::TrackerAnalytics
    }

    fn parameters_schema(&self) -> ParameterSchema {
        schema(
            "Velocity trend parameters",
            vec![
                ("project_id", project_id_param()),
                (
                    "sprints",
                    ParameterSchema::integer(Some("Number of sprints (default: 5)")),
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
        let sprints =
            optional_usize(&args, "sprints").unwrap_or(analytics::velocity::DEFAULT_SPRINTS);
        match ctx.cache.read() {
            Ok(snapshot) => ToolResult::ok(analytics::velocity::velocity_trend(
                &snapshot, project_id, sprints,
            )),
            Err(err) => cache_required(err),
        }
    }
}

pub struct Throughput;

#[async_trait]
impl Tool for Throughput {
    fn name(&self) -> &str {
        "tracker_throughput"
    }

    fn description(&self) -> &str {
        "Get created vs closed tickets per week over the last N weeks."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::TrackerAnalytics
    }

    fn parameters_schema(&self) -> ParameterSchema {
        schema(
            "Throughput parameters",
            vec![
                ("project_id", project_id_param()),
                (
                    "weeks",
                    ParameterSchema::integer(Some("Number of weeks (default: 4)")),
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
        let weeks = optional_usize(&args, "weeks").unwrap_or(analytics::throughput::DEFAULT_WEEKS);
        match ctx.cache.read() {
            Ok(snapshot) => ToolResult::ok(analytics::throughput::throughput(
                &snapshot,
                project_id,
                weeks,
                Utc::now(),
            )),
            Err(err) => cache_required(err),
        }
    }
}

pub struct TasksInProgress;

#[async_trait]
impl Tool for TasksInProgress {
    fn name(&self) -> &str {
        "tracker_tasks_in_progress"
    }

    fn description(&self) -> &str {
        "Count open issues currently in the In Progress status."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::TrackerAnalytics
    }

    fn parameters_schema(&self) -> ParameterSchema {
        schema(
            "In-progress count parameters",
            vec![("project_id", project_id_param())],
            &[],
        )
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> ToolResult {
        let project_id = match resolve_project(&ctx.config, &args) {
            Ok(id) => id,
            Err(result) => return result,
        };
        match ctx.cache.read() {
            Ok(snapshot) => ToolResult::ok(analytics::progress::tasks_in_progress(
                &snapshot, project_id,
            )),
            Err(err) => cache_required(err),
        }
    }
}

pub struct BlockedTasks;

#[async_trait]
impl Tool for BlockedTasks {
    fn name(&self) -> &str {
        "tracker_blocked_tasks"
    }

    fn description(&self) -> &str {
        "Count open issues sitting in the blocked status."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::TrackerAnalytics
    }

    fn parameters_schema(&self) -> ParameterSchema {
        schema(
            "Blocked count parameters",
            vec![("project_id", project_id_param())],
            &[],
        )
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> ToolResult {
        let project_id = match resolve_project(&ctx.config, &args) {
            Ok(id) => id,
            Err(result) => return result,
        };
        match ctx.cache.read() {
            Ok(snapshot) => ToolResult::ok(analytics::progress::blocked_tasks(
                &snapshot,
                &ctx.config,
                project_id,
            )),
            Err(err) => cache_required(err),
        }
    }
}
