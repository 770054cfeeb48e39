//! Tracker Client
//!
//! Authenticated HTTP client for the issue tracker's REST surface: paginated
//! issue listings, `limit=1` cardinality probes, singular fetches with change
//! journals, project/version/user listings, and issue mutation.
//!
//! Failures are typed. Idempotent GETs retry transient classes (unreachable,
//! rate-limited) with exponential backoff; `forbidden`/`not_found` are
//! surfaced to the caller as partial-data markers, never retried.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::config::{GatewayConfig, TrackerCredential};
use crate::models::{IssueRecord, ProjectRecord, UserRecord, VersionRecord};

use super::types::{
    IssueEnvelope, IssuesPage, ProjectsPage, RawIssue, UsersPage, VersionsPage,
};

/// Tracker page size ceiling.
const PAGE_SIZE: u64 = 100;

/// Backoff schedule for transient failures.
const RETRY_BASE: Duration = Duration::from_millis(250);
const RETRY_CAP: Duration = Duration::from_secs(4);
const MAX_ATTEMPTS: u32 = 3;

/// Per-call timeout against the tracker.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Typed tracker failure.
#[derive(Debug, Clone, Error)]
pub enum TrackerError {
    #[error("tracker unreachable: {0}")]
    Unreachable(String),

    #[error("tracker rejected the credential")]
    Unauthorized,

    #[error("tracker denied access to {0}")]
    Forbidden(String),

    #[error("tracker resource not found: {0}")]
    NotFound(String),

    #[error("tracker rate limited")]
    RateLimited { retry_after: Option<u64> },

    #[error("malformed tracker response: {0}")]
    Malformed(String),
}

impl TrackerError {
    /// Transient classes worth retrying on idempotent GETs.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::RateLimited { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unreachable(_) => "tracker_unreachable",
            Self::Unauthorized => "tracker_unauthorized",
            Self::Forbidden(_) => "tracker_forbidden",
            Self::NotFound(_) => "tracker_not_found",
            Self::RateLimited { .. } => "tracker_rate_limited",
            Self::Malformed(_) => "tracker_malformed",
        }
    }
}

/// Filter parameters for issue listings and counts. Values use the tracker's
/// query grammar (`status_id=open|closed|*`, date ranges like `>=2026-01-01`
/// or `><2026-01-01|2026-01-07`).
#[derive(Debug, Clone, Default)]
pub struct IssueQuery {
    pub project_id: Option<i64>,
    pub status_id: Option<String>,
    pub tracker_id: Option<i64>,
    pub priority_id: Option<i64>,
    pub fixed_version_id: Option<i64>,
    pub assigned_to_id: Option<i64>,
    pub created_on: Option<String>,
    pub updated_on: Option<String>,
    pub closed_on: Option<String>,
    pub sort: Option<String>,
}

impl IssueQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(mut self, project_id: Option<i64>) -> Self {
        self.project_id = project_id;
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status_id = Some(status.into());
        self
    }

    pub fn tracker(mut self, tracker_id: i64) -> Self {
        self.tracker_id = Some(tracker_id);
        self
    }

    pub fn priority(mut self, priority_id: i64) -> Self {
        self.priority_id = Some(priority_id);
        self
    }

    pub fn fixed_version(mut self, version_id: i64) -> Self {
        self.fixed_version_id = Some(version_id);
        self
    }

    pub fn created_on(mut self, expr: impl Into<String>) -> Self {
        self.created_on = Some(expr.into());
        self
    }

    pub fn closed_on(mut self, expr: impl Into<String>) -> Self {
        self.closed_on = Some(expr.into());
        self
    }

    pub fn sort(mut self, expr: impl Into<String>) -> Self {
        self.sort = Some(expr.into());
        self
    }

    fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        let mut push = |k: &str, v: String| params.push((k.to_string(), v));
        if let Some(v) = self.project_id {
            push("project_id", v.to_string());
        }
        if let Some(ref v) = self.status_id {
            push("status_id", v.clone());
        }
        if let Some(v) = self.tracker_id {
            push("tracker_id", v.to_string());
        }
        if let Some(v) = self.priority_id {
            push("priority_id", v.to_string());
        }
        if let Some(v) = self.fixed_version_id {
            push("fixed_version_id", v.to_string());
        }
        if let Some(v) = self.assigned_to_id {
            push("assigned_to_id", v.to_string());
        }
        if let Some(ref v) = self.created_on {
            push("created_on", v.clone());
        }
        if let Some(ref v) = self.updated_on {
            push("updated_on", v.clone());
        }
        if let Some(ref v) = self.closed_on {
            push("closed_on", v.clone());
        }
        if let Some(ref v) = self.sort {
            push("sort", v.clone());
        }
        params
    }
}

/// The tracker client. One shared instance per process; the semaphore caps
/// concurrent in-flight requests to stay under tracker-side rate limits.
pub struct TrackerClient {
    http: reqwest::Client,
    base_url: String,
    credential: TrackerCredential,
    permits: Arc<Semaphore>,
}

impl TrackerClient {
    pub fn new(config: &GatewayConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(CALL_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: config.tracker_base_url.clone(),
            credential: config.tracker_credential.clone(),
            permits: Arc::new(Semaphore::new(config.tracker_concurrency)),
        }
    }

    /// Exact cardinality for a filter without fetching rows: `limit=1`,
    /// only `total_count` is consumed.
    pub async fn count_issues(&self, query: &IssueQuery) -> Result<u64, TrackerError> {
        let mut params = query.to_params();
        params.push(("limit".to_string(), "1".to_string()));
        let page: IssuesPage = self.get_json("/issues.json", &params).await?;
        Ok(page.total_count)
    }

    /// Paginated issue listing. Requests pages of up to 100 rows until the
    /// filter is exhausted or `max_issues` is reached; the second return
    /// value reports whether the cap cut the listing short.
    pub async fn list_issues(
        &self,
        query: &IssueQuery,
        max_issues: usize,
    ) -> Result<(Vec<IssueRecord>, bool), TrackerError> {
        let mut records = Vec::new();
        let mut offset: u64 = 0;
        let mut total_count: u64 = 0;

        loop {
            let mut params = query.to_params();
            params.push(("limit".to_string(), PAGE_SIZE.to_string()));
            params.push(("offset".to_string(), offset.to_string()));

            let page: IssuesPage = self.get_json("/issues.json", &params).await?;
            total_count = page.total_count;
            let returned = page.issues.len() as u64;

            for raw in page.issues {
                let id = raw.id;
                match raw.into_record() {
                    Some(record) => records.push(record),
                    None => warn!(issue_id = id, "dropping issue with unparseable timestamps"),
                }
            }

            offset += returned;
            if returned == 0 || offset >= total_count || records.len() >= max_issues {
                break;
            }
        }

        records.truncate(max_issues);
        let truncated = (records.len() as u64) < total_count;
        debug!(
            fetched = records.len(),
            total_count, truncated, "issue listing complete"
        );
        Ok((records, truncated))
    }

    /// A single issue including its change journal.
    pub async fn get_issue_with_journal(&self, issue_id: i64) -> Result<RawIssue, TrackerError> {
        let params = vec![("include".to_string(), "journals".to_string())];
        let envelope: IssueEnvelope = self
            .get_json(&format!("/issues/{}.json", issue_id), &params)
            .await?;
        Ok(envelope.issue)
    }

    pub async fn list_projects(&self) -> Result<Vec<ProjectRecord>, TrackerError> {
        let params = vec![("limit".to_string(), PAGE_SIZE.to_string())];
        let page: ProjectsPage = self.get_json("/projects.json", &params).await?;
        Ok(page.projects.into_iter().map(|p| p.into_record()).collect())
    }

    pub async fn list_versions(&self, project_id: i64) -> Result<Vec<VersionRecord>, TrackerError> {
        let page: VersionsPage = self
            .get_json(&format!("/projects/{}/versions.json", project_id), &[])
            .await?;
        Ok(page
            .versions
            .into_iter()
            .map(|v| v.into_record(project_id))
            .collect())
    }

    /// Users listing. Commonly requires admin privileges; callers treat
    /// `Forbidden` as an empty table with an endpoint marker.
    pub async fn list_users(&self) -> Result<Vec<UserRecord>, TrackerError> {
        let params = vec![("limit".to_string(), PAGE_SIZE.to_string())];
        let page: UsersPage = self.get_json("/users.json", &params).await?;
        Ok(page.users.into_iter().map(|u| u.into_record()).collect())
    }

    /// Create an issue. Mutations are not retried and perform no cache
    /// write-through.
    pub async fn create_issue(
        &self,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, TrackerError> {
        let _permit = self.permits.acquire().await;
        let url = format!("{}/issues.json", self.base_url);
        let response = self
            .authorize(self.http.post(&url))
            .json(&serde_json::json!({ "issue": body }))
            .send()
            .await
            .map_err(|e| TrackerError::Unreachable(e.to_string()))?;
        Self::read_json_body(response, "/issues.json").await
    }

    /// Update an issue. The tracker replies 204 with an empty body.
    pub async fn update_issue(
        &self,
        issue_id: i64,
        body: serde_json::Value,
    ) -> Result<(), TrackerError> {
        let _permit = self.permits.acquire().await;
        let path = format!("/issues/{}.json", issue_id);
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .authorize(self.http.put(&url))
            .json(&serde_json::json!({ "issue": body }))
            .send()
            .await
            .map_err(|e| TrackerError::Unreachable(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::status_error(status, &path, response.headers()))
        }
    }

    /// GET with auth, semaphore, typed failures, and transient-class retry.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, TrackerError> {
        let mut attempt: u32 = 0;
        loop {
            match self.get_json_once(path, params).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt + 1 < MAX_ATTEMPTS => {
                    let mut delay = RETRY_BASE * 2u32.pow(attempt);
                    if delay > RETRY_CAP {
                        delay = RETRY_CAP;
                    }
                    if let TrackerError::RateLimited {
                        retry_after: Some(secs),
                    } = err
                    {
                        delay = delay.max(Duration::from_secs(secs));
                    }
                    debug!(path, attempt, ?delay, error = %err, "retrying tracker call");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn get_json_once<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, TrackerError> {
        let _permit = self.permits.acquire().await;
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .authorize(self.http.get(&url))
            .query(params)
            .send()
            .await
            .map_err(|e| TrackerError::Unreachable(e.to_string()))?;
        Self::read_json_body(response, path).await
    }

    async fn read_json_body<T: DeserializeOwned>(
        response: reqwest::Response,
        path: &str,
    ) -> Result<T, TrackerError> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(status, path, response.headers()));
        }
        let body = response
            .text()
            .await
            .map_err(|e| TrackerError::Unreachable(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| TrackerError::Malformed(e.to_string()))
    }

    fn status_error(
        status: reqwest::StatusCode,
        path: &str,
        headers: &reqwest::header::HeaderMap,
    ) -> TrackerError {
        match status.as_u16() {
            401 => TrackerError::Unauthorized,
            403 => TrackerError::Forbidden(path.to_string()),
            404 => TrackerError::NotFound(path.to_string()),
            429 => TrackerError::RateLimited {
                retry_after: headers
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok()),
            },
            500..=599 => TrackerError::Unreachable(format!("{} returned {}", path, status)),
            _ => TrackerError::Malformed(format!("{} returned {}", path, status)),
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credential {
            TrackerCredential::ApiKey(key) => request.header("X-Redmine-API-Key", key),
            TrackerCredential::Bearer(token) => request.bearer_auth(token),
        }
    }
}
