//! Gateway Configuration
//!
//! Loads runtime settings from the environment at startup and carries the
//! compiled identifier maps for the known tracker deployment: project
//! aliases, status names, tracker (issue type) names, and priority names.
//!
//! The enum maps are compiled in for the deployment this gateway fronts; a
//! deployment with different enums should load them from the tracker's enum
//! endpoints at startup and fail fast when required names are missing.

use std::collections::HashMap;
use std::env;

use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

/// Default chat-completions endpoint (OpenAI-compatible, Groq-hosted).
const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default model for both the category selector and the tool loop.
const DEFAULT_LLM_MODEL: &str = "llama-3.1-8b-instant";

/// Credential used against the tracker REST API.
#[derive(Debug, Clone)]
pub enum TrackerCredential {
    /// Sent as the `X-Redmine-API-Key` header.
    ApiKey(String),
    /// Sent as an `Authorization: Bearer` header.
    Bearer(String),
}

/// Runtime configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub tracker_base_url: String,
    pub tracker_credential: TrackerCredential,
    pub llm_api_key: String,
    pub llm_base_url: String,
    pub llm_model: String,
    pub port: u16,
    pub cache_ttl_seconds: u64,
    pub cache_max_issues: usize,
    pub allowed_origins: Vec<String>,
    /// Status name treated as the blocked marker. Installation-specific.
    pub blocked_status: String,
    /// Open-issue count above which a member is reported as overloaded.
    pub overload_threshold: u64,
    /// Closed issues sampled for journal-based reopen detection.
    pub journal_sample_size: usize,
    /// Overall budget for one inbound request, in seconds.
    pub request_timeout_secs: u64,
    /// Reserve subtracted from the request deadline for every external call.
    pub deadline_reserve_secs: u64,
    /// Concurrent in-flight requests allowed against the tracker.
    pub tracker_concurrency: usize,
    /// Conversation turns retained in the returned history.
    pub history_window: usize,

    project_aliases: HashMap<String, i64>,
    status_ids: HashMap<String, i64>,
    tracker_ids: HashMap<String, i64>,
    priority_ids: HashMap<String, i64>,
}

/// A project reference as it arrives in tool arguments: either the numeric
/// tracker id or the project slug / display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProjectIdent {
    Id(i64),
    Name(String),
}

impl GatewayConfig {
    /// Load configuration from the environment. Missing required variables
    /// produce a `Configuration` error, which the binary maps to a non-zero
    /// exit.
    pub fn from_env() -> AppResult<Self> {
        let tracker_base_url = require_env("TRACKER_BASE_URL")?;
        let tracker_credential = match env::var("TRACKER_API_KEY") {
            Ok(key) if !key.is_empty() => TrackerCredential::ApiKey(key),
            _ => match env::var("TRACKER_BEARER_TOKEN") {
                Ok(token) if !token.is_empty() => TrackerCredential::Bearer(token),
                _ => {
                    return Err(AppError::configuration(
                        "TRACKER_API_KEY or TRACKER_BEARER_TOKEN must be set",
                    ))
                }
            },
        };
        let llm_api_key = require_env("LLM_API_KEY")?;

        Ok(Self {
            tracker_base_url: tracker_base_url.trim_end_matches('/').to_string(),
            tracker_credential,
            llm_api_key,
            llm_base_url: env_or("LLM_BASE_URL", DEFAULT_LLM_BASE_URL),
            llm_model: env_or("LLM_MODEL", DEFAULT_LLM_MODEL),
            port: parse_env("PORT", 3001)?,
            cache_ttl_seconds: parse_env("CACHE_TTL_SECONDS", 300)?,
            cache_max_issues: parse_env("CACHE_MAX_ISSUES", 1000)?,
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            blocked_status: env_or("BLOCKED_STATUS", "feedback"),
            overload_threshold: parse_env("OVERLOAD_THRESHOLD", 10)?,
            journal_sample_size: parse_env("JOURNAL_SAMPLE_SIZE", 50)?,
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECONDS", 60)?,
            deadline_reserve_secs: 2,
            tracker_concurrency: 8,
            history_window: 10,
            project_aliases: default_project_aliases(),
            status_ids: default_status_ids(),
            tracker_ids: default_tracker_ids(),
            priority_ids: default_priority_ids(),
        })
    }

    /// Configuration for tests: no environment access, local endpoints.
    pub fn for_tests(tracker_base_url: impl Into<String>) -> Self {
        let tracker_base_url: String = tracker_base_url.into();
        Self {
            tracker_base_url: tracker_base_url.trim_end_matches('/').to_string(),
            tracker_credential: TrackerCredential::ApiKey("test-key".to_string()),
            llm_api_key: "test-key".to_string(),
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            port: 0,
            cache_ttl_seconds: 300,
            cache_max_issues: 1000,
            allowed_origins: vec!["http://localhost:5173".to_string()],
            blocked_status: "feedback".to_string(),
            overload_threshold: 10,
            journal_sample_size: 50,
            request_timeout_secs: 60,
            deadline_reserve_secs: 2,
            tracker_concurrency: 8,
            history_window: 10,
            project_aliases: default_project_aliases(),
            status_ids: default_status_ids(),
            tracker_ids: default_tracker_ids(),
            priority_ids: default_priority_ids(),
        }
    }

    /// Resolve a project reference to its numeric id.
    ///
    /// Accepts the numeric id, a numeric string, or a case-insensitive alias.
    /// Unknown names resolve to `None`, which callers surface as
    /// `{"success": false, "error": "unknown project"}`.
    pub fn normalize_project_id(&self, ident: &ProjectIdent) -> Option<i64> {
        match ident {
            ProjectIdent::Id(id) => Some(*id),
            ProjectIdent::Name(name) => {
                if let Some(id) = self.project_aliases.get(&name.to_lowercase()) {
                    return Some(*id);
                }
                name.parse::<i64>().ok()
            }
        }
    }

    pub fn status_id(&self, name: &str) -> Option<i64> {
        self.status_ids.get(&name.to_lowercase()).copied()
    }

    pub fn tracker_id(&self, name: &str) -> Option<i64> {
        self.tracker_ids.get(&name.to_lowercase()).copied()
    }

    pub fn priority_id(&self, name: &str) -> Option<i64> {
        self.priority_ids.get(&name.to_lowercase()).copied()
    }

    /// Known project aliases, for error messages.
    pub fn known_projects(&self) -> Vec<String> {
        let mut names: Vec<String> = self.project_aliases.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Closed statuses: an issue in one of these is complete for every
/// aggregation. Everything else counts as open.
pub const CLOSED_STATUSES: &[&str] = &["closed", "rejected", "cancelled"];

/// Priorities counted as critical/high-severity.
pub const CRITICAL_PRIORITIES: &[&str] = &["high", "urgent", "immediate"];

/// Whether a status name belongs to the closed partition.
pub fn is_closed_status(name: &str) -> bool {
    let lower = name.to_lowercase();
    CLOSED_STATUSES.iter().any(|s| *s == lower)
}

/// Whether a priority name counts as critical.
pub fn is_critical_priority(name: &str) -> bool {
    let lower = name.to_lowercase();
    CRITICAL_PRIORITIES.iter().any(|p| *p == lower)
}

fn require_env(name: &str) -> AppResult<String> {
    match env::var(name) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::configuration(format!("{} must be set", name))),
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> AppResult<T> {
    match env::var(name) {
        Ok(v) if !v.is_empty() => v
            .parse::<T>()
            .map_err(|_| AppError::configuration(format!("{} is not a valid value", name))),
        _ => Ok(default),
    }
}

fn default_project_aliases() -> HashMap<String, i64> {
    HashMap::from([("ncel".to_string(), 6)])
}

fn default_status_ids() -> HashMap<String, i64> {
    HashMap::from([
        ("new".to_string(), 1),
        ("in_progress".to_string(), 2),
        ("resolved".to_string(), 3),
        ("feedback".to_string(), 4),
        ("closed".to_string(), 5),
        ("rejected".to_string(), 6),
        ("backlog".to_string(), 7),
        ("cancelled".to_string(), 8),
    ])
}

fn default_tracker_ids() -> HashMap<String, i64> {
    HashMap::from([
        ("bug".to_string(), 1),
        ("feature".to_string(), 2),
        ("support".to_string(), 3),
        ("story".to_string(), 4),
    ])
}

fn default_priority_ids() -> HashMap<String, i64> {
    HashMap::from([
        ("low".to_string(), 1),
        ("normal".to_string(), 2),
        ("high".to_string(), 3),
        ("urgent".to_string(), 4),
        ("immediate".to_string(), 5),
    ])
}
