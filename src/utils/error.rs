//! Error Handling
//!
//! Unified error types for the gateway.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::services::llm::types::LlmError;
use crate::services::tracker::TrackerError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Required environment configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Tracker API errors (auto-converted from TrackerError)
    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    /// LLM provider errors (auto-converted from LlmError)
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Cache is disabled or has never completed a refresh
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    /// Project name could not be resolved to an id
    #[error("Unknown project: {0}")]
    UnknownProject(String),

    /// Tool name not present in the registry
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Tool arguments failed validation against the descriptor
    #[error("Invalid tool argument: {0}")]
    ToolArgument(String),

    /// Request deadline exhausted before the work completed
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a cache-unavailable error
    pub fn cache_unavailable(msg: impl Into<String>) -> Self {
        Self::CacheUnavailable(msg.into())
    }

    /// Create an unknown-project error
    pub fn unknown_project(msg: impl Into<String>) -> Self {
        Self::UnknownProject(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Machine-readable kind string carried in `success:false` payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_missing",
            Self::Tracker(e) => e.kind(),
            Self::Llm(e) => e.kind(),
            Self::CacheUnavailable(_) => "cache_unavailable",
            Self::UnknownProject(_) => "unknown_project",
            Self::UnknownTool(_) => "unknown_tool",
            Self::ToolArgument(_) => "tool_argument_invalid",
            Self::DeadlineExceeded(_) => "deadline_exceeded",
            Self::Serialization(_) => "internal",
            Self::Internal(_) => "internal",
        }
    }
}

/// Convert AppError to a string suitable for tool-result payloads
impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::configuration("TRACKER_BASE_URL not set");
        assert_eq!(
            err.to_string(),
            "Configuration error: TRACKER_BASE_URL not set"
        );
    }

    #[test]
    fn test_error_kind_strings() {
        assert_eq!(
            AppError::configuration("x").kind(),
            "configuration_missing"
        );
        assert_eq!(AppError::unknown_project("x").kind(), "unknown_project");
        assert_eq!(AppError::UnknownTool("x".into()).kind(), "unknown_tool");
        assert_eq!(
            AppError::ToolArgument("x".into()).kind(),
            "tool_argument_invalid"
        );
        assert_eq!(
            AppError::DeadlineExceeded("x".into()).kind(),
            "deadline_exceeded"
        );
    }

    #[test]
    fn test_error_conversion() {
        let err = AppError::cache_unavailable("not initialized");
        let msg: String = err.into();
        assert!(msg.contains("Cache unavailable"));
    }
}
