//! Chat pipeline: phase-1 category selection and the phase-2 tool loop.

pub mod category;
pub mod runtime;

use serde::{Deserialize, Serialize};

pub use category::{select_category, CategorySelection, SelectionSource};
pub use runtime::{run_chat, ChatOutcome};

/// One wire-format conversation turn, as carried in `conversationHistory`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl HistoryEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            tool_call_id: None,
            name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
            tool_call_id: None,
            name: None,
        }
    }
}
