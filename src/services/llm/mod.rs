//! LLM provider layer: shared types, the provider trait, and the
//! OpenAI-compatible chat-completions client.

pub mod openai;
pub mod provider;
pub mod types;

pub use provider::LlmProvider;
pub use types::{LlmError, LlmResponse, LlmResult};
