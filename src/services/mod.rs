//! Service layer: tracker client, cache engine, analytics, LLM, tools, chat.

pub mod analytics;
pub mod cache;
pub mod chat;
pub mod llm;
pub mod tools;
pub mod tracker;
