//! Tracker REST client.

pub mod client;
pub mod types;

pub use client::{IssueQuery, TrackerClient, TrackerError};
