//! Analytical cache: snapshot lifecycle and refresh policy.

pub mod engine;

pub use engine::{CacheEngine, CacheInfo};
