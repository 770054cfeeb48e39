//! HTTP surface: chat, cache control, health, and tool listing.

pub mod routes;

pub use routes::router;
