//! Application State
//!
//! The shared services built once at startup and threaded through every
//! request: configuration, tracker client, cache engine, LLM provider, and
//! the tool registry.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::config::GatewayConfig;
use crate::services::cache::CacheEngine;
use crate::services::llm::openai::OpenAiCompatProvider;
use crate::services::llm::types::ProviderConfig;
use crate::services::llm::LlmProvider;
use crate::services::tools::{build_registry, ToolContext, ToolRegistry};
use crate::services::tracker::TrackerClient;

pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub tracker: Arc<TrackerClient>,
    pub cache: Arc<CacheEngine>,
    pub llm: Arc<dyn LlmProvider>,
    pub registry: Arc<ToolRegistry>,
    started_at: Instant,
}

impl AppState {
    /// Wire up the production provider from configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let provider = OpenAiCompatProvider::new(ProviderConfig {
            api_key: Some(config.llm_api_key.clone()),
            base_url: Some(config.llm_base_url.clone()),
            model: config.llm_model.clone(),
            ..Default::default()
        });
        Self::with_provider(config, Arc::new(provider))
    }

    /// Build with an explicit provider; tests inject scripted ones.
    pub fn with_provider(config: GatewayConfig, llm: Arc<dyn LlmProvider>) -> Self {
        let config = Arc::new(config);
        let tracker = Arc::new(TrackerClient::new(&config));
        let cache = Arc::new(CacheEngine::new(Arc::clone(&config), Arc::clone(&tracker)));
        Self {
            config,
            tracker,
            cache,
            llm,
            registry: Arc::new(build_registry()),
            started_at: Instant::now(),
        }
    }

    /// Per-request tool context.
    pub fn tool_context(&self, cancellation_token: CancellationToken) -> ToolContext {
        ToolContext {
            config: Arc::clone(&self.config),
            tracker: Arc::clone(&self.tracker),
            cache: Arc::clone(&self.cache),
            cancellation_token,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_wiring() {
        let state = AppState::new(GatewayConfig::for_tests("http://127.0.0.1:1"));
        assert_eq!(state.registry.len(), 17);
        assert!(!state.cache.is_enabled());
        let ctx = state.tool_context(CancellationToken::new());
        assert_eq!(ctx.config.cache_max_issues, 1000);
    }
}
