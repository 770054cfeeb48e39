use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};

use tracker_gateway::config::GatewayConfig;
use tracker_gateway::http;
use tracker_gateway::state::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let port = config.port;
    let state = Arc::new(AppState::new(config));
    let app = http::router(Arc::clone(&state));

    let listener = match tokio::net::TcpListener::bind(("0.0.0.0", port)).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(port, "failed to bind: {}", err);
            return ExitCode::FAILURE;
        }
    };

    info!(port, model = state.llm.model(), "gateway listening");
    if let Err(err) = axum::serve(listener, app).await {
        error!("server error: {}", err);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
