mod api;
mod error;
mod models;
mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use auralis_core::UnifiedConfig;
use state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    tracing::info!("starting auralis-server v{}", env!("CARGO_PKG_VERSION"));

    let config = UnifiedConfig::from_env().expect("invalid configuration");
    let state = Arc::new(AppState::new(config).expect("failed to open fingerprint cache"));

    let app = Router::new()
        .route("/health", get(api::health::health_handler))
        .route("/fingerprint", post(api::fingerprint::fingerprint_handler))
        .route("/master", post(api::master::master_handler))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state);

    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], 8766));
    let listener = tokio::net::TcpListener::bind(&addr).await.expect("failed to bind to port 8766");

    tracing::info!("listening on {}", addr);

    axum::serve(listener, app).await.expect("server error");
}
