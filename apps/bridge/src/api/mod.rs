// API layer module (adapter between observers and the bridge hub)

pub mod errors;
pub mod handlers;

use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::bridge::HubHandle;
use handlers::{agents, health, observers};

/// Builds the HTTP router
///
/// The browser client connects its WebSocket to `/`.
pub fn router(hub: HubHandle) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Observer channel
        .route("/", get(observers::observe))
        // Health check
        .route("/health", get(health::health_check))
        // Snapshot
        .route("/api/agents", get(agents::list_agents))
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        // Shared state
        .with_state(hub)
}
