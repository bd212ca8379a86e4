//! Server setup and routing.

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{handlers, state::AppState};

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/chatbot", post(handlers::chatbot::handle_chatbot))
        .route(
            "/chatbot/stream",
            post(handlers::chatbot::handle_chatbot_stream),
        )
        .route("/health", get(handlers::health::handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the HTTP server.
pub async fn run_server(
    state: AppState,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    if state.config.preload_model {
        state.gateway.preload().await;
    }

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "chatbot server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
