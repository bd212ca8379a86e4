//! Health check handler.

use axum::{extract::State, Json};

use crate::models::{GenerationStatus, HealthResponse, HistoryStatus, ModelStatus};
use crate::state::AppState;

/// Handle health check requests. Includes model and generation slot stats.
pub async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model: ModelStatus {
            id: state.gateway.model_id().to_string(),
            loaded: state.gateway.is_loaded(),
        },
        history: HistoryStatus {
            capacity: state.histories.capacity(),
            sessions: state.histories.session_count().await,
        },
        generations: GenerationStatus {
            active: state.sessions.active_count(),
            streaming: state.sessions.streaming_count(),
            max_concurrent: state.sessions.max_concurrent(),
            available: state.sessions.available_permits(),
        },
    })
}
