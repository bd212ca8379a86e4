//! JSON response bodies.

use serde::Serialize;

/// Body of every error response: `{"error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: ModelStatus,
    pub history: HistoryStatus,
    pub generations: GenerationStatus,
}

#[derive(Debug, Serialize)]
pub struct ModelStatus {
    pub id: String,
    pub loaded: bool,
}

#[derive(Debug, Serialize)]
pub struct HistoryStatus {
    pub capacity: usize,
    pub sessions: usize,
}

#[derive(Debug, Serialize)]
pub struct GenerationStatus {
    pub active: usize,
    pub streaming: usize,
    pub max_concurrent: usize,
    pub available: usize,
}
