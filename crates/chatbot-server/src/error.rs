//! HTTP error handling and response mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chatbot_engine::ModelError;

use crate::models::ErrorBody;

pub const INVALID_REQUEST_MESSAGE: &str =
    "Invalid request: expected JSON with 'prompt' or form field 'prompt'";
pub const MODEL_UNAVAILABLE_MESSAGE: &str = "Model not available";
pub const GENERATION_FAILED_MESSAGE: &str = "Generation failed";
pub const AT_CAPACITY_MESSAGE: &str = "Server at capacity, try again later";

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("request carried no usable prompt")]
    InvalidRequest,

    #[error("model not available: {0}")]
    ModelUnavailable(#[source] ModelError),

    #[error("generation failed: {0}")]
    Generation(#[source] ModelError),

    #[error("server at capacity")]
    ServiceUnavailable,
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest => StatusCode::BAD_REQUEST,
            ServerError::ModelUnavailable(_) | ServerError::Generation(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServerError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Client-facing message. Internal detail stays in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            ServerError::InvalidRequest => INVALID_REQUEST_MESSAGE,
            ServerError::ModelUnavailable(_) => MODEL_UNAVAILABLE_MESSAGE,
            ServerError::Generation(_) => GENERATION_FAILED_MESSAGE,
            ServerError::ServiceUnavailable => AT_CAPACITY_MESSAGE,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.public_message(),
        });
        (self.status(), body).into_response()
    }
}
