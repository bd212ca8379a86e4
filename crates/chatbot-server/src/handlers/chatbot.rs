//! Chat handlers: blocking reply and streamed reply.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};

use crate::{
    error::ServerError,
    prompt::extract_prompt,
    session_manager::{GenerationKind, SessionGuard},
    state::AppState,
    streaming,
};

/// Request header selecting a per-session history.
pub const SESSION_HEADER: &str = "x-session-id";

const MAX_SESSION_ID_LEN: usize = 128;

/// Handle `POST /chatbot`: generate a reply and return it as plain text.
///
/// The history lock is held across generation so exchanges on the same
/// history are recorded in the order they were generated.
pub async fn handle_chatbot(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ServerError> {
    let (prompt, guard) = admit(&state, &headers, &body, GenerationKind::Blocking).await?;

    let history = state.histories.resolve(session_id(&headers)).await;
    let mut history = history.lock().await;
    let reply = state
        .gateway
        .generate(history.joined(), prompt.clone(), guard.cancellation_token())
        .await
        .map_err(|err| {
            tracing::error!(session = %guard.session_id(), error = %err, "generation failed");
            ServerError::Generation(err)
        })?;

    history.append_exchange(prompt, reply.clone());
    drop(history);
    drop(guard);

    Ok(reply.into_response())
}

/// Handle `POST /chatbot/stream`: relay the reply as Server-Sent Events.
pub async fn handle_chatbot_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ServerError> {
    let (prompt, guard) = admit(&state, &headers, &body, GenerationKind::Streaming).await?;

    let history = state.histories.resolve(session_id(&headers)).await;
    let history_text = history.lock().await.joined();
    let chunks = state
        .gateway
        .generate_streaming(history_text, prompt.clone(), guard.cancellation_token())
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to start streaming generation");
            ServerError::ModelUnavailable(err)
        })?;

    // The guard moves into the stream and lives until the client is done.
    Ok(streaming::stream_chatbot_reply(chunks, prompt, history, guard).into_response())
}

/// Steps shared by both handlers: extract the prompt, take a generation
/// slot, and make sure the model is loaded.
async fn admit(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
    kind: GenerationKind,
) -> Result<(String, SessionGuard), ServerError> {
    let prompt = extract_prompt(headers, body)
        .await
        .ok_or(ServerError::InvalidRequest)?;

    let guard = state
        .sessions
        .try_acquire(kind)
        .ok_or(ServerError::ServiceUnavailable)?;

    if let Err(err) = state.gateway.ensure_loaded().await {
        tracing::error!(
            model = %state.gateway.model_id(),
            error = ?err,
            "failed to load model"
        );
        return Err(ServerError::ModelUnavailable(err));
    }

    Ok((prompt, guard))
}

/// The session id carried by the request, if it is a usable one.
fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_SESSION_ID_LEN)
}
