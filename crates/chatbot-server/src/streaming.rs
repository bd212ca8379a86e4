//! Server-Sent Events (SSE) streaming of chat replies.
//!
//! - Each chunk is sent as `data: <chunk>\n\n`, in arrival order
//! - A generation failure ends the stream with an `event: error` frame
//! - Once the reply is complete it is committed to the conversation history
//! - Stream stops when the client disconnects (via the session guard)

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use tokio::sync::mpsc;

use crate::error::GENERATION_FAILED_MESSAGE;
use crate::gateway::ChunkResult;
use crate::history::SharedHistory;
use crate::models::ErrorBody;
use crate::session_manager::SessionGuard;

/// Relay generated chunks to the client, then record the exchange.
///
/// The stream owns the `SessionGuard`. When the client disconnects, axum
/// drops the stream, which drops the guard, which cancels generation; the
/// history is left untouched in that case.
pub fn stream_chatbot_reply(
    mut chunks: mpsc::Receiver<ChunkResult>,
    prompt: String,
    history: SharedHistory,
    guard: SessionGuard,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        let guard = guard;
        let mut reply = String::new();

        while let Some(item) = chunks.recv().await {
            match item {
                Ok(chunk) => {
                    reply.push_str(&chunk);
                    yield Ok(chunk_event(&chunk));
                }
                Err(err) => {
                    tracing::warn!(
                        session = %guard.session_id(),
                        error = %err,
                        "stream ended by generation error"
                    );
                    yield Ok(error_event());
                    return;
                }
            }
        }

        if guard.cancellation_token().is_cancelled() {
            return;
        }

        let reply = reply.trim();
        if !reply.is_empty() {
            history.lock().await.append_exchange(prompt, reply);
            tracing::debug!(session = %guard.session_id(), "streamed reply committed to history");
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// SSE field values cannot carry carriage returns; newlines are split into
/// separate `data:` lines by the framing.
fn chunk_event(chunk: &str) -> Event {
    Event::default().data(chunk.replace('\r', ""))
}

fn error_event() -> Event {
    let body = ErrorBody {
        error: GENERATION_FAILED_MESSAGE,
    };
    Event::default().event("error").data(
        serde_json::to_string(&body).unwrap_or_else(|_| GENERATION_FAILED_MESSAGE.to_string()),
    )
}
