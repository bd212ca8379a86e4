//! Prompt extraction from raw request bodies.
//!
//! Accepts a JSON object with a `prompt` key, or a `prompt` field sent as
//! `application/x-www-form-urlencoded` or `multipart/form-data`. Anything
//! else is logged (truncated) and treated as absent.

use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Multipart, Request},
    http::{header, HeaderMap},
};
use serde_json::Value;

/// Longest slice of an unusable body written to the log, in characters.
pub const MAX_LOGGED_BODY_CHARS: usize = 1000;

const URLENCODED_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const MULTIPART_CONTENT_TYPE: &str = "multipart/form-data";

/// Pull the prompt out of a request. `None` means no usable prompt.
pub async fn extract_prompt(headers: &HeaderMap, body: &Bytes) -> Option<String> {
    // A JSON object decides on its own; a missing key does not fall through to form parsing.
    if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) {
        return map.get("prompt").and_then(prompt_from_json);
    }

    let form_prompt = match mime(headers) {
        Some(m) if m.eq_ignore_ascii_case(URLENCODED_CONTENT_TYPE) => urlencoded_prompt(body),
        Some(m) if m.eq_ignore_ascii_case(MULTIPART_CONTENT_TYPE) => {
            multipart_prompt(headers, body.clone()).await
        }
        _ => None,
    };
    if let Some(prompt) = form_prompt {
        return (!prompt.is_empty()).then_some(prompt);
    }

    if !body.is_empty() {
        tracing::warn!(
            payload = %truncate_chars(&String::from_utf8_lossy(body), MAX_LOGGED_BODY_CHARS),
            "received invalid payload (not JSON/form)"
        );
    }
    None
}

fn urlencoded_prompt(body: &[u8]) -> Option<String> {
    let fields = serde_urlencoded::from_bytes::<Vec<(String, String)>>(body).ok()?;
    fields
        .into_iter()
        .find(|(name, _)| name == "prompt")
        .map(|(_, value)| value)
}

/// First `prompt` part of a multipart body. Malformed bodies yield `None`.
async fn multipart_prompt(headers: &HeaderMap, body: Bytes) -> Option<String> {
    let content_type = headers.get(header::CONTENT_TYPE)?.clone();
    let request = Request::builder()
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .ok()?;
    let mut multipart = Multipart::from_request(request, &()).await.ok()?;

    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("prompt") {
            return field.text().await.ok();
        }
    }
    None
}

/// Render a JSON `prompt` value as text. Falsy values count as absent.
fn prompt_from_json(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some(value.to_string()),
        Value::Number(n) => (n.as_f64() != Some(0.0)).then(|| n.to_string()),
        Value::String(s) => (!s.is_empty()).then(|| s.clone()),
        Value::Array(items) => (!items.is_empty()).then(|| value.to_string()),
        Value::Object(fields) => (!fields.is_empty()).then(|| value.to_string()),
    }
}

fn mime(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::trim)
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
