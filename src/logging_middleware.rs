// src/logging_middleware.rs
//! Debug-level request/response body logging with secrets redacted

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tracing::{debug, Level};

use crate::common::helpers::redact_json;

/// Bodies larger than this are summarised instead of logged
const MAX_LOGGED_BODY: usize = 64 * 1024;

/// Pretty JSON with sensitive fields masked; other bodies are summarised
fn render_body(bytes: &Bytes) -> String {
    if bytes.len() > MAX_LOGGED_BODY {
        return format!("<{} bytes, too large to log>", bytes.len());
    }
    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(mut json) => {
            redact_json(&mut json);
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        }
        Err(_) => format!("<{} bytes, not JSON>", bytes.len()),
    }
}

pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    if !tracing::enabled!(Level::DEBUG) {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    if !bytes.is_empty() {
        debug!(
            method = %parts.method,
            uri = %parts.uri,
            request_body = %render_body(&bytes),
            "📥 Request"
        );
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if !bytes.is_empty() {
        debug!(
            status = %parts.status,
            response_body = %render_body(&bytes),
            "📤 Response"
        );
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}
