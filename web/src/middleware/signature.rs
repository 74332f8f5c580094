use std::collections::HashMap;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use log::*;

use crate::AppState;

// Interaction payloads are small; anything bigger is not from the platform.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Rejects interaction requests whose Ed25519 signature does not verify.
///
/// The body is buffered so the signature can cover the exact bytes received,
/// then handed on unchanged to the handler.
pub async fn require_signature(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to read interaction body: {e}");
            return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
        }
    };

    let headers: HashMap<String, String> = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();

    match app_state.validator.validate(&headers, &bytes) {
        Ok(true) => next.run(Request::from_parts(parts, Body::from(bytes))).await,
        Ok(false) => {
            warn!("Rejected interaction with an invalid signature");
            (StatusCode::UNAUTHORIZED, "invalid request signature").into_response()
        }
        Err(e) => {
            warn!("Rejected interaction: {e}");
            (StatusCode::UNAUTHORIZED, "invalid request signature").into_response()
        }
    }
}
