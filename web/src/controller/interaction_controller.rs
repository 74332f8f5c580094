use crate::AppState;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use domain::interaction::{self, Interaction};

/// POST an interaction from the platform (button presses and commands)
///
/// Requests reach this handler only after their signature has been verified.
#[utoipa::path(
    post,
    path = "/interactions",
    request_body(content = String, description = "Interaction payload", content_type = "application/json"),
    responses(
        (status = 200, description = "Interaction response"),
        (status = 401, description = "Missing or invalid request signature"),
    )
)]
pub async fn interact(
    State(app_state): State<AppState>,
    Json(payload): Json<Interaction>,
) -> impl IntoResponse {
    Json(interaction::handle(&app_state.verifier, payload).await)
}
