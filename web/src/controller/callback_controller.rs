use crate::response::page;
use crate::{AppState, Error};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use domain::verification::CallbackParams;
use log::*;

/// GET the OAuth redirect target that completes a verification
#[utoipa::path(
    get,
    path = "/callback",
    params(
        ("code" = Option<String>, Query, description = "Authorization code issued by the identity provider"),
        ("state" = Option<String>, Query, description = "Correlation token minted when the member pressed Verify"),
    ),
    responses(
        (status = 200, description = "Member verified; confirmation page", content_type = "text/html"),
        (status = 400, description = "Missing parameters, unknown or expired state, or identity mismatch", content_type = "text/html"),
        (status = 404, description = "Guild or member no longer available", content_type = "text/html"),
        (status = 502, description = "Identity provider failure", content_type = "text/html"),
        (status = 500, description = "Roles missing or role update failed", content_type = "text/html"),
    )
)]
pub async fn callback(
    State(app_state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("OAuth callback received");

    let verified = app_state.verifier.complete(&params).await?;

    Ok((StatusCode::OK, page::success(&verified)))
}
