use crate::{
    controller::{callback_controller, health_check_controller, interaction_controller},
    middleware::signature::require_signature,
    AppState,
};
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

// Global OpenAPI document. To be a part
// of the rendered document, a path must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "verifyme"
        ),
        paths(
            callback_controller::callback,
            health_check_controller::health_check,
            interaction_controller::interact,
        ),
        tags(
            (name = "verifyme", description = "Member verification through OAuth2")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(callback_routes(app_state.clone()))
        .merge(interaction_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn callback_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/callback", get(callback_controller::callback))
        .with_state(app_state)
}

fn interaction_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/interactions", post(interaction_controller::interact))
        .route_layer(from_fn_with_state(app_state.clone(), require_signature))
        .with_state(app_state)
}
