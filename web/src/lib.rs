use domain::verification::Verifier;
use log::*;
use service::config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use verify_auth::webhook::WebhookValidator;

mod controller;
mod error;
mod middleware;
mod response;
pub mod router;

pub use error::{Error, Result};

// Everything a request handler needs. Cheap to clone: the verifier and the
// validator are shared behind `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub verifier: Arc<Verifier>,
    pub validator: Arc<dyn WebhookValidator>,
}

impl AppState {
    pub fn new(
        config: Config,
        verifier: Arc<Verifier>,
        validator: Arc<dyn WebhookValidator>,
    ) -> Self {
        Self {
            config,
            verifier,
            validator,
        }
    }
}

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let interface = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "0.0.0.0".to_string());
    let server_url = format!("{}:{}", interface, app_state.config.port);

    info!("Server starting... listening for connections on http://{server_url}");

    let listener = TcpListener::bind(&server_url).await?;
    let router = router::define_routes(app_state);

    axum::serve(listener, router).await
}
