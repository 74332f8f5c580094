use domain::verification::Verifier;
use log::*;
use service::{config::Config, logging::Logger};
use std::sync::Arc;
use std::time::Duration;
use verify_auth::oauth::PendingStore;
use verify_auth::webhook::Ed25519WebhookValidator;

#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to initialize logger: {e}");
    }

    info!("Starting up verifyme [{:?}]...", config.runtime_env());

    let public_key = match config.discord_public_key() {
        Some(key) => key,
        None => {
            error!("DISCORD_PUBLIC_KEY not configured");
            std::process::exit(1);
        }
    };
    let validator = match Ed25519WebhookValidator::from_hex(&public_key) {
        Ok(validator) => Arc::new(validator),
        Err(e) => {
            error!("Invalid DISCORD_PUBLIC_KEY: {e}");
            std::process::exit(1);
        }
    };

    let store = match pending_ttl(config.pending_ttl_secs) {
        Some(ttl) => Arc::new(PendingStore::with_ttl(ttl)),
        None => {
            error!(
                "PENDING_TTL_SECS out of range: {}",
                config.pending_ttl_secs
            );
            std::process::exit(1);
        }
    };

    let verifier = match Verifier::from_config(&config, Arc::clone(&store)) {
        Ok(verifier) => Arc::new(verifier),
        Err(e) => {
            error!("Failed to configure verification: {e}");
            std::process::exit(1);
        }
    };

    spawn_sweeper(store, Duration::from_secs(config.pending_sweep_interval_secs));

    let app_state = web::AppState::new(config, verifier, validator);

    if let Err(e) = web::init_server(app_state).await {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
}

fn pending_ttl(secs: u64) -> Option<chrono::Duration> {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .filter(|ttl| *ttl > chrono::Duration::zero())
}

// Expired entries are also rejected lazily on lookup; the sweep only bounds memory.
fn spawn_sweeper(store: Arc<PendingStore>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every.max(Duration::from_secs(1)));
        loop {
            interval.tick().await;
            let removed = store.sweep_expired();
            if removed > 0 {
                debug!("Swept {removed} expired pending verification(s)");
            }
        }
    });
}
