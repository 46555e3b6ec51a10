//! Passgate Server - passkey ceremony verification over HTTP
//!
//! Endpoints:
//! - POST /api/register/options     - issue registration challenge
//! - POST /api/register/verify      - verify attestation, enroll credential
//! - POST /api/authenticate/options - issue authentication challenge
//! - POST /api/authenticate/verify  - verify assertion, advance counter
//! - POST /api/logout               - clear the ceremony cookie
//! - GET  /health                   - liveness probe

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use passgate_server::{create_router_with_config, storage, AppState, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "passgate_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let store = storage::from_env().await?;
    let state = AppState::new(&config, store);
    let app = create_router_with_config(&config, state);

    let addr = config.socket_addr();
    tracing::info!(
        rp_id = %config.rp_id,
        rp_origin = %config.rp_origin,
        %addr,
        "passgate server starting"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
