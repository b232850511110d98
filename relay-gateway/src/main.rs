//! Entry point for the `relay-gateway` HTTP server.

use relay_gateway::{config::GatewayConfig, routes::create_router, state::AppState};
use tracing::info;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = GatewayConfig::from_env();
    let addr = config.listen_addr.clone();

    let state = match AppState::shared(config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to initialise outbound engine");
            std::process::exit(1);
        }
    };
    let app = create_router(state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };

    info!(addr = %addr, "relay-gateway listening");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
