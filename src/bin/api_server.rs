// Contact Relay Server Binary Entry Point
//
// Purpose: Start the Axum contact relay
// Usage: cargo run --features api --bin api_server

use portfolio_site_rust::{create_router, AppState, RelayConfig};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (structured logging)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    // Default log level: info for our crate, warn for others
                    "portfolio_site_rust=info,tower_http=debug,axum=debug,warn".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting contact relay...");

    // Configuration from environment variables
    let config = RelayConfig::from_env()?;
    let port = config.port;

    tracing::info!("Configuration:");
    tracing::info!("  PORT: {}", port);
    tracing::info!("  CONTACT_RECIPIENT: {}", config.recipient);
    tracing::info!("  MAIL_FROM: {}", config.from_address);
    tracing::info!("  MAIL_API_URL: {}", config.mail_api_url.as_deref().unwrap_or("(log only)"));
    tracing::info!("  DEDUP_TTL: {:?}", config.dedup_ttl);

    let state = AppState::from_config(config)?;
    let app = create_router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .await?;

    Ok(())
}
