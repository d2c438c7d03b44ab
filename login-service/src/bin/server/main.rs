use std::sync::Arc;

use login_service::config::Config;
use login_service::inbound::http::router::create_router;
use login_service::inbound::http::router::AppState;
use login_service::inbound::http::router::OAuth2Clients;
use login_service::outbound::oauth2::UnavailableOAuth2Client;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use warden::SystemClock;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "login_service=debug,warden=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "login-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        oauth2_provider = %config.oauth2.provider_id,
        token_header = %config.jwt.header_name,
        "Configuration loaded"
    );

    let oauth2_client = Arc::new(UnavailableOAuth2Client);
    let state = AppState::from_config(
        &config,
        OAuth2Clients {
            access_token: oauth2_client.clone(),
            profile: oauth2_client,
        },
        Arc::new(SystemClock),
    )?;

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    axum::serve(http_listener, create_router(state)).await?;

    tracing::info!("Server exited successfully");
    Ok(())
}
