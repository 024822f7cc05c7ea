use brewhouse::{BrewApp, BrewConfig, Clock, SystemClock};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("brewhouse=info")),
        )
        .init();

    let config = BrewConfig::from_env()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let app = BrewApp::from_config(&config, clock)?;

    // Idle rate windows are dropped once per window length.
    let limiter = app.limiter.clone();
    let sweep_every = config.rate_limit.window();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_every);
        loop {
            ticker.tick().await;
            if let Err(e) = limiter.purge_expired().await {
                tracing::warn!(error = %e, "rate window purge failed");
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!(
        addr = %config.bind,
        location = %config.weather_location,
        permit_limit = config.rate_limit.permit_limit(),
        brew_limit = config.brew_limit,
        "brewhouse listening"
    );

    axum::serve(listener, app.router().into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested");
            }
        })
        .await?;
    Ok(())
}
