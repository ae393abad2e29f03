use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use docmill_core::AppConfig;
use docmill_web::{AppState, app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    tracing::info!(?config, "starting docmill");

    let state = Arc::new(AppState::build(&config).await);
    let router = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_err() {
                // No signal handler; run until killed
                std::future::pending::<()>().await;
            }
            tracing::info!("ctrl-c received, shutting down");
        })
        .await?;

    Ok(())
}
