mod config;

use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::info;

use blogpost_api::storage::Storage;
use blogpost_api::{AppState, AppStateInner};
use blogpost_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "blogpost=debug,blogpost_api=debug,blogpost_db=info,tower_http=debug".into()
                }),
        )
        .init();

    let config = Config::from_env()?;

    // Init database and upload storage
    let db = Database::open(&config.db_path)?;
    let storage = Storage::new(config.upload_dir.clone(), config.max_upload_bytes).await?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        storage,
        features: config.features,
    });

    let app = blogpost_api::router(state).layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("Blogpost server listening on {}", addr);
    info!(
        "Uploads {} (max {} bytes), ownership checks {}",
        if config.features.uploads_enabled { "enabled" } else { "disabled" },
        config.max_upload_bytes,
        if config.features.enforce_ownership { "on" } else { "off" },
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
