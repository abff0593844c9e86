use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notes_portal::{api, auth::SessionAuthority, config::Config, storage::AssetStore, AppState};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real environment variables take precedence anyway.
    dotenv::dotenv().ok();

    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "notes-portal starting");

    // Load configuration
    let config = Config::load()?;
    info!(
        public_dir = %config.storage.public_dir,
        require_auth = config.auth.require_auth,
        "Loaded configuration"
    );

    // Settle interrupted uploads/deletes before taking traffic
    let assets = AssetStore::open(&config.storage.public_dir);
    let stats = assets.recover().await?;
    info!(
        staged_removed = stats.staged_removed,
        deletes_completed = stats.deletes_completed,
        orphans_removed = stats.orphans_removed,
        "Storage recovery complete"
    );

    let sessions = SessionAuthority::from_config(&config.auth)?;
    if config.auth.session_secret.is_none() {
        info!("SESSION_SECRET not set; using a per-process key, sessions end on restart");
    }

    let state = Arc::new(AppState {
        config: config.clone(),
        assets,
        sessions,
    });

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    info!("Listening on: {}", config.server.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
