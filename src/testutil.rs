//! Shared test helpers for in-crate tests.

use std::sync::Arc;

use crate::auth::SessionAuthority;
use crate::config::{AdminCredentials, AuthConfig, Config, ServerConfig, StorageConfig};
use crate::storage::AssetStore;
use crate::AppState;

pub const TEST_USERNAME: &str = "admin";
pub const TEST_PASSWORD: &str = "correct horse battery staple";

/// Config rooted in a temp dir, with admin credentials and auth enforced.
pub fn test_config(temp_dir: &tempfile::TempDir) -> Config {
    Config {
        auth: AuthConfig {
            credentials: Some(AdminCredentials {
                username: TEST_USERNAME.to_string(),
                password: TEST_PASSWORD.to_string(),
            }),
            require_auth: true,
            session_secret: Some("test-session-secret-0123456789abcdef".to_string()),
            session_ttl_seconds: 600,
        },
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
        },
        storage: StorageConfig {
            public_dir: temp_dir.path().join("public").to_string_lossy().to_string(),
        },
        max_upload_size: 10 * 1024 * 1024, // 10MB for tests
    }
}

/// Create a test AppState from `test_config`.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    state_from(test_config(temp_dir))
}

pub fn state_from(config: Config) -> Arc<AppState> {
    let assets = AssetStore::open(&config.storage.public_dir);
    let sessions =
        SessionAuthority::from_config(&config.auth).expect("Failed to create session authority");

    Arc::new(AppState {
        config,
        assets,
        sessions,
    })
}

/// Serve the router on an ephemeral port. Returns the base URL.
pub async fn spawn_app(state: Arc<AppState>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");

    let app = crate::api::create_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });

    format!("http://{addr}")
}
