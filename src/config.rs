use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub auth: AuthConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root of the public tree; `uploads/` and `metadata/` live underneath it.
    pub public_dir: String,
}

#[derive(Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct AuthConfig {
    /// `None` when either ADMIN_USERNAME or ADMIN_PASSWORD is unset.
    pub credentials: Option<AdminCredentials>,
    /// When false, upload and delete accept requests without a session.
    pub require_auth: bool,
    /// HMAC key material for session tokens. A random key is generated when unset.
    pub session_secret: Option<String>,
    pub session_ttl_seconds: u64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("credentials", &self.credentials)
            .field("require_auth", &self.require_auth)
            .field(
                "session_secret",
                &self.session_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("session_ttl_seconds", &self.session_ttl_seconds)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            public_dir: "./public".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            require_auth: true,
            session_secret: None,
            session_ttl_seconds: 8 * 60 * 60,
        }
    }
}

/// Minimum length for an operator-supplied SESSION_SECRET.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

/// Upper bound for SESSION_TTL_SECONDS (one year).
pub const MAX_SESSION_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let public_dir = std::env::var("PUBLIC_DIR").unwrap_or_else(|_| "./public".to_string());

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(50 * 1024 * 1024); // 50MB

        let username = env_with_fallback("ADMIN_USERNAME", "NEXT_PUBLIC_ADMIN_USERNAME");
        let password = env_with_fallback("ADMIN_PASSWORD", "NEXT_PUBLIC_ADMIN_PASSWORD");
        let credentials = match (username, password) {
            (Some(username), Some(password)) => Some(AdminCredentials { username, password }),
            _ => None,
        };

        let require_auth = std::env::var("REQUIRE_AUTH")
            .map(|v| parse_flag(&v))
            .unwrap_or(true);

        let session_secret = std::env::var("SESSION_SECRET")
            .ok()
            .filter(|s| !s.is_empty());

        let session_ttl_seconds = std::env::var("SESSION_TTL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8 * 60 * 60);

        let config = Config {
            auth: AuthConfig {
                credentials,
                require_auth,
                session_secret,
                session_ttl_seconds,
            },
            server: ServerConfig { bind_address },
            storage: StorageConfig { public_dir },
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.public_dir.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "PUBLIC_DIR cannot be empty".to_string(),
            ));
        }

        if self.max_upload_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_UPLOAD_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.auth.session_ttl_seconds == 0
            || self.auth.session_ttl_seconds > MAX_SESSION_TTL_SECONDS
        {
            return Err(ConfigError::ValidationError(format!(
                "SESSION_TTL_SECONDS must be between 1 and {MAX_SESSION_TTL_SECONDS}"
            )));
        }

        if let Some(ref secret) = self.auth.session_secret {
            if secret.len() < MIN_SESSION_SECRET_LEN {
                return Err(ConfigError::ValidationError(format!(
                    "SESSION_SECRET must be at least {MIN_SESSION_SECRET_LEN} bytes"
                )));
            }
        }

        if let Some(ref creds) = self.auth.credentials {
            if creds.username.is_empty() || creds.password.is_empty() {
                return Err(ConfigError::ValidationError(
                    "ADMIN_USERNAME and ADMIN_PASSWORD cannot be empty".to_string(),
                ));
            }
        }

        if self.auth.require_auth && self.auth.credentials.is_none() {
            tracing::warn!(
                "ADMIN_USERNAME/ADMIN_PASSWORD are not set. Login is disabled, so uploads \
                 and deletes will be rejected until credentials are configured."
            );
        }

        if !self.auth.require_auth {
            tracing::warn!("REQUIRE_AUTH is off. Upload and delete are open to any client.");
        }

        Ok(())
    }
}

/// Anything other than a recognisable "off" value keeps the flag on.
fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    !(value == "0"
        || value.eq_ignore_ascii_case("false")
        || value.eq_ignore_ascii_case("no")
        || value.eq_ignore_ascii_case("off"))
}

fn env_with_fallback(primary: &str, fallback: &str) -> Option<String> {
    std::env::var(primary)
        .or_else(|_| std::env::var(fallback))
        .ok()
        .filter(|s| !s.is_empty())
}
