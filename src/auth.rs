//! Admin sessions: credential check and HMAC-signed, expiring bearer tokens.
//!
//! Token layout: `base64url("<username>:<issued_ms>:<expires_ms>") "." base64url(tag)`,
//! where `tag` is HMAC-SHA256 over the first segment.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use ring::hmac;
use ring::rand::SystemRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{AdminCredentials, AuthConfig, MAX_SESSION_TTL_SECONDS};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Admin credentials not configured")]
    NotConfigured,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Missing session token")]
    MissingToken,
    #[error("Malformed session token")]
    Malformed,
    #[error("Invalid session signature")]
    BadSignature,
    #[error("Session expired")]
    Expired,
    #[error("Failed to generate session key")]
    KeyGeneration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub username: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub session: Session,
}

pub struct SessionAuthority {
    key: hmac::Key,
    ttl: Duration,
    credentials: Option<AdminCredentials>,
    require_auth: bool,
}

impl SessionAuthority {
    /// Build from config. Without SESSION_SECRET a random key is generated,
    /// so tokens do not survive a restart.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let key = match config.session_secret {
            Some(ref secret) => hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes()),
            None => hmac::Key::generate(hmac::HMAC_SHA256, &SystemRandom::new())
                .map_err(|_| AuthError::KeyGeneration)?,
        };

        Ok(Self {
            key,
            ttl: Duration::seconds(config.session_ttl_seconds.min(MAX_SESSION_TTL_SECONDS) as i64),
            credentials: config.credentials.clone(),
            require_auth: config.require_auth,
        })
    }

    /// Whether mutating routes demand a session.
    pub fn require_auth(&self) -> bool {
        self.require_auth
    }

    /// Check the admin credentials and issue a token on success.
    pub fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        let creds = self.credentials.as_ref().ok_or(AuthError::NotConfigured)?;

        // Evaluate both comparisons so timing does not reveal which one failed.
        let user_ok = self.constant_time_eq(username, &creds.username);
        let pass_ok = self.constant_time_eq(password, &creds.password);
        if !(user_ok & pass_ok) {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(self.issue_at(username, Utc::now()))
    }

    pub fn verify(&self, token: &str) -> Result<Session, AuthError> {
        self.verify_at(token, Utc::now())
    }

    fn constant_time_eq(&self, given: &str, expected: &str) -> bool {
        let tag = hmac::sign(&self.key, expected.as_bytes());
        hmac::verify(&self.key, given.as_bytes(), tag.as_ref()).is_ok()
    }

    fn issue_at(&self, username: &str, now: DateTime<Utc>) -> IssuedToken {
        let expires_at = now + self.ttl;
        let payload = format!(
            "{username}:{}:{}",
            now.timestamp_millis(),
            expires_at.timestamp_millis()
        );
        let encoded = URL_SAFE_NO_PAD.encode(payload);
        let tag = hmac::sign(&self.key, encoded.as_bytes());

        IssuedToken {
            token: format!("{encoded}.{}", URL_SAFE_NO_PAD.encode(tag.as_ref())),
            session: Session {
                username: username.to_string(),
                issued_at: now,
                expires_at,
            },
        }
    }

    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Session, AuthError> {
        let (encoded, tag) = token.split_once('.').ok_or(AuthError::Malformed)?;
        let tag = URL_SAFE_NO_PAD
            .decode(tag)
            .map_err(|_| AuthError::Malformed)?;

        hmac::verify(&self.key, encoded.as_bytes(), &tag).map_err(|_| AuthError::BadSignature)?;

        let payload = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| AuthError::Malformed)?;
        let payload = String::from_utf8(payload).map_err(|_| AuthError::Malformed)?;

        // Username may itself contain ':', so split from the right.
        let mut parts = payload.rsplitn(3, ':');
        let expires_ms = parts.next().and_then(|s| s.parse::<i64>().ok());
        let issued_ms = parts.next().and_then(|s| s.parse::<i64>().ok());
        let username = parts.next();

        let (Some(expires_ms), Some(issued_ms), Some(username)) = (expires_ms, issued_ms, username)
        else {
            return Err(AuthError::Malformed);
        };

        let issued_at = Utc
            .timestamp_millis_opt(issued_ms)
            .single()
            .ok_or(AuthError::Malformed)?;
        let expires_at = Utc
            .timestamp_millis_opt(expires_ms)
            .single()
            .ok_or(AuthError::Malformed)?;

        if now >= expires_at {
            return Err(AuthError::Expired);
        }

        Ok(Session {
            username: username.to_string(),
            issued_at,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authority() -> SessionAuthority {
        SessionAuthority::from_config(&AuthConfig {
            credentials: Some(AdminCredentials {
                username: "admin".to_string(),
                password: "s3cret".to_string(),
            }),
            require_auth: true,
            session_secret: Some("x".repeat(32)),
            session_ttl_seconds: 60,
        })
        .unwrap()
    }

    #[test]
    fn test_login_and_verify() {
        let auth = authority();
        let issued = auth.login("admin", "s3cret").unwrap();

        let session = auth.verify(&issued.token).unwrap();
        assert_eq!(session.username, "admin");
        assert_eq!(session.expires_at - session.issued_at, Duration::seconds(60));
    }

    #[test]
    fn test_login_rejects_wrong_password() {
        let auth = authority();
        assert_eq!(
            auth.login("admin", "wrong").unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert_eq!(
            auth.login("root", "s3cret").unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[test]
    fn test_login_without_credentials() {
        let auth = SessionAuthority::from_config(&AuthConfig::default()).unwrap();
        assert_eq!(
            auth.login("admin", "s3cret").unwrap_err(),
            AuthError::NotConfigured
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let auth = authority();
        let issued = auth.issue_at("admin", Utc::now() - Duration::seconds(120));
        assert_eq!(auth.verify(&issued.token).unwrap_err(), AuthError::Expired);
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let auth = authority();
        let issued = auth.login("admin", "s3cret").unwrap();
        let (_, tag) = issued.token.split_once('.').unwrap();

        let forged_payload = URL_SAFE_NO_PAD.encode("admin:0:99999999999999");
        let forged = format!("{forged_payload}.{tag}");
        assert_eq!(auth.verify(&forged).unwrap_err(), AuthError::BadSignature);
    }

    #[test]
    fn test_unsigned_client_token_rejected() {
        // The shape a browser-side gate would fabricate: base64("user:timestamp").
        let auth = authority();
        let fabricated = URL_SAFE_NO_PAD.encode("admin:1700000000000");
        assert_eq!(auth.verify(&fabricated).unwrap_err(), AuthError::Malformed);
    }

    #[test]
    fn test_token_from_other_key_rejected() {
        let issued = authority().login("admin", "s3cret").unwrap();
        let other = SessionAuthority::from_config(&AuthConfig {
            session_secret: Some("y".repeat(32)),
            ..AuthConfig::default()
        })
        .unwrap();
        assert_eq!(
            other.verify(&issued.token).unwrap_err(),
            AuthError::BadSignature
        );
    }

    #[test]
    fn test_username_with_colon() {
        let auth = authority();
        let issued = auth.issue_at("a:b", Utc::now());
        assert_eq!(auth.verify(&issued.token).unwrap().username, "a:b");
    }
}
