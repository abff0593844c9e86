//! Typed HTTP client for the portal API, as used by admin front ends.
//!
//! The client keeps a cache of asset records keyed by id. The server stays the source
//! of truth: every mutation clears the cache, and a successful one refetches the listing.

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::api::response::ErrorBody;
use crate::auth::{LoginRequest, LoginResponse, Session};
use crate::storage::models::{AssetRecord, Subject};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Server returned {status}: {message}")]
    Api { status: StatusCode, message: String },
}

impl ClientError {
    /// HTTP status of a server-side rejection, if that is what this is.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A file to upload plus the form fields that describe it.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub filename: String,
    pub description: String,
    pub category: String,
    /// Name sent as the multipart part's filename.
    pub file_name: String,
    pub data: Bytes,
}

pub struct PortalClient {
    http: reqwest::Client,
    base_url: Url,
    token: RwLock<Option<String>>,
    cache: RwLock<HashMap<String, AssetRecord>>,
}

impl PortalClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            http: reqwest::Client::builder().build()?,
            base_url,
            token: RwLock::new(None),
            cache: RwLock::new(HashMap::new()),
        })
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Log in and keep the token for subsequent calls.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let resp = self
            .http
            .post(self.endpoint(&["api", "auth", "login"])?)
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let login: LoginResponse = check(resp).await?.json().await?;

        *self.token.write().await = Some(login.token.clone());
        Ok(login)
    }

    pub async fn logout(&self) {
        *self.token.write().await = None;
    }

    /// Ask the server whether the stored token is still valid.
    pub async fn session(&self) -> Result<Session, ClientError> {
        let req = self.http.get(self.endpoint(&["api", "auth", "session"])?);
        let resp = self.authorize(req).await.send().await?;
        Ok(check(resp).await?.json().await?)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn categories(&self) -> Result<Vec<Subject>, ClientError> {
        let resp = self
            .http
            .get(self.endpoint(&["api", "categories"])?)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    /// Fetch every record and replace the cache with the result.
    pub async fn list_files(&self) -> Result<Vec<AssetRecord>, ClientError> {
        let records = self.fetch_records(None).await?;

        let mut cache = self.cache.write().await;
        cache.clear();
        cache.extend(records.iter().map(|r| (r.id.clone(), r.clone())));
        Ok(records)
    }

    /// Records of one category, filtered server-side. Leaves the cache alone.
    pub async fn list_category(&self, category: &str) -> Result<Vec<AssetRecord>, ClientError> {
        self.fetch_records(Some(category)).await
    }

    pub async fn fetch_blob(&self, record: &AssetRecord) -> Result<Bytes, ClientError> {
        let resp = self
            .http
            .get(self.endpoint(&["uploads", &record.id])?)
            .send()
            .await?;
        Ok(check(resp).await?.bytes().await?)
    }

    pub async fn cached(&self, id: &str) -> Option<AssetRecord> {
        self.cache.read().await.get(id).cloned()
    }

    pub async fn cached_files(&self) -> Vec<AssetRecord> {
        self.cache.read().await.values().cloned().collect()
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    pub async fn upload(&self, upload: UploadRequest) -> Result<AssetRecord, ClientError> {
        let form = Form::new()
            .text("filename", upload.filename)
            .text("description", upload.description)
            .text("category", upload.category)
            .part(
                "file",
                Part::bytes(upload.data.to_vec()).file_name(upload.file_name),
            );

        let req = self
            .http
            .post(self.endpoint(&["api", "files", "upload"])?)
            .multipart(form);
        let record: AssetRecord = self.send_mutation(req).await?.json().await?;

        self.list_files().await?;
        Ok(record)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ClientError> {
        let req = self.http.delete(self.endpoint(&["api", "files", id])?);
        self.send_mutation(req).await?;

        self.list_files().await?;
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn send_mutation(&self, req: RequestBuilder) -> Result<Response, ClientError> {
        let result = match self.authorize(req).await.send().await {
            Ok(resp) => check(resp).await,
            Err(e) => Err(e.into()),
        };

        // Whatever happened, the server may have changed underneath us.
        self.cache.write().await.clear();
        result
    }

    async fn fetch_records(&self, category: Option<&str>) -> Result<Vec<AssetRecord>, ClientError> {
        let mut req = self.http.get(self.endpoint(&["api", "files"])?);
        if let Some(category) = category {
            req = req.query(&[("category", category)]);
        }
        let resp = req.send().await?;
        Ok(check(resp).await?.json().await?)
    }

    async fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.token.read().await.as_deref() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Turn a non-2xx response into `ClientError::Api`, using the server's error message.
async fn check(resp: Response) -> Result<Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or(body);
    Err(ClientError::Api { status, message })
}
