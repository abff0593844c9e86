//! notes-portal - file storage API for an educational-notes portal
//!
//! This crate provides the backend of a subject-grouped notes library:
//! - Multipart upload of reference files (PDFs/images) with a JSON sidecar record each
//! - Listing and deletion of those records, with blobs served at their public path
//! - Atomic write/delete protocol with a startup recovery sweep
//! - HMAC-signed, expiring admin sessions guarding the mutating routes
//! - A typed HTTP client with an id-keyed cache for admin front ends

pub mod api;
pub mod auth;
pub mod blob_store;
pub mod client;
pub mod config;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use auth::SessionAuthority;
use config::Config;
use storage::AssetStore;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub assets: AssetStore,
    pub sessions: SessionAuthority,
}
