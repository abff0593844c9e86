use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::path::Path;

use super::StorageError;

/// Fallback original name, matching what browsers send for an unnamed Blob.
pub const DEFAULT_ORIGINAL_NAME: &str = "blob";

/// Longest name part kept in a key, leaving room for the uuid prefix and `.json`
/// suffix under the usual 255-byte filename limit.
const MAX_NAME_BYTES: usize = 200;

/// Characters that would end or alter a URL path segment if left raw.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Build a fresh storage key from the submitted filename.
pub fn generate_key(original_filename: Option<&str>) -> String {
    let name = key_safe_name(original_filename.unwrap_or_default());
    format!("{}_{}", uuid::Uuid::new_v4(), name)
}

/// Public retrieval path for a stored blob, with the key encoded as one path segment.
pub fn public_path(key: &str) -> String {
    format!("/uploads/{}", utf8_percent_encode(key, PATH_SEGMENT))
}

/// Reject keys that could escape the storage directories or hit internal entries.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("File ID is required".to_string()));
    }
    if key.len() > 255 {
        return Err(StorageError::InvalidKey("File ID is too long".to_string()));
    }
    if key.starts_with('.') || key.contains(['/', '\\', '\0']) {
        return Err(StorageError::InvalidKey(format!("Invalid file ID: {key}")));
    }
    Ok(())
}

/// Reduce a browser-supplied filename to something usable inside a key:
/// final path component only, no NULs, bounded length with the extension kept.
fn key_safe_name(raw: &str) -> String {
    let base = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .replace('\0', "");
    let base = base.trim();

    if base.is_empty() || base == "." || base == ".." {
        return DEFAULT_ORIGINAL_NAME.to_string();
    }
    if base.len() <= MAX_NAME_BYTES {
        return base.to_string();
    }

    let ext = Path::new(base)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.len() < 16)
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    let budget = MAX_NAME_BYTES - ext.len();
    let mut end = budget;
    while !base.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &base[..end], ext)
}
