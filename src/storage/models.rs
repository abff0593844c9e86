use std::borrow::Cow;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One uploaded asset, persisted as `<id>.json` next to the blob `<id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    /// Storage key: `<uuid>_<original filename>`.
    pub id: String,
    /// Display name entered by the uploader.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub filename: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub original_filename: String,
    /// Public retrieval path of the blob.
    pub path: String,
    pub upload_date: DateTime<Utc>,
}

/// Input for creating an asset. Text fields are stored as given.
#[derive(Debug, Clone, Default)]
pub struct NewAsset {
    pub filename: String,
    pub description: String,
    pub category: String,
    /// Name of the file as submitted by the browser, if it sent one.
    pub original_filename: Option<String>,
    pub data: Bytes,
}

/// A subject label that assets are grouped under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub value: Cow<'static, str>,
    pub label: Cow<'static, str>,
}

impl Subject {
    const fn fixed(name: &'static str) -> Self {
        Self {
            value: Cow::Borrowed(name),
            label: Cow::Borrowed(name),
        }
    }
}

/// The fixed set of subject categories. Uploads are not checked against it.
pub const SUBJECTS: &[Subject] = &[
    Subject::fixed("Άλγεβρα"),
    Subject::fixed("Προγραμματισμός"),
    Subject::fixed("Δίκτυα"),
    Subject::fixed("Νέα Ελληνικά"),
    Subject::fixed("Πληροφοριακά Συστήματα"),
];

/// Records written by older clients carry `null` for fields the form left blank.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
