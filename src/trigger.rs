// 📨 Storage-event trigger
//
// An object-store style notification names a bucket and an object key. The
// bucket maps to a directory under a storage root; the key is the statement.
// The shared accounts file (and optionally the logo) live in the same bucket.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use crate::error::{Result, SummaryError};

pub const ACCOUNTS_KEY: &str = "accounts.csv";
pub const LOGO_KEY: &str = "stori_logo.png";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<EventRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub s3: StorageEntity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntity {
    pub bucket: Bucket,
    pub object: StoredObject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub key: String,
}

/// Local files a triggered run works on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInputs {
    pub transactions: PathBuf,
    pub accounts: PathBuf,
    /// Candidate logo; may not exist
    pub logo: PathBuf,
}

impl StorageEvent {
    /// Resolve the first record into local paths under `storage_root`
    pub fn resolve(&self, storage_root: &Path) -> Result<EventInputs> {
        let record = self
            .records
            .first()
            .ok_or_else(|| SummaryError::InvalidEvent("event has no records".to_string()))?;

        let bucket_dir = safe_join(storage_root, &record.s3.bucket.name)?;
        let key = decode_key(&record.s3.object.key)?;

        Ok(EventInputs {
            transactions: safe_join(&bucket_dir, &key)?,
            accounts: bucket_dir.join(ACCOUNTS_KEY),
            logo: bucket_dir.join(LOGO_KEY),
        })
    }
}

/// Object keys arrive URL-encoded, with `+` standing for a space
pub fn decode_key(raw: &str) -> Result<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|key| key.into_owned())
        .map_err(|e| SummaryError::InvalidEvent(format!("undecodable object key {:?}: {}", raw, e)))
}

/// Join a relative name under `base`, refusing anything that could leave it
fn safe_join(base: &Path, name: &str) -> Result<PathBuf> {
    let relative = Path::new(name);
    let plain = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)));

    if name.is_empty() || !plain {
        return Err(SummaryError::InvalidEvent(format!(
            "refusing path {:?} outside the storage root",
            name
        )));
    }

    Ok(base.join(relative))
}
