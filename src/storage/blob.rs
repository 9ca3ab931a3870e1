// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blob storage for uploaded file payloads.
//!
//! Bytes land under `<data_dir>/blobs/` with a content-type sidecar; items
//! in the database store only the fetchable reference URL this module
//! returns, never the bytes. Keys follow the pattern
//! `<network-prefix>/<timestamp>_<suffix>_<file-name>` so one network's
//! uploads group under one directory.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::NetworkId;

/// Served when a blob predates its sidecar or the sidecar is unreadable.
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Error type for blob operations.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metadata error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("invalid blob key: {0}")]
    InvalidKey(String),
}

pub type BlobResult<T> = Result<T, BlobError>;

/// Content-type sidecar written next to each blob.
#[derive(Debug, Serialize, Deserialize)]
struct BlobMeta {
    content_type: String,
    file_name: String,
}

/// Reference to a stored blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Storage key relative to the blob root.
    pub key: String,
    /// Publicly fetchable URL for the blob.
    pub url: String,
}

/// Directory-backed byte store with URL references.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
    public_base: Url,
}

impl BlobStore {
    /// Create a store rooted at `<data_dir>/blobs`, building reference URLs
    /// from `public_base` (e.g. `http://192.168.1.10:8080`).
    pub fn new(data_dir: impl AsRef<Path>, public_base: Url) -> Self {
        Self {
            root: data_dir.as_ref().join("blobs"),
            public_base,
        }
    }

    /// Create the blob directory. Safe to call multiple times.
    pub fn initialize(&self) -> BlobResult<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Root directory holding the blobs.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the blob directory exists and is accessible.
    pub fn is_available(&self) -> bool {
        self.root.is_dir()
    }

    /// Store a payload and return its key and reference URL.
    pub fn put(
        &self,
        network_id: &NetworkId,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
        now: DateTime<Utc>,
    ) -> BlobResult<StoredBlob> {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let key = format!(
            "{}/{}_{}_{}",
            &network_id.as_str()[..8],
            now.timestamp_millis(),
            &suffix[..8],
            file_name
        );
        validate_key(&key)?;

        let path = self.root.join(&key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = File::create(&path)?;
        file.write_all(bytes)?;
        file.flush()?;

        let meta = BlobMeta {
            content_type: content_type.to_string(),
            file_name: file_name.to_string(),
        };
        fs::write(self.meta_path(&key), serde_json::to_vec(&meta)?)?;

        let url = self.public_base.join(&format!("v1/blobs/{key}"))?;
        Ok(StoredBlob {
            key,
            url: url.to_string(),
        })
    }

    /// Read a blob back as `(bytes, content_type)`.
    pub fn open(&self, key: &str) -> BlobResult<(Vec<u8>, String)> {
        validate_key(key)?;
        let path = self.root.join(key);
        if !path.is_file() {
            return Err(BlobError::NotFound(key.to_string()));
        }

        let bytes = fs::read(&path)?;
        let content_type = fs::read(self.meta_path(key))
            .ok()
            .and_then(|raw| serde_json::from_slice::<BlobMeta>(&raw).ok())
            .map(|meta| meta.content_type)
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        Ok((bytes, content_type))
    }

    /// Delete a blob and its sidecar. Missing blobs are a no-op.
    pub fn delete(&self, key: &str) -> BlobResult<()> {
        validate_key(key)?;
        let path = self.root.join(key);
        if path.is_file() {
            fs::remove_file(&path)?;
        }
        let meta = self.meta_path(key);
        if meta.is_file() {
            fs::remove_file(&meta)?;
        }
        Ok(())
    }

    /// Recover the storage key from a reference URL this store produced.
    /// Returns `None` for foreign URLs.
    pub fn key_from_url(&self, url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        let path = parsed.path();
        path.strip_prefix("/v1/blobs/").map(|key| {
            // Reference URLs percent-encode spaces and the like; keys are
            // the decoded form.
            percent_decode(key)
        })
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.meta.json"))
    }
}

/// Keys come from URLs and must stay inside the blob root.
fn validate_key(key: &str) -> BlobResult<()> {
    let suspicious = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if suspicious {
        return Err(BlobError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Minimal percent-decoding for path segments produced by `Url::join`.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 3 <= bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            if let Ok(byte) = u8::from_str_radix(&input[i + 1..i + 3], 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
