// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Input validation and sanitization.
//!
//! Everything here runs synchronously before any state mutation; rejected
//! input never reaches the quota ledger or the database.

use unicode_normalization::UnicodeNormalization;

use crate::config::{ALLOWED_MIME_TYPES, MAX_FILE_SIZE};
use crate::error::ApiError;

/// Characters that make a file name unsafe to store or serve.
const FORBIDDEN_NAME_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Normalize user text: strip HTML angle brackets, collapse whitespace
/// runs, NFC-normalize, and trim.
pub fn sanitize_text(input: &str) -> String {
    let stripped: String = input
        .nfc()
        .filter(|c| *c != '<' && *c != '>')
        .collect();

    let mut out = String::with_capacity(stripped.len());
    let mut in_whitespace = false;
    for c in stripped.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push(' ');
            }
            in_whitespace = true;
        } else {
            out.push(c);
            in_whitespace = false;
        }
    }
    out.trim().to_string()
}

/// Validate an uploaded file's size, declared content type, and name.
pub fn validate_file(file_name: &str, size: u64, content_type: &str) -> Result<(), ApiError> {
    if size > MAX_FILE_SIZE {
        return Err(ApiError::bad_request(format!(
            "File size exceeds {}MB limit",
            MAX_FILE_SIZE / 1024 / 1024
        )));
    }

    if !ALLOWED_MIME_TYPES.contains(&content_type) {
        return Err(ApiError::bad_request(format!(
            "File type {content_type} is not allowed"
        )));
    }

    if file_name.is_empty() || file_name.chars().any(|c| FORBIDDEN_NAME_CHARS.contains(&c)) {
        return Err(ApiError::bad_request(
            "File name contains invalid characters",
        ));
    }

    Ok(())
}

/// Validate an item identifier (UUID v4 as issued at creation).
pub fn validate_item_id(id: &str) -> Result<(), ApiError> {
    uuid::Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| ApiError::bad_request("Invalid item ID"))
}
