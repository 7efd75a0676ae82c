// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload extraction and validation

use axum::body::Bytes;
use axum_extra::extract::Multipart;
use thiserror::Error;

use crate::api::errors::ApiError;

/// Multipart field carrying the image
pub const FILE_FIELD: &str = "file";

/// Accepted filename extensions (case-insensitive)
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("No file part")]
    MissingFile,

    #[error("No selected file")]
    EmptyFilename,

    #[error("File type not allowed")]
    DisallowedExtension,
}

/// Whether `filename` ends in an allowed extension
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// File part of an analysis request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Filename as sent by the client, not yet sanitised
    pub filename: String,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.filename.is_empty() {
            return Err(ValidationError::EmptyFilename);
        }
        if !allowed_file(&self.filename) {
            return Err(ValidationError::DisallowedExtension);
        }
        Ok(())
    }
}

/// Pull the first `file` part with a filename out of a multipart body
///
/// Other fields are skipped. A `file` part with no `filename` parameter is a
/// plain form value and counts as missing. An empty file input arrives as
/// `filename=""` and is returned here for `validate` to reject.
pub async fn read_upload(mut multipart: Multipart) -> Result<UploadedFile, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };

        let bytes = field.bytes().await?;
        return Ok(UploadedFile { filename, bytes });
    }

    Err(ValidationError::MissingFile.into())
}
