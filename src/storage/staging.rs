// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload staging on local disk
//!
//! Uploads are written under a sanitised name with a unique per-request
//! prefix. The returned [`StagedFile`] owns the path and deletes it when
//! dropped.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

/// Used when sanitising leaves nothing behind
pub const FALLBACK_FILENAME: &str = "upload";

/// Longest sanitised name, in bytes; leaves room for the staging prefix
pub const MAX_FILENAME_LEN: usize = 100;

const STAGED_PREFIX: &str = "stage-";

const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM0", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7",
    "COM8", "COM9", "LPT0", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("Failed to create staging directory {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to write staged file in {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// Reduce a client supplied filename to something safe to join onto a directory
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");

    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        return FALLBACK_FILENAME.to_string();
    }

    let stem = trimmed.split('.').next().unwrap_or_default().to_ascii_uppercase();
    let safe = if WINDOWS_DEVICE_NAMES.contains(&stem.as_str()) {
        format!("_{}", trimmed)
    } else {
        trimmed.to_string()
    };

    truncate_filename(safe)
}

/// Shorten an ASCII name to [`MAX_FILENAME_LEN`], keeping the extension
fn truncate_filename(name: String) -> String {
    if name.len() <= MAX_FILENAME_LEN {
        return name;
    }

    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() < MAX_FILENAME_LEN - 1 => {
            let keep = MAX_FILENAME_LEN - ext.len() - 1;
            format!("{}.{}", &stem[..keep], ext)
        }
        _ => name[..MAX_FILENAME_LEN].to_string(),
    }
}

/// Directory that holds uploads while they are being analysed
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    /// Open the staging directory, creating it if missing
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StagingError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StagingError::CreateDir {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` to a new uniquely named file in the staging directory
    pub fn stage(&self, filename: &str, bytes: &[u8]) -> Result<StagedFile, StagingError> {
        let safe_name = secure_filename(filename);
        let suffix = format!("_{}", safe_name);

        let write_error = |source| StagingError::Write {
            path: self.dir.display().to_string(),
            source,
        };

        let mut file = tempfile::Builder::new()
            .prefix(STAGED_PREFIX)
            .suffix(&suffix)
            .rand_bytes(8)
            .tempfile_in(&self.dir)
            .map_err(write_error)?;

        file.write_all(bytes).map_err(write_error)?;
        file.flush().map_err(write_error)?;

        debug!(
            "Staged {} ({} bytes) at {}",
            filename,
            bytes.len(),
            file.path().display()
        );

        Ok(StagedFile {
            file,
            original_name: filename.to_string(),
        })
    }
}

/// A staged upload, removed from disk when dropped
#[derive(Debug)]
pub struct StagedFile {
    file: NamedTempFile,
    original_name: String,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Filename as sent by the client
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Delete the staged file now, logging instead of failing on error
    pub fn remove(self) {
        let path = self.file.path().to_path_buf();
        if let Err(e) = self.file.close() {
            warn!("Failed to remove staged file {}: {}", path.display(), e);
        }
    }
}
