// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod staging;

pub use staging::{secure_filename, StagedFile, StagingArea, StagingError, MAX_FILENAME_LEN};
