// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Class names for detector outputs

use std::collections::BTreeMap;
use std::path::Path;

use super::DetectionError;

/// Metadata key under which the YOLO exporter stores class names
pub const NAMES_METADATA_KEY: &str = "names";

/// Class ids at or above this are treated as corrupt metadata
pub const MAX_CLASSES: usize = 10_000;

/// Maps class ids produced by the model to names
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassLabels {
    names: Vec<String>,
}

impl ClassLabels {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Read a labels file with one class name per line
    ///
    /// Blank lines are skipped, so line N of the non-blank lines is class N.
    pub fn from_file(path: &Path) -> Result<Self, DetectionError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DetectionError::Labels(format!("{}: {}", path.display(), e)))?;

        let names: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        if names.is_empty() {
            return Err(DetectionError::Labels(format!(
                "{}: no class names found",
                path.display()
            )));
        }

        Ok(Self { names })
    }

    /// Parse the `names` metadata written by the YOLO ONNX exporter
    ///
    /// The value is a Python dict literal such as `{0: 'monstera', 1: 'pothos'}`.
    /// Ids missing from the dict get a generated `class_<id>` name.
    pub fn from_metadata(value: &str) -> Option<Self> {
        let body = value.trim().strip_prefix('{')?.strip_suffix('}')?;
        let mut entries = BTreeMap::new();
        let mut chars = body.chars().peekable();

        loop {
            while chars.next_if(|c| c.is_whitespace() || *c == ',').is_some() {}
            if chars.peek().is_none() {
                break;
            }

            let mut key = String::new();
            while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
                key.push(c);
            }
            let id: usize = key.parse().ok()?;

            while chars.next_if(|c| c.is_whitespace()).is_some() {}
            if chars.next()? != ':' {
                return None;
            }
            while chars.next_if(|c| c.is_whitespace()).is_some() {}

            let quote = chars.next().filter(|c| *c == '\'' || *c == '"')?;
            let mut name = String::new();
            loop {
                match chars.next()? {
                    c if c == quote => break,
                    c => name.push(c),
                }
            }

            entries.insert(id, name);
        }

        let max_id = *entries.keys().next_back()?;
        if max_id >= MAX_CLASSES {
            return None;
        }
        let names = (0..=max_id)
            .map(|id| entries.remove(&id).unwrap_or_else(|| fallback_name(id)))
            .collect();

        Some(Self { names })
    }

    /// Name for `class_id`, or `class_<id>` when the id is unknown
    pub fn name(&self, class_id: usize) -> String {
        self.names
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| fallback_name(class_id))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn fallback_name(class_id: usize) -> String {
    format!("class_{}", class_id)
}
