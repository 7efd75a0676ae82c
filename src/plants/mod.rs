// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Plant metadata attached to analysis results

pub mod catalog;

use serde::{Deserialize, Serialize};

pub use catalog::{CatalogError, PlantCatalog};

/// Descriptive record for a plant species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantInfo {
    pub name: String,
    #[serde(default)]
    pub common_names: Vec<String>,
    #[serde(default)]
    pub scientific_name: String,
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub care_instructions: CareInstructions,
    #[serde(default)]
    pub tips: Vec<String>,
    #[serde(default)]
    pub toxicity: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CareInstructions {
    #[serde(default)]
    pub light: String,
    #[serde(default)]
    pub watering: String,
    #[serde(default)]
    pub humidity: String,
    #[serde(default)]
    pub temperature: String,
    #[serde(default)]
    pub soil: String,
}
