// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Class name to plant record lookup table

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

use super::{CareInstructions, PlantInfo};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read plant catalog {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid plant catalog {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Immutable after startup; keys are lowercase class names
#[derive(Debug, Clone, Default)]
pub struct PlantCatalog {
    entries: HashMap<String, PlantInfo>,
}

impl PlantCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding the records shipped with the service
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.insert("monstera", monstera());
        catalog.insert("pothos", pothos());
        catalog.insert("snake_plant", snake_plant());
        catalog.insert("fiddle_leaf_fig", fiddle_leaf_fig());
        catalog
    }

    /// Load a JSON object mapping class names to plant records
    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let entries: HashMap<String, PlantInfo> =
            serde_json::from_str(&text).map_err(|source| CatalogError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        let mut catalog = Self::new();
        for (class_name, info) in entries {
            catalog.insert(&class_name, info);
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, class_name: &str, info: PlantInfo) {
        self.entries.insert(class_name.to_lowercase(), info);
    }

    /// Add every record of `other`, replacing existing ones with the same key
    pub fn merge(&mut self, other: PlantCatalog) {
        self.entries.extend(other.entries);
    }

    /// Exact, case-insensitive lookup
    pub fn lookup(&self, class_name: &str) -> Option<&PlantInfo> {
        self.entries.get(&class_name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn monstera() -> PlantInfo {
    PlantInfo {
        name: "Monstera Deliciosa".to_string(),
        common_names: strings(&["Swiss Cheese Plant", "Split-leaf Philodendron"]),
        scientific_name: "Monstera deliciosa".to_string(),
        family: "Araceae".to_string(),
        origin: "Central America".to_string(),
        description: "A tropical plant known for its large, glossy leaves with distinctive holes and splits.".to_string(),
        care_instructions: CareInstructions {
            light: "Bright, indirect light".to_string(),
            watering: "Water when top inch of soil is dry".to_string(),
            humidity: "50-60% humidity preferred".to_string(),
            temperature: "65-85°F (18-29°C)".to_string(),
            soil: "Well-draining potting mix".to_string(),
        },
        tips: strings(&[
            "Provide a moss pole for climbing support",
            "Mist leaves regularly",
            "Clean leaves monthly",
            "Fertilize monthly during growing season",
        ]),
        toxicity: "Toxic to pets and children if ingested".to_string(),
    }
}

fn pothos() -> PlantInfo {
    PlantInfo {
        name: "Golden Pothos".to_string(),
        common_names: strings(&["Devil's Ivy", "Money Plant"]),
        scientific_name: "Epipremnum aureum".to_string(),
        family: "Araceae".to_string(),
        origin: "French Polynesia".to_string(),
        description: "A trailing vine with heart-shaped leaves marbled in yellow and green.".to_string(),
        care_instructions: CareInstructions {
            light: "Low to bright, indirect light".to_string(),
            watering: "Water when top half of soil is dry".to_string(),
            humidity: "Average household humidity".to_string(),
            temperature: "60-85°F (15-29°C)".to_string(),
            soil: "Standard well-draining potting mix".to_string(),
        },
        tips: strings(&[
            "Trim leggy vines to encourage bushier growth",
            "Cuttings root easily in water",
            "Yellow leaves usually mean overwatering",
        ]),
        toxicity: "Toxic to pets and children if ingested".to_string(),
    }
}

fn snake_plant() -> PlantInfo {
    PlantInfo {
        name: "Snake Plant".to_string(),
        common_names: strings(&["Mother-in-law's Tongue", "Saint George's Sword"]),
        scientific_name: "Dracaena trifasciata".to_string(),
        family: "Asparagaceae".to_string(),
        origin: "West Africa".to_string(),
        description: "A hardy succulent with stiff, upright, sword-shaped leaves banded in green.".to_string(),
        care_instructions: CareInstructions {
            light: "Low to bright, indirect light".to_string(),
            watering: "Water when soil is completely dry".to_string(),
            humidity: "Tolerates dry air".to_string(),
            temperature: "60-90°F (15-32°C)".to_string(),
            soil: "Cactus or succulent mix".to_string(),
        },
        tips: strings(&[
            "Water sparingly in winter",
            "Wipe dust off leaves occasionally",
            "Repot only when root bound",
        ]),
        toxicity: "Mildly toxic to pets if ingested".to_string(),
    }
}

fn fiddle_leaf_fig() -> PlantInfo {
    PlantInfo {
        name: "Fiddle Leaf Fig".to_string(),
        common_names: strings(&["Banjo Fig"]),
        scientific_name: "Ficus lyrata".to_string(),
        family: "Moraceae".to_string(),
        origin: "Western Africa".to_string(),
        description: "A tree with large, violin-shaped leaves and prominent veins.".to_string(),
        care_instructions: CareInstructions {
            light: "Bright, indirect light with some direct sun".to_string(),
            watering: "Water when top two inches of soil are dry".to_string(),
            humidity: "40-60% humidity preferred".to_string(),
            temperature: "60-75°F (15-24°C)".to_string(),
            soil: "Well-draining, peat-based potting mix".to_string(),
        },
        tips: strings(&[
            "Rotate the pot for even growth",
            "Avoid moving it once it has settled",
            "Keep away from cold drafts",
        ]),
        toxicity: "Toxic to pets if ingested".to_string(),
    }
}
