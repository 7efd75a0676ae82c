// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use plant_vision::{
    api::{AnalysisPipeline, AppState},
    config::ServiceConfig,
    plants::PlantCatalog,
    start_server,
    storage::StagingArea,
    version,
    vision::{Annotator, YoloDetector},
};
use std::{env, sync::Arc};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = ServiceConfig::parse();
    config.validate().context("Invalid configuration")?;

    info!("Starting {}", version::get_version_string());
    info!("Build: {}", version::VERSION);

    let staging = StagingArea::new(&config.upload_dir).context("Failed to prepare upload directory")?;
    info!("Staging uploads in {}", staging.dir().display());

    // Load the detection model once; every request shares this session
    let detector = YoloDetector::new(&config.detector_config())
        .with_context(|| format!("Failed to load model {}", config.model_path.display()))?;
    info!(
        "Detection model ready: {} classes, input {}x{}",
        detector.labels().len(),
        detector.input_size(),
        detector.input_size()
    );

    let mut catalog = PlantCatalog::builtin();
    if let Some(path) = &config.plant_catalog {
        let extra = PlantCatalog::from_json_file(path).context("Failed to load plant catalog")?;
        info!("Loaded {} plant records from {}", extra.len(), path.display());
        catalog.merge(extra);
    }

    let annotator = match &config.font_path {
        Some(path) => Annotator::from_font_file(path).context("Failed to load label font")?,
        None => {
            warn!("FONT_PATH not set, boxes will be drawn without label text");
            Annotator::default()
        }
    };

    let pipeline = AnalysisPipeline::new(Arc::new(detector), staging, catalog)
        .with_annotator(annotator)
        .with_thresholds(config.thresholds())
        .with_jpeg_quality(config.jpeg_quality);

    let state = AppState::new(pipeline).with_max_upload_bytes(config.max_upload_bytes);

    start_server(config.listen_addr(), state).await
}
