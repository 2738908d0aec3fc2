//! Shared fixtures for integration tests

#![allow(dead_code)]

use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::path::{Path, PathBuf};

use firesense::architectures::ClassifierConfig;
use firesense::config::PipelineConfig;
use firesense::training::{TrainerConfig, XGBoostConfig};

/// Header as published: the label column last, some names padded with spaces
pub const HEADER: &str = "Temperature, RH, Ws,Rain ,FFMC,DMC,DC,ISI,BUI,FWI,Classes";

/// Generate a fire-weather CSV whose labels follow FFMC and ISI with a little noise
pub fn fire_csv(dir: &Path, n_rows: usize, seed: u64) -> PathBuf {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut text = String::from(HEADER);
    text.push('\n');

    for _ in 0..n_rows {
        let fire = rng.gen_bool(0.55);
        let temperature = if fire { rng.gen_range(30.0..42.0) } else { rng.gen_range(22.0..34.0) };
        let rh = if fire { rng.gen_range(25.0..60.0) } else { rng.gen_range(50.0..90.0) };
        let ws = rng.gen_range(6.0..26.0);
        let rain = if fire { 0.0 } else { rng.gen_range(0.0..4.0) };
        let ffmc = if fire { rng.gen_range(80.0..96.0) } else { rng.gen_range(30.0..78.0) };
        let dmc = rng.gen_range(1.0..60.0);
        let dc = rng.gen_range(7.0..200.0);
        let isi = if fire { rng.gen_range(3.0..18.0) } else { rng.gen_range(0.0..3.5) };
        let bui = rng.gen_range(1.0..60.0);
        let fwi = if fire { rng.gen_range(4.0..30.0) } else { rng.gen_range(0.0..4.0) };
        let label = if fire { "fire   " } else { "not fire   " };

        text.push_str(&format!(
            "{:.1},{:.0},{:.0},{:.1},{:.1},{:.1},{:.1},{:.1},{:.1},{:.1},{}\n",
            temperature, rh, ws, rain, ffmc, dmc, dc, isi, bui, fwi, label
        ));
    }

    let path = dir.join("fire.csv");
    std::fs::write(&path, text).unwrap();
    path
}

/// Pipeline settings small enough for tests
pub fn small_config(data: &Path, artifacts: &Path) -> PipelineConfig {
    PipelineConfig::default()
        .with_data_path(data)
        .with_artifact_dir(artifacts)
        .with_xgboost(XGBoostConfig::default().with_n_estimators(20).with_max_depth(3))
        .with_classifier(
            ClassifierConfig::default()
                .with_d_model(16)
                .with_heads(2)
                .with_dim_feedforward(32),
        )
        .with_trainer(
            TrainerConfig::default()
                .with_learning_rate(5e-3)
                .with_batch_size(32)
                .with_max_epochs(12)
                .with_patience(3),
        )
        .with_shap_samples(4)
}
