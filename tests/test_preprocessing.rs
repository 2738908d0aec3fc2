//! Integration test: loading, scaling, splitting and feature selection

mod common;

use firesense::config::FEATURE_NAMES;
use firesense::pipeline::{prepare_data, select_features};
use firesense::preprocessing::{train_test_split, FeatureSelector, Scaler, ScalerType};
use firesense::training::XGBoostConfig;
use firesense::utils::{frame_to_array, load_fire_csv, LabeledDataset};
use ndarray::{array, Array1};
use polars::prelude::*;

fn weather_df() -> DataFrame {
    df!(
        "Temperature" => &[29.0, 26.0, 35.0, 33.0, 31.0, 24.0, 37.0, 30.0],
        "RH" => &[57.0, 82.0, 42.0, 48.0, 60.0, 89.0, 36.0, 64.0],
        "Rain" => &[0.0, 1.3, 0.0, 0.0, 0.1, 2.5, 0.0, 0.4],
        "Classes" => &["not fire   ", "not fire", "fire", "fire   ", "fire", "not fire", "fire", "not fire"]
    )
    .unwrap()
}

#[test]
fn test_csv_headers_are_trimmed_and_labels_mapped() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::fire_csv(dir.path(), 40, 11);

    let dataset = load_fire_csv(&path, "Classes").unwrap();
    assert_eq!(dataset.feature_names, FEATURE_NAMES.iter().map(|s| s.to_string()).collect::<Vec<_>>());
    assert_eq!(dataset.n_samples(), 40);
    assert!(dataset.labels.iter().all(|&y| y == 0.0 || y == 1.0));

    let (fire, not_fire) = dataset.class_counts();
    assert_eq!(fire + not_fire, 40);
}

#[test]
fn test_dataset_from_frame() {
    let dataset = LabeledDataset::from_frame(weather_df(), "Classes").unwrap();
    assert_eq!(dataset.feature_names, vec!["Temperature", "RH", "Rain"]);
    assert_eq!(dataset.labels, array![0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 1.0, 0.0]);

    let x = dataset.feature_matrix().unwrap();
    assert_eq!(x.dim(), (8, 3));
    assert_eq!(x[[2, 1]], 42.0);
}

#[test]
fn test_missing_label_column() {
    let df = weather_df().drop("Classes").unwrap();
    assert!(LabeledDataset::from_frame(df, "Classes").is_err());
}

#[test]
fn test_robust_scaling_then_split() {
    let dataset = LabeledDataset::from_frame(weather_df(), "Classes").unwrap();
    let data = prepare_data(&dataset, ScalerType::Robust, 0.25, 42).unwrap();

    assert_eq!(data.split.x_test.nrows(), 2);
    assert_eq!(data.split.x_train.nrows(), 6);
    assert_eq!(data.scaler.columns(), dataset.feature_names);

    // Every source row lands in exactly one side of the split
    let mut seen: Vec<usize> = data
        .split
        .train_indices
        .iter()
        .chain(&data.split.test_indices)
        .copied()
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..8).collect::<Vec<_>>());

    // Scaled rows match scaling the raw rows directly
    let raw = dataset.feature_matrix().unwrap();
    let scaled = data.scaler.transform_array(&raw).unwrap();
    for (pos, &row) in data.split.test_indices.iter().enumerate() {
        assert_eq!(data.split.x_test.row(pos), scaled.row(row));
    }
}

#[test]
fn test_split_is_reproducible_across_runs() {
    let x = ndarray::Array2::from_shape_fn((50, 2), |(i, j)| (i * 2 + j) as f64);
    let y = Array1::from_shape_fn(50, |i| (i % 2) as f64);

    let a = train_test_split(&x, &y, 0.2, 42).unwrap();
    let b = train_test_split(&x, &y, 0.2, 42).unwrap();
    assert_eq!(a.test_indices, b.test_indices);
    assert_eq!(a.x_test.nrows(), 10);
}

#[test]
fn test_scaler_persists_through_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scaler.json");
    let df = weather_df();
    let columns = ["Temperature", "RH", "Rain"];

    let mut scaler = Scaler::new(ScalerType::Robust);
    let scaled = scaler.fit_transform(&df, &columns).unwrap();
    scaler.save(&path).unwrap();

    let loaded = Scaler::load(&path).unwrap();
    let again = loaded.transform(&df).unwrap();
    let a = frame_to_array(&scaled, &columns).unwrap();
    let b = frame_to_array(&again, &columns).unwrap();
    assert!((&a - &b).iter().all(|d| d.abs() < 1e-12));
}

#[test]
fn test_boosted_tree_selection_prefers_informative_features() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::fire_csv(dir.path(), 200, 12);
    let dataset = load_fire_csv(&path, "Classes").unwrap();
    let data = prepare_data(&dataset, ScalerType::Robust, 0.2, 42).unwrap();

    let config = XGBoostConfig::default().with_n_estimators(30).with_max_depth(3);
    let selection = select_features(&data, &config, 3).unwrap();

    assert_eq!(selection.selected_indices().len(), 3);
    assert!(selection.test_accuracy > 0.8);

    let informative = ["Temperature", "RH", "Rain", "FFMC", "ISI", "FWI"];
    for name in selection.selected_names() {
        assert!(informative.contains(&name.as_str()), "{} selected", name);
    }

    let report = selection.report();
    assert_eq!(report.len(), 10);
    assert_eq!(report[0].rank, 1);
    assert!(report.iter().take(3).all(|f| f.selected));
}

#[test]
fn test_selector_keeps_all_when_k_exceeds_width() {
    let mut selector = FeatureSelector::top_k(10);
    selector.fit_importances(&array![0.1, 0.7, 0.2]).unwrap();
    assert_eq!(selector.selected_indices().unwrap(), &[1, 2, 0]);
}
