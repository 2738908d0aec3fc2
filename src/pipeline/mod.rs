//! Training and explainability pipelines
//!
//! The stages share nothing at runtime: training writes the scaler, the
//! classifier weights and the ranking report; prediction reads the first two
//! back; explanation refits its own model from the CSV.

use crate::architectures::TransformerClassifier;
use crate::config::PipelineConfig;
use crate::error::{FireError, Result};
use crate::explainability::{write_shap_csv, ShapExplainer, ShapSummary};
use crate::export::{save_json, ModelArtifact};
use crate::preprocessing::{train_test_split, FeatureSelector, RankedFeature, Scaler, ScalerType, TrainTestSplit};
use crate::training::{evaluate, ClassificationMetrics, ClassifierTrainer, TrainingHistory, XGBoostClassifier, XGBoostConfig};
use crate::utils::{frame_to_array, load_fire_csv, LabeledDataset};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Scaled, split data plus the scaler that produced it
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub scaler: Scaler,
    pub split: TrainTestSplit,
    pub feature_names: Vec<String>,
}

/// Fit a scaler on every feature column, scale, and split with `seed`
pub fn prepare_data(
    dataset: &LabeledDataset,
    scaler_type: ScalerType,
    test_size: f64,
    seed: u64,
) -> Result<PreparedData> {
    let names: Vec<&str> = dataset.feature_names.iter().map(String::as_str).collect();
    let mut scaler = Scaler::new(scaler_type);
    let scaled = scaler.fit_transform(&dataset.features, &names)?;
    let x = frame_to_array(&scaled, &names)?;
    let split = train_test_split(&x, &dataset.labels, test_size, seed)?;

    Ok(PreparedData {
        scaler,
        split,
        feature_names: dataset.feature_names.clone(),
    })
}

/// Boosted-tree fit used for ranking, and the selector built from its importances
#[derive(Debug, Clone)]
pub struct FeatureSelection {
    pub selector: FeatureSelector,
    pub model: XGBoostClassifier,
    /// Boosted-tree accuracy on the held-out split
    pub test_accuracy: f64,
}

impl FeatureSelection {
    pub fn selected_names(&self) -> Vec<String> {
        self.selector.selected_names().unwrap_or_default()
    }

    pub fn selected_indices(&self) -> &[usize] {
        self.selector.selected_indices().unwrap_or(&[])
    }

    pub fn report(&self) -> Vec<RankedFeature> {
        self.selector.report().unwrap_or_default()
    }
}

/// Train the boosted tree on all features and keep the `top_k` most important
pub fn select_features(
    data: &PreparedData,
    xgb_config: &XGBoostConfig,
    top_k: usize,
) -> Result<FeatureSelection> {
    let split = &data.split;
    let mut model = XGBoostClassifier::new(xgb_config.clone());
    model.fit(&split.x_train, &split.y_train)?;
    let test_accuracy = model.score(&split.x_test, &split.y_test)?;

    let importances = model.feature_importances().ok_or(FireError::ModelNotFitted)?;
    let mut selector = FeatureSelector::top_k(top_k).with_feature_names(data.feature_names.clone());
    selector.fit_importances(&importances)?;

    let selection = FeatureSelection {
        selector,
        model,
        test_accuracy,
    };
    info!(
        selected = ?selection.selected_names(),
        xgb_accuracy = test_accuracy,
        "Feature selection complete"
    );
    Ok(selection)
}

/// Everything the training run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub selected_features: Vec<String>,
    pub ranking: Vec<RankedFeature>,
    pub xgb_test_accuracy: f64,
    pub history: TrainingHistory,
    pub metrics: ClassificationMetrics,
    /// Source rows of the held-out split
    pub test_indices: Vec<usize>,
    /// Classifier prediction for each held-out row
    pub test_predictions: Vec<usize>,
    pub scaler_path: PathBuf,
    pub model_path: PathBuf,
    pub ranking_path: PathBuf,
}

/// Feature selection, classifier training, evaluation and persistence
pub fn run_training(config: &PipelineConfig) -> Result<TrainingReport> {
    config.validate()?;
    let start = Instant::now();

    let dataset = load_fire_csv(&config.data_path, &config.label_column)?;
    let data = prepare_data(&dataset, config.scaler_type, config.test_size, config.seed)?;
    info!(
        train = data.split.x_train.nrows(),
        test = data.split.x_test.nrows(),
        scaler = ?config.scaler_type,
        "Data prepared"
    );

    let selection = select_features(&data, &config.xgboost, config.top_k)?;
    let selected_names = selection.selected_names();
    let reduced = data.split.select_columns(selection.selected_indices())?;

    let mut classifier_config = config.classifier.clone();
    classifier_config.input_dim = selected_names.len();
    let mut model = TransformerClassifier::new(classifier_config)?;

    let trainer = ClassifierTrainer::new(config.trainer.clone());
    let history = trainer.fit(&mut model, &reduced.x_train, &reduced.y_train, &reduced.x_test, &reduced.y_test)?;

    let metrics = evaluate(&model, &reduced.x_test, &reduced.y_test)?;
    let test_predictions = model.predict(&reduced.x_test)?.to_vec();
    info!(
        accuracy = metrics.accuracy,
        precision = metrics.precision,
        recall = metrics.recall,
        f1 = metrics.f1_score,
        "Classifier evaluated"
    );

    let scaler_path = config.scaler_path();
    let model_path = config.model_path();
    let ranking_path = config.ranking_path();
    let ranking = selection.report();

    data.scaler.save(&scaler_path)?;
    let epochs_trained = history.epochs_trained();
    ModelArtifact::new(model, selected_names.clone(), Some(metrics.accuracy), epochs_trained)?.save(&model_path)?;
    save_json(&ranking, &ranking_path)?;

    info!(
        scaler = %scaler_path.display(),
        model = %model_path.display(),
        elapsed_secs = start.elapsed().as_secs_f64(),
        "Training artifacts saved"
    );

    Ok(TrainingReport {
        selected_features: selected_names,
        ranking,
        xgb_test_accuracy: selection.test_accuracy,
        history,
        metrics,
        test_indices: data.split.test_indices.clone(),
        test_predictions,
        scaler_path,
        model_path,
        ranking_path,
    })
}

/// Output of the explainability run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainReport {
    pub xgb_test_accuracy: f64,
    pub summary: ShapSummary,
    pub n_explained: usize,
    pub shap_path: PathBuf,
}

/// Refit the boosted tree on differently scaled data and attribute its
/// log-odds output on the training rows
pub fn run_explain(config: &PipelineConfig) -> Result<ExplainReport> {
    config.validate()?;
    let start = Instant::now();

    let dataset = load_fire_csv(&config.data_path, &config.label_column)?;
    let data = prepare_data(&dataset, config.explain_scaler_type, config.test_size, config.seed)?;
    let split = &data.split;

    let mut model = XGBoostClassifier::new(config.xgboost.clone());
    model.fit(&split.x_train, &split.y_train)?;
    let xgb_test_accuracy = model.score(&split.x_test, &split.y_test)?;

    let explainer = ShapExplainer::new(|x: &ndarray::Array2<f64>| model.predict_margin(x), split.x_train.clone())?
        .with_n_samples(config.shap_samples)
        .with_seed(config.seed)
        .with_feature_names(data.feature_names.clone())?;
    let explanations = explainer.explain_batch(&split.x_train)?;
    let summary = ShapSummary::from_explanations(&explanations)?;

    let shap_path = config.shap_path();
    write_shap_csv(&shap_path, &explanations)?;

    info!(
        rows = explanations.len(),
        permutations = config.shap_samples,
        elapsed_secs = start.elapsed().as_secs_f64(),
        "SHAP attribution complete"
    );

    Ok(ExplainReport {
        xgb_test_accuracy,
        summary,
        n_explained: explanations.len(),
        shap_path,
    })
}
