//! firesense CLI Module
//!
//! Command-line interface for training, explaining and predicting.

use clap::{Parser, Subcommand};
use colored::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::export::ModelArtifact;
use crate::inference::{parse_value_list, prompt_feature_values, FirePredictor, Prediction};
use crate::pipeline::{run_explain, run_training, ExplainReport, TrainingReport};
use crate::utils::load_fire_csv;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
    let _ = io::stdout().flush();
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn wait_enter() {
    println!();
    println!("  {}", dim("press enter to continue"));
    let mut input = String::new();
    let _ = io::stdin().read_line(&mut input);
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "firesense")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Wildfire detection from fire-weather readings")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Select features, train the classifier and save the artifacts
    Train {
        /// Input CSV with a `Classes` label column
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Directory for the scaler, weights and ranking report
        #[arg(short, long)]
        artifacts: Option<PathBuf>,

        /// Number of features kept from the boosted-tree ranking
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Maximum training epochs
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Random seed for the split, the trees and the network
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Compute SHAP attributions for a freshly trained boosted tree
    Explain {
        /// Input CSV with a `Classes` label column
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Directory for the SHAP values CSV
        #[arg(short, long)]
        artifacts: Option<PathBuf>,

        /// Permutations sampled per explained row
        #[arg(long)]
        samples: Option<usize>,
    },

    /// Predict fire / no fire for one set of readings
    Predict {
        /// Directory holding the saved artifacts
        #[arg(short, long)]
        artifacts: Option<PathBuf>,

        /// Comma-separated values instead of interactive prompts
        #[arg(short, long)]
        values: Option<String>,
    },

    /// Show dataset and saved model information
    Info {
        /// Input CSV with a `Classes` label column
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Directory holding the saved artifacts
        #[arg(short, long)]
        artifacts: Option<PathBuf>,
    },
}

fn base_config(data: Option<PathBuf>, artifacts: Option<PathBuf>) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    if let Some(data) = data {
        config = config.with_data_path(data);
    }
    if let Some(dir) = artifacts {
        config = config.with_artifact_dir(dir);
    }
    config
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    data: Option<PathBuf>,
    artifacts: Option<PathBuf>,
    top_k: Option<usize>,
    epochs: Option<usize>,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let mut config = base_config(data, artifacts);
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }
    if let Some(k) = top_k {
        config = config.with_top_k(k);
    }
    if let Some(epochs) = epochs {
        config.trainer.max_epochs = epochs;
    }

    section("Train");
    step_run(&format!("Training on {}", config.data_path.display()));
    let start = Instant::now();
    let report = run_training(&config)?;
    step_done(&format!("{:.1?}", start.elapsed()));

    print_training_report(&report, config.trainer.max_epochs);
    Ok(())
}

fn print_training_report(report: &TrainingReport, max_epochs: usize) {
    section("Feature ranking");
    println!("  {:<6} {:<14} {:>10} {:>9}", muted("Rank"), muted("Feature"), muted("Gain"), muted("Selected"));
    for f in &report.ranking {
        let mark = if f.selected { ok("✓") } else { dim("·") };
        println!("  {:<6} {:<14} {:>10.4} {:>9}", f.rank, f.name, f.importance, mark);
    }
    println!("  {:<20} {:.2}%", muted("XGBoost accuracy"), report.xgb_test_accuracy * 100.0);

    section("Epochs");
    for e in &report.history.epochs {
        println!(
            "  Epoch {}/{}, Train Loss: {:.4}, Validation Loss: {:.4}",
            e.epoch,
            max_epochs,
            e.train_loss,
            e.val_loss
        );
    }
    if report.history.stopped_early {
        println!("  {}", "Early stopping triggered!".yellow());
    }

    let m = &report.metrics;
    section("Evaluation");
    println!("  {:<12} {}", muted("Accuracy"), format!("{:.2}%", m.accuracy * 100.0).white().bold());
    println!("  {:<12} {:.4}", muted("Precision"), m.precision);
    println!("  {:<12} {:.4}", muted("Recall"), m.recall);
    println!("  {:<12} {:.4}", muted("F1"), m.f1_score);
    println!(
        "  {:<12} tp {}  fp {}  tn {}  fn {}",
        muted("Confusion"),
        m.confusion.true_positive,
        m.confusion.false_positive,
        m.confusion.true_negative,
        m.confusion.false_negative
    );

    section("Artifacts");
    println!("  {:<12} {}", muted("Scaler"), report.scaler_path.display());
    println!("  {:<12} {}", muted("Model"), report.model_path.display());
    println!("  {:<12} {}", muted("Ranking"), report.ranking_path.display());
    println!();
}

pub fn cmd_explain(data: Option<PathBuf>, artifacts: Option<PathBuf>, samples: Option<usize>) -> anyhow::Result<()> {
    let mut config = base_config(data, artifacts);
    if let Some(n) = samples {
        config = config.with_shap_samples(n);
    }

    section("Explain");
    step_run("Fitting boosted tree and sampling Shapley values");
    let start = Instant::now();
    let report = run_explain(&config)?;
    step_done(&format!("{} rows in {:.1?}", report.n_explained, start.elapsed()));

    print_explain_report(&report);
    Ok(())
}

fn print_explain_report(report: &ExplainReport) {
    let s = &report.summary;
    section("SHAP summary (log-odds)");
    println!(
        "  {:<14} {:>10} {:>10} {:>10} {:>10} {:>10}",
        muted("Feature"),
        muted("mean|SHAP|"),
        muted("mean"),
        muted("std"),
        muted("min"),
        muted("max")
    );
    println!("  {}", dim(&"─".repeat(70)));
    for (idx, _) in s.feature_ranking() {
        println!(
            "  {:<14} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
            s.feature_names[idx],
            s.mean_abs_shap[idx],
            s.mean_shap[idx],
            s.std_shap[idx],
            s.min_shap[idx],
            s.max_shap[idx]
        );
    }
    println!();
    println!("  {:<20} {:.2}%", muted("XGBoost accuracy"), report.xgb_test_accuracy * 100.0);
    println!("  {:<20} {}", muted("SHAP values"), report.shap_path.display());
    println!();
}

pub fn cmd_predict(artifacts: Option<PathBuf>, values: Option<String>) -> anyhow::Result<()> {
    let config = base_config(None, artifacts);
    let predictor = FirePredictor::load(
        &config.scaler_path(),
        &config.model_path(),
        config.classifier.input_dim,
    )?;

    let features = predictor.input_features().to_vec();
    let raw = match values {
        Some(text) => parse_value_list(&text, &features)?,
        None => {
            println!("Please enter the following features for prediction:");
            let stdin = io::stdin();
            let mut reader = stdin.lock();
            let mut stdout = io::stdout();
            prompt_feature_values(&mut reader, &mut stdout, &features)?
        }
    };

    let prediction = predictor.predict_values(&raw)?;
    println!("Raw model output (logits): {:?}", prediction.logits);
    println!("Model output probabilities: {:?}", prediction.probabilities);
    println!("{}", render_verdict(&prediction));
    Ok(())
}

/// Separator-framed, color-coded verdict
pub fn render_verdict(prediction: &Prediction) -> String {
    let text = format!(" Prediction: {} ", prediction.label());
    let styled = if prediction.is_fire() {
        text.red().bold().underline()
    } else {
        text.green().bold().underline()
    };
    let rule = "=".repeat(50);
    format!("\n{}\n{}\n{}", rule, styled, rule)
}

pub fn cmd_info(data: Option<PathBuf>, artifacts: Option<PathBuf>) -> anyhow::Result<()> {
    let config = base_config(data, artifacts);

    section("Data Info");
    let dataset = load_fire_csv(&config.data_path, &config.label_column)?;
    let (fire, not_fire) = dataset.class_counts();
    println!("  {:<12} {}", muted("File"), config.data_path.display());
    println!("  {:<12} {}", muted("Rows"), dataset.n_samples());
    println!("  {:<12} {}", muted("Features"), dataset.feature_names.join(", "));
    println!("  {:<12} {} fire / {} not fire", muted("Classes"), fire, not_fire);

    print_model_info(&config.model_path(), config.classifier.input_dim);
    println!();
    Ok(())
}

fn print_model_info(path: &Path, input_dim: usize) {
    section("Saved Model");
    match ModelArtifact::load(path, input_dim) {
        Ok(artifact) => {
            let meta = &artifact.metadata;
            let c = artifact.model.config();
            println!("  {:<12} {}", muted("File"), path.display());
            println!("  {:<12} {}", muted("Created"), meta.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
            println!("  {:<12} {}", muted("Features"), meta.feature_names.join(", "));
            println!(
                "  {:<12} d_model {}  heads {}  layers {}",
                muted("Network"),
                c.d_model,
                c.n_heads,
                c.n_layers
            );
            println!("  {:<12} {}", muted("Epochs"), meta.epochs_trained);
            if let Some(acc) = meta.test_accuracy {
                println!("  {:<12} {:.2}%", muted("Accuracy"), acc * 100.0);
            }
        }
        Err(e) => println!("  {} {}", dim("none:"), muted(&e.to_string())),
    }
}

// ─── Interactive mode ──────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("       {}", "┏━╸╻┏━┓┏━╸┏━┓┏━╸┏┓╻┏━┓┏━╸".truecolor(255, 140, 80));
    println!("       {}", "┣╸ ┃┣┳┛┣╸ ┗━┓┣╸ ┃┗┫┗━┓┣╸ ".truecolor(240, 110, 70));
    println!("       {}", "╹  ╹╹┗╸┗━╸┗━┛┗━╸╹ ╹┗━┛┗━╸".truecolor(220, 80, 60));
    println!();
    println!("       {}", dim(&format!("Wildfire detection  ·  v{}  ·  rust", env!("CARGO_PKG_VERSION"))));
    println!();
}

fn show_help() {
    section("Commands");

    let cmds: &[(&str, &str)] = &[
        ("firesense", "Interactive launcher (default)"),
        ("firesense train -d data.csv", "Select features and train"),
        ("firesense explain -d data.csv", "SHAP attributions"),
        ("firesense predict", "Prompt for readings and predict"),
        ("firesense predict -v 29,57,18,0,65.7,3.4,7.6,1.3,3.4,0.5", "Predict from a list"),
        ("firesense info -d data.csv", "Inspect dataset and model"),
    ];

    for (cmd, desc) in cmds {
        println!("  {:<58} {}", cmd.white(), muted(desc));
    }
    println!();
}

pub fn cmd_interactive() -> anyhow::Result<()> {
    use dialoguer::{theme::ColorfulTheme, Select};

    print_banner();

    let theme = ColorfulTheme {
        active_item_prefix: dialoguer::console::style("  ›".to_string()).for_stderr().cyan(),
        active_item_style: dialoguer::console::Style::new().for_stderr().white().bold(),
        inactive_item_prefix: dialoguer::console::style("   ".to_string()).for_stderr(),
        inactive_item_style: dialoguer::console::Style::new().for_stderr().color256(245),
        prompt_prefix: dialoguer::console::style("  ?".to_string()).for_stderr().color256(111),
        prompt_style: dialoguer::console::Style::new().for_stderr().white().bold(),
        ..ColorfulTheme::default()
    };

    loop {
        let items = &[
            "Train                 select features + fit classifier",
            "Explain               SHAP attributions",
            "Predict               enter readings, get a verdict",
            "Info                  dataset & saved model",
            "Help                  commands",
            "Exit",
        ];

        println!();
        let sel = Select::with_theme(&theme)
            .with_prompt("What would you like to do")
            .items(items)
            .default(0)
            .interact_opt()?;

        // Failures are reported and the menu stays open
        let outcome = match sel {
            Some(0) => cmd_train(None, None, None, None, None),
            Some(1) => cmd_explain(None, None, None),
            Some(2) => cmd_predict(None, None),
            Some(3) => cmd_info(None, None),
            Some(4) => {
                show_help();
                Ok(())
            }
            Some(5) | None => {
                println!();
                println!("  {}", dim("goodbye"));
                println!();
                break;
            }
            _ => Ok(()),
        };

        if let Err(e) = outcome {
            println!();
            println!("  {} {}", "error:".red().bold(), e);
        }
        wait_enter();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_text() {
        let fire = Prediction {
            logits: vec![-1.0, 1.0],
            probabilities: vec![0.12, 0.88],
            class: 1,
        };
        let rendered = render_verdict(&fire);
        assert!(rendered.contains("Prediction: Fire (1)"));
        assert_eq!(rendered.matches(&"=".repeat(50)).count(), 2);

        let no_fire = Prediction { class: 0, ..fire };
        assert!(render_verdict(&no_fire).contains("Prediction: No Fire (0)"));
    }

    #[test]
    fn test_cli_parses_predict_values() {
        let cli = Cli::parse_from(["firesense", "predict", "--values", "1,2,3"]);
        match cli.command {
            Some(Commands::Predict { values, artifacts }) => {
                assert_eq!(values.as_deref(), Some("1,2,3"));
                assert!(artifacts.is_none());
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn test_cli_without_subcommand() {
        let cli = Cli::parse_from(["firesense"]);
        assert!(cli.command.is_none());
    }
}
