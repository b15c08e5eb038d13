//! Result tables and artifact writers
//!
//! Every run leaves a self-contained results directory: the prediction
//! table, per-model bootstrap score tables and intervals, linear
//! coefficients and forest importances over the expanded feature names,
//! and JSON summaries of metrics and the run itself.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::Utc;
use polars::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::bootstrap::{BootstrapSummary, ScoreSample};
use crate::config::ExperimentConfig;
use crate::data::{column_f64, Dataset, TargetKind, FEATURE_COLUMNS};
use crate::error::{MofcapError, Result};
use crate::experiment::{ExperimentResult, ModelRun};
use crate::metrics::{mean_absolute_error, r2_score};
use crate::models::HyperParams;
use crate::split::StratifyOutcome;

/// Held-out prediction table.
///
/// Columns are grouped by target: each distinct roster target contributes
/// one `true_<key>` column followed by `pred_<key>_<model>` columns in
/// roster order.
pub fn predictions_frame(test: &Dataset, runs: &[ModelRun]) -> Result<DataFrame> {
    let mut columns = vec![Column::new("name".into(), test.ids()?)];

    let mut targets: Vec<TargetKind> = Vec::new();
    for run in runs {
        if !targets.contains(&run.target) {
            targets.push(run.target);
        }
    }

    for target in targets {
        let truth = test.target(target)?;
        columns.push(Column::new(
            format!("true_{}", target.short_key()).into(),
            truth.to_vec(),
        ));
        for run in runs.iter().filter(|r| r.target == target) {
            columns.push(Column::new(
                format!("pred_{}_{}", target.short_key(), run.name).into(),
                run.predictions.to_vec(),
            ));
        }
    }

    Ok(DataFrame::new(columns)?)
}

/// One row per bootstrap replicate
pub fn scores_frame(samples: &[ScoreSample]) -> Result<DataFrame> {
    let r2: Vec<f64> = samples.iter().map(|s| s.r2).collect();
    let mae: Vec<f64> = samples.iter().map(|s| s.mae).collect();
    Ok(DataFrame::new(vec![
        Column::new("r2".into(), r2),
        Column::new("mae".into(), mae),
    ])?)
}

/// Per-model metrics recomputed from the written prediction table.
///
/// Serves as a consistency check on the artifacts themselves rather than
/// on in-memory state.
pub fn diagnostic_frame(predictions: &DataFrame, runs: &[ModelRun]) -> Result<DataFrame> {
    let mut models: Vec<String> = Vec::with_capacity(runs.len());
    let mut targets: Vec<String> = Vec::with_capacity(runs.len());
    let mut r2: Vec<f64> = Vec::with_capacity(runs.len());
    let mut mae: Vec<f64> = Vec::with_capacity(runs.len());

    for run in runs {
        let key = run.target.short_key();
        let truth = column_f64(predictions, &format!("true_{key}"))?;
        let preds = column_f64(predictions, &format!("pred_{key}_{}", run.name))?;
        models.push(run.name.clone());
        targets.push(run.target.column().to_string());
        r2.push(r2_score(&truth, &preds));
        mae.push(mean_absolute_error(&truth, &preds));
    }

    Ok(DataFrame::new(vec![
        Column::new("model".into(), models),
        Column::new("target".into(), targets),
        Column::new("r2".into(), r2),
        Column::new("mae".into(), mae),
    ])?)
}

/// Expanded feature names paired with linear coefficients
pub fn coefficient_frame(names: &[String], values: &ndarray::Array1<f64>) -> Result<DataFrame> {
    if names.len() != values.len() {
        return Err(MofcapError::ShapeError {
            expected: format!("{} names", values.len()),
            actual: format!("{}", names.len()),
        });
    }
    Ok(DataFrame::new(vec![
        Column::new("feature".into(), names.to_vec()),
        Column::new("coefficient".into(), values.to_vec()),
    ])?)
}

/// Expanded feature names paired with forest importances
pub fn importance_frame(names: &[String], values: &ndarray::Array1<f64>) -> Result<DataFrame> {
    if names.len() != values.len() {
        return Err(MofcapError::ShapeError {
            expected: format!("{} names", values.len()),
            actual: format!("{}", names.len()),
        });
    }
    Ok(DataFrame::new(vec![
        Column::new("feature".into(), names.to_vec()),
        Column::new("importance".into(), values.to_vec()),
    ])?)
}

#[derive(Serialize)]
struct MetricsEntry<'a> {
    target: &'a str,
    r2: f64,
    mae: f64,
    rmse: f64,
    cv_score: f64,
    best_params: &'a HyperParams,
}

#[derive(Serialize)]
struct RunSummary<'a> {
    timestamp: String,
    n_samples: usize,
    n_train: usize,
    n_test: usize,
    stratified_bins: Option<usize>,
    dropped_rows: usize,
    config: &'a ExperimentConfig,
}

/// Writes experiment artifacts under one output directory
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    out_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(out_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(out_dir)?;
        Ok(Self {
            out_dir: out_dir.to_path_buf(),
        })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Write the full artifact set for one experiment.
    pub fn write_all(
        &self,
        result: &ExperimentResult,
        config: &ExperimentConfig,
        dropped_rows: usize,
    ) -> Result<()> {
        let mut predictions = predictions_frame(&result.test, &result.runs)?;
        self.save_csv(&mut predictions, "test_predictions.csv")?;

        let mut metrics: BTreeMap<&str, MetricsEntry> = BTreeMap::new();
        for run in &result.runs {
            metrics.insert(
                run.name.as_str(),
                MetricsEntry {
                    target: run.target.column(),
                    r2: run.test_metrics.r2,
                    mae: run.test_metrics.mae,
                    rmse: run.test_metrics.rmse,
                    cv_score: run.cv_score,
                    best_params: &run.best_params,
                },
            );
        }
        self.save_json(&metrics, "metrics.json")?;

        for run in &result.runs {
            let expanded_names = run.pipeline.transform.feature_names(&FEATURE_COLUMNS)?;
            if let Some(coefficients) = run.pipeline.estimator.coefficients() {
                let mut frame = coefficient_frame(&expanded_names, coefficients)?;
                self.save_csv(&mut frame, &format!("{}_coefficients.csv", run.name))?;
            }
            if let Some(importances) = run.pipeline.estimator.feature_importances() {
                let mut frame = importance_frame(&expanded_names, &importances)?;
                self.save_csv(&mut frame, &format!("{}_feature_importances.csv", run.name))?;
            }
            let mut scores = scores_frame(&run.bootstrap_samples)?;
            self.save_csv(&mut scores, &format!("bootstrap_{}.csv", run.name))?;
        }

        let intervals: BTreeMap<&str, &BootstrapSummary> = result
            .runs
            .iter()
            .map(|run| (run.name.as_str(), &run.bootstrap_summary))
            .collect();
        self.save_json(&intervals, "bootstrap_intervals.json")?;

        let mut diagnostics = diagnostic_frame(&predictions, &result.runs)?;
        self.save_csv(&mut diagnostics, "diagnostic_metrics.csv")?;

        let summary = RunSummary {
            timestamp: Utc::now().to_rfc3339(),
            n_samples: result.n_train + result.n_test,
            n_train: result.n_train,
            n_test: result.n_test,
            stratified_bins: match result.outcome {
                StratifyOutcome::Stratified { bins } => Some(bins),
                StratifyOutcome::Unstratified => None,
            },
            dropped_rows,
            config,
        };
        self.save_json(&summary, "run_summary.json")?;

        info!(dir = %self.out_dir.display(), "artifacts written");
        Ok(())
    }

    fn save_csv(&self, df: &mut DataFrame, file_name: &str) -> Result<()> {
        let path = self.out_dir.join(file_name);
        let mut file = File::create(&path)?;
        CsvWriter::new(&mut file).include_header(true).finish(df)?;
        Ok(())
    }

    fn save_json<T: Serialize>(&self, value: &T, file_name: &str) -> Result<()> {
        let path = self.out_dir.join(file_name);
        let json = serde_json::to_string_pretty(value)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
