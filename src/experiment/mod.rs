//! End-to-end experiment orchestration
//!
//! One call runs the whole study: partition the dataset, search each
//! roster entry on the training rows, evaluate the winners on the held-out
//! rows, and bootstrap confidence intervals for every fitted model.

use ndarray::Array1;
use tracing::{info, info_span};

use crate::bootstrap::{bootstrap_scores, summarize, BootstrapSummary, ScoreSample};
use crate::config::ExperimentConfig;
use crate::data::{Dataset, TargetKind};
use crate::error::Result;
use crate::metrics::RegressionMetrics;
use crate::models::{HyperParams, ModelFamily};
use crate::pipeline::FittedPipeline;
use crate::search::{CandidateScore, GridSearch};
use crate::split::{self, StratifyOutcome};

/// Everything produced for one roster entry
#[derive(Debug, Clone)]
pub struct ModelRun {
    pub name: String,
    pub family: ModelFamily,
    pub target: TargetKind,
    pub best_params: HyperParams,
    pub cv_score: f64,
    pub candidates: Vec<CandidateScore>,
    pub pipeline: FittedPipeline,
    /// Predictions on the held-out test rows, in test row order
    pub predictions: Array1<f64>,
    pub test_metrics: RegressionMetrics,
    pub bootstrap_samples: Vec<ScoreSample>,
    pub bootstrap_summary: BootstrapSummary,
}

/// Result of a full experiment
#[derive(Debug, Clone)]
pub struct ExperimentResult {
    pub runs: Vec<ModelRun>,
    pub outcome: StratifyOutcome,
    pub n_train: usize,
    pub n_test: usize,
    /// Held-out rows, kept for prediction tables
    pub test: Dataset,
}

/// Run the configured experiment on a validated dataset.
pub fn run_experiment(dataset: &Dataset, config: &ExperimentConfig) -> Result<ExperimentResult> {
    config.validate()?;

    let parts = split::split(dataset, config.test_fraction, config.seed, config.max_bins)?;
    info!(
        n_samples = dataset.len(),
        n_train = parts.train.len(),
        n_test = parts.test.len(),
        stratified_bins = ?parts.outcome.bins(),
        "dataset partitioned"
    );

    let x_train = parts.train.feature_matrix()?;
    let x_test = parts.test.feature_matrix()?;

    let mut runs = Vec::with_capacity(config.roster.len());
    for spec in &config.roster {
        let span = info_span!("model", name = %spec.name, target = %spec.target);
        let _guard = span.enter();

        let y_train = parts.train.target(spec.target)?;
        let y_test = parts.test.target(spec.target)?;

        let search = GridSearch::new(spec.grid.clone())
            .with_cv_folds(config.cv_folds)
            .with_seed(config.seed);
        let outcome = search.run(&x_train, &y_train)?;

        let predictions = outcome.pipeline.predict(&x_test)?;
        let test_metrics = RegressionMetrics::compute(&y_test, &predictions);
        info!(
            cv_score = outcome.best_score,
            test_r2 = test_metrics.r2,
            test_mae = test_metrics.mae,
            "held-out evaluation"
        );

        let bootstrap_samples = bootstrap_scores(
            &outcome.pipeline,
            &x_test,
            &y_test,
            config.n_resamples,
            config.seed,
        )?;
        let bootstrap_summary = summarize(&bootstrap_samples, config.alpha)?;
        info!(
            r2_lower = bootstrap_summary.r2.lower,
            r2_upper = bootstrap_summary.r2.upper,
            mae_lower = bootstrap_summary.mae.lower,
            mae_upper = bootstrap_summary.mae.upper,
            "bootstrap interval"
        );

        runs.push(ModelRun {
            name: spec.name.clone(),
            family: spec.grid.family(),
            target: spec.target,
            best_params: outcome.best_params,
            cv_score: outcome.best_score,
            candidates: outcome.candidates,
            pipeline: outcome.pipeline,
            predictions,
            test_metrics,
            bootstrap_samples,
            bootstrap_summary,
        });
    }

    Ok(ExperimentResult {
        runs,
        outcome: parts.outcome,
        n_train: parts.train.len(),
        n_test: parts.test.len(),
        test: parts.test,
    })
}
