//! mofcap - Capacity regression experiments for porous sorbents
//!
//! This crate runs the full modeling study for usable hydrogen storage
//! capacities of metal-organic frameworks:
//! - Stratified train/test partitioning with adaptive quantile binning
//! - Leakage-free polynomial + min-max feature transform
//! - Cross-validated grid search over ridge, lasso and random forest
//! - Percentile bootstrap confidence intervals on held-out scores
//! - Candidate screening by descriptor windows
//!
//! # Modules
//!
//! ## Pipeline stages
//! - [`data`] - Dataset schema, `.dat`/CSV readers, validation
//! - [`split`] - Adaptive stratified train/test partitioning
//! - [`features`] - Polynomial expansion and min-max scaling
//! - [`models`] - Ridge, lasso and random forest regressors with grids
//! - [`search`] - Cross-validated hyperparameter search
//! - [`pipeline`] - Fitted transform + estimator bundle
//! - [`bootstrap`] - Percentile bootstrap over held-out predictions
//!
//! ## Orchestration
//! - [`experiment`] - End-to-end experiment driver
//! - [`report`] - Result tables and artifact writers
//! - [`screening`] - Candidate screening tiers
//!
//! ## Support
//! - [`config`] - Experiment configuration
//! - [`metrics`] - Regression metrics and empirical quantiles
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Pipeline stages
pub mod bootstrap;
pub mod data;
pub mod features;
pub mod models;
pub mod pipeline;
pub mod search;
pub mod split;

// Orchestration
pub mod experiment;
pub mod report;
pub mod screening;

// Support
pub mod cli;
pub mod config;
pub mod metrics;

pub use error::{MofcapError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{MofcapError, Result};

    // Data
    pub use crate::data::{Dataset, TargetKind, FEATURE_COLUMNS, ID_COLUMN, TARGET_COLUMNS};

    // Configuration
    pub use crate::config::{default_roster, ExperimentConfig, ModelSpec};

    // Partitioning
    pub use crate::split::{split, StratifyOutcome, TrainTestSplit};

    // Features and models
    pub use crate::features::FeatureTransform;
    pub use crate::models::{
        Estimator, ForestGrid, HyperParams, LassoGrid, ModelFamily, RidgeGrid, SearchGrid,
    };

    // Search and evaluation
    pub use crate::bootstrap::{bootstrap_scores, summarize, BootstrapSummary, ScoreSample};
    pub use crate::pipeline::FittedPipeline;
    pub use crate::search::{GridSearch, SearchOutcome};

    // Orchestration
    pub use crate::experiment::{run_experiment, ExperimentResult, ModelRun};
    pub use crate::report::ArtifactWriter;
}
