//! Command-line interface

use std::fs::File;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use polars::prelude::*;
use tracing::info;

use crate::config::ExperimentConfig;
use crate::data::loader::{read_csv, read_dat_with_skip, METADATA_ROWS};
use crate::data::{Dataset, FEATURE_COLUMNS, TARGET_COLUMNS};
use crate::error::Result;
use crate::experiment::run_experiment;
use crate::report::ArtifactWriter;
use crate::screening::{apply_tier, default_tiers, ScreenTier};

#[derive(Parser)]
#[command(
    name = "mofcap",
    version,
    about = "Capacity regression experiments for porous sorbents"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full experiment: split, search, evaluate, bootstrap
    Run {
        /// Whitespace-delimited capacity table (.dat)
        #[arg(short, long)]
        data: PathBuf,

        /// Output directory for artifacts
        #[arg(short, long, default_value = "results")]
        out: PathBuf,

        /// JSON file with a full experiment configuration, roster and grids included
        #[arg(long)]
        config: Option<PathBuf>,

        /// Fraction of rows held out for testing
        #[arg(long)]
        test_fraction: Option<f64>,

        /// Seed for the split, forest and bootstrap draws
        #[arg(long)]
        seed: Option<u64>,

        /// Starting bin count for joint stratification
        #[arg(long)]
        max_bins: Option<usize>,

        /// Cross-validation folds in the grid search
        #[arg(long)]
        cv_folds: Option<usize>,

        /// Bootstrap replicates per model
        #[arg(long)]
        n_resamples: Option<usize>,

        /// Interval miss probability (0.05 gives a 95% interval)
        #[arg(long)]
        alpha: Option<f64>,

        /// Metadata lines to skip before the data block
        #[arg(long)]
        skip_rows: Option<usize>,

        /// Also save each fitted pipeline as <model>_model.json
        #[arg(long)]
        save_models: bool,
    },

    /// Filter a candidate table through the screening tiers
    Screen {
        /// Candidate table (.csv, or .dat with the standard preamble)
        #[arg(short, long)]
        data: PathBuf,

        /// Output directory for filtered tables
        #[arg(short, long, default_value = "screening")]
        out: PathBuf,

        /// JSON file overriding the default tiers
        #[arg(long)]
        criteria: Option<PathBuf>,
    },

    /// Print dataset shape and per-column ranges
    Inspect {
        /// Whitespace-delimited capacity table (.dat)
        #[arg(short, long)]
        data: PathBuf,

        /// Metadata lines to skip before the data block
        #[arg(long)]
        skip_rows: Option<usize>,
    },
}

pub fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            data,
            out,
            config,
            test_fraction,
            seed,
            max_bins,
            cv_folds,
            n_resamples,
            alpha,
            skip_rows,
            save_models,
        } => cmd_run(RunArgs {
            data,
            out,
            config,
            test_fraction,
            seed,
            max_bins,
            cv_folds,
            n_resamples,
            alpha,
            skip_rows,
            save_models,
        }),
        Commands::Screen {
            data,
            out,
            criteria,
        } => cmd_screen(&data, &out, criteria.as_deref()),
        Commands::Inspect { data, skip_rows } => cmd_inspect(&data, skip_rows),
    }
}

pub struct RunArgs {
    pub data: PathBuf,
    pub out: PathBuf,
    pub config: Option<PathBuf>,
    pub test_fraction: Option<f64>,
    pub seed: Option<u64>,
    pub max_bins: Option<usize>,
    pub cv_folds: Option<usize>,
    pub n_resamples: Option<usize>,
    pub alpha: Option<f64>,
    pub skip_rows: Option<usize>,
    pub save_models: bool,
}

pub fn cmd_run(args: RunArgs) -> Result<()> {
    let table = read_dat_with_skip(&args.data, args.skip_rows.unwrap_or(METADATA_ROWS))?;
    let dataset = Dataset::from_dataframe(table.frame)?;
    info!(
        n_samples = dataset.len(),
        dropped = table.dropped_rows,
        path = %args.data.display(),
        "dataset loaded"
    );

    let mut config = match args.config {
        Some(ref path) => {
            let json = std::fs::read_to_string(path)?;
            serde_json::from_str(&json)?
        }
        None => ExperimentConfig::default(),
    };
    if let Some(test_fraction) = args.test_fraction {
        config.test_fraction = test_fraction;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(max_bins) = args.max_bins {
        config.max_bins = max_bins;
    }
    if let Some(cv_folds) = args.cv_folds {
        config.cv_folds = cv_folds;
    }
    if let Some(n_resamples) = args.n_resamples {
        config.n_resamples = n_resamples;
    }
    if let Some(alpha) = args.alpha {
        config.alpha = alpha;
    }

    let result = run_experiment(&dataset, &config)?;

    let writer = ArtifactWriter::new(&args.out)?;
    writer.write_all(&result, &config, table.dropped_rows)?;

    if args.save_models {
        for run in &result.runs {
            let path = args.out.join(format!("{}_model.json", run.name));
            run.pipeline.save(&path)?;
            info!(model = %run.name, path = %path.display(), "pipeline saved");
        }
    }

    for run in &result.runs {
        println!(
            "{:<8} {:<9} R²={:.4}  MAE={:.4}  CI(R²)=[{:.4}, {:.4}]",
            run.name,
            run.target.column(),
            run.test_metrics.r2,
            run.test_metrics.mae,
            run.bootstrap_summary.r2.lower,
            run.bootstrap_summary.r2.upper,
        );
    }
    Ok(())
}

pub fn cmd_screen(
    data: &std::path::Path,
    out: &std::path::Path,
    criteria: Option<&std::path::Path>,
) -> Result<()> {
    let df = if data.extension().is_some_and(|ext| ext == "dat") {
        read_dat_with_skip(data, METADATA_ROWS)?.frame
    } else {
        read_csv(data)?
    };
    info!(rows = df.height(), path = %data.display(), "candidate table loaded");

    let tiers: Vec<ScreenTier> = match criteria {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            serde_json::from_str(&json)?
        }
        None => default_tiers(),
    };

    std::fs::create_dir_all(out)?;
    for tier in &tiers {
        let mut filtered = apply_tier(&df, tier)?;
        let path = out.join(format!("filtered_{}.csv", tier.name));
        let mut file = File::create(&path)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut filtered)?;
        println!("{:<10} {:>6} / {} candidates", tier.name, filtered.height(), df.height());
    }
    Ok(())
}

pub fn cmd_inspect(data: &std::path::Path, skip_rows: Option<usize>) -> Result<()> {
    let table = read_dat_with_skip(data, skip_rows.unwrap_or(METADATA_ROWS))?;
    let dataset = Dataset::from_dataframe(table.frame)?;

    println!("rows: {} (dropped {})", dataset.len(), table.dropped_rows);
    println!("{:<10} {:>12} {:>12} {:>12}", "column", "min", "mean", "max");
    for name in TARGET_COLUMNS.iter().chain(FEATURE_COLUMNS.iter()) {
        let values = crate::data::column_f64(dataset.frame(), name)?;
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.sum() / values.len() as f64;
        println!("{name:<10} {min:>12.4} {mean:>12.4} {max:>12.4}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_defaults() {
        let cli = Cli::parse_from(["mofcap", "run", "--data", "capacities.dat"]);
        match cli.command {
            Commands::Run {
                data,
                out,
                config,
                save_models,
                test_fraction,
                ..
            } => {
                assert_eq!(data, PathBuf::from("capacities.dat"));
                assert_eq!(out, PathBuf::from("results"));
                assert!(config.is_none());
                assert!(!save_models);
                assert!(test_fraction.is_none());
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_screen_with_criteria() {
        let cli = Cli::parse_from([
            "mofcap",
            "screen",
            "--data",
            "candidates.csv",
            "--criteria",
            "tiers.json",
        ]);
        match cli.command {
            Commands::Screen { criteria, .. } => {
                assert_eq!(criteria, Some(PathBuf::from("tiers.json")));
            }
            _ => panic!("expected screen command"),
        }
    }
}
