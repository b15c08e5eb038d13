//! Integration test: full experiment (load → split → search → artifacts)

use std::io::Write;
use std::path::Path;

use mofcap::config::{default_roster, ExperimentConfig};
use mofcap::data::loader::{read_csv, read_dat};
use mofcap::data::Dataset;
use mofcap::experiment::run_experiment;
use mofcap::models::{ForestGrid, SearchGrid};
use mofcap::pipeline::FittedPipeline;
use mofcap::report::ArtifactWriter;

const PREAMBLE: &str = "# usable capacities of reference sorbents\n\
                        # units: wt%, g/cm3, angstrom, m2/g, cm3/g\n\
                        # source: simulated isotherm dataset\n\
                        # name ugc uvc density porosity Ri SSA SPV\n";

fn write_dat_file(n_rows: usize, with_bad_rows: bool) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{PREAMBLE}").unwrap();
    for i in 0..n_rows {
        let density = 0.4 + 0.02 * (i % 13) as f64;
        let porosity = 0.3 + 0.04 * (i % 11) as f64;
        let ri = 5.0 + 0.3 * (i % 17) as f64;
        let ssa = 3000.0 + 150.0 * (i % 19) as f64;
        let spv = 0.8 + 0.05 * (i % 7) as f64;
        let gc = 2.0 + 4.0 * density + 0.001 * ssa - 1.5 * porosity;
        let vc = 0.01 + 0.02 * spv + 0.002 * ri;
        writeln!(
            file,
            "mof-{i}  {gc:.4}  {vc:.5}  {density:.3}  {porosity:.3}  {ri:.2}  {ssa:.1}  {spv:.3}"
        )
        .unwrap();
    }
    if with_bad_rows {
        writeln!(file, "broken-row  nan_text  0.02  0.5  0.4  6.0  4000  1.0").unwrap();
        writeln!(file, "short-row  3.1").unwrap();
    }
    file.flush().unwrap();
    file
}

fn fast_config() -> ExperimentConfig {
    let mut roster = default_roster();
    roster[2].grid = SearchGrid::Forest(ForestGrid {
        n_estimators: vec![10],
        max_depths: vec![Some(4)],
        min_samples_leaf: vec![1],
    });
    ExperimentConfig::default()
        .with_n_resamples(50)
        .with_roster(roster)
}

fn run_into(dir: &Path) -> (usize, usize) {
    let file = write_dat_file(60, true);
    let table = read_dat(file.path()).unwrap();
    let dropped = table.dropped_rows;
    let dataset = Dataset::from_dataframe(table.frame).unwrap();

    let config = fast_config();
    let result = run_experiment(&dataset, &config).unwrap();
    let writer = ArtifactWriter::new(dir).unwrap();
    writer.write_all(&result, &config, dropped).unwrap();
    (result.n_test, dropped)
}

#[test]
fn test_artifact_set_is_complete_and_well_formed() {
    let out = tempfile::tempdir().unwrap();
    let (n_test, _) = run_into(out.path());
    assert_eq!(n_test, 18);

    for name in [
        "test_predictions.csv",
        "metrics.json",
        "ridge_coefficients.csv",
        "lasso_coefficients.csv",
        "rf_feature_importances.csv",
        "bootstrap_ridge.csv",
        "bootstrap_lasso.csv",
        "bootstrap_rf.csv",
        "bootstrap_intervals.json",
        "diagnostic_metrics.csv",
        "run_summary.json",
    ] {
        assert!(out.path().join(name).exists(), "{name} missing");
    }

    let predictions = read_csv(&out.path().join("test_predictions.csv")).unwrap();
    assert_eq!(predictions.height(), n_test);
    assert_eq!(
        predictions.get_column_names_str(),
        vec![
            "name",
            "true_ugc",
            "pred_ugc_ridge",
            "pred_ugc_rf",
            "true_uvc",
            "pred_uvc_lasso",
        ]
    );

    let diagnostics = read_csv(&out.path().join("diagnostic_metrics.csv")).unwrap();
    assert_eq!(diagnostics.height(), 3);
    assert_eq!(
        diagnostics.get_column_names_str(),
        vec!["model", "target", "r2", "mae"]
    );

    let scores = read_csv(&out.path().join("bootstrap_rf.csv")).unwrap();
    assert_eq!(scores.height(), 50);
    assert_eq!(scores.get_column_names_str(), vec!["r2", "mae"]);

    // names paired with the 20 expanded terms
    let coefficients = read_csv(&out.path().join("ridge_coefficients.csv")).unwrap();
    assert_eq!(coefficients.height(), 20);
    let importances = read_csv(&out.path().join("rf_feature_importances.csv")).unwrap();
    assert_eq!(importances.height(), 20);
}

#[test]
fn test_metrics_json_keyed_by_model_name() {
    let out = tempfile::tempdir().unwrap();
    run_into(out.path());

    let raw = std::fs::read_to_string(out.path().join("metrics.json")).unwrap();
    let metrics: serde_json::Value = serde_json::from_str(&raw).unwrap();

    for model in ["ridge", "lasso", "rf"] {
        let entry = &metrics[model];
        assert!(entry.is_object(), "{model} entry missing");
        for key in ["target", "r2", "mae", "rmse", "cv_score", "best_params"] {
            assert!(!entry[key].is_null(), "{model}.{key} missing");
        }
    }
    assert_eq!(metrics["ridge"]["target"], "usablegc");
    assert_eq!(metrics["lasso"]["target"], "usablevc");

    let raw = std::fs::read_to_string(out.path().join("bootstrap_intervals.json")).unwrap();
    let intervals: serde_json::Value = serde_json::from_str(&raw).unwrap();
    for model in ["ridge", "lasso", "rf"] {
        let r2 = &intervals[model]["r2"];
        assert!(r2["lower"].as_f64().unwrap() <= r2["upper"].as_f64().unwrap());
        assert_eq!(intervals[model]["n_resamples"], 50);
    }
}

#[test]
fn test_run_summary_reports_partition_and_dropped_rows() {
    let out = tempfile::tempdir().unwrap();
    let (_, dropped) = run_into(out.path());
    assert_eq!(dropped, 2);

    let raw = std::fs::read_to_string(out.path().join("run_summary.json")).unwrap();
    let summary: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(summary["n_samples"], 60);
    assert_eq!(summary["n_train"], 42);
    assert_eq!(summary["n_test"], 18);
    assert_eq!(summary["dropped_rows"], 2);
    assert!(summary["stratified_bins"].as_u64().is_some());
    assert_eq!(summary["config"]["seed"], 42);
    assert!(summary["timestamp"].is_string());
}

#[test]
fn test_artifacts_reproducible_across_runs() {
    let out_a = tempfile::tempdir().unwrap();
    let out_b = tempfile::tempdir().unwrap();
    run_into(out_a.path());
    run_into(out_b.path());

    // everything except run_summary.json carries no timestamp
    for name in [
        "test_predictions.csv",
        "metrics.json",
        "bootstrap_ridge.csv",
        "bootstrap_lasso.csv",
        "bootstrap_rf.csv",
        "bootstrap_intervals.json",
        "diagnostic_metrics.csv",
    ] {
        let a = std::fs::read(out_a.path().join(name)).unwrap();
        let b = std::fs::read(out_b.path().join(name)).unwrap();
        assert_eq!(a, b, "{name} differs between identical runs");
    }
}

#[test]
fn test_persisted_model_predicts_like_the_run() {
    let file = write_dat_file(60, false);
    let table = read_dat(file.path()).unwrap();
    let dataset = Dataset::from_dataframe(table.frame).unwrap();
    let config = fast_config();
    let result = run_experiment(&dataset, &config).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ridge_model.json");
    result.runs[0].pipeline.save(&path).unwrap();

    let restored = FittedPipeline::load(&path).unwrap();
    let x_test = result.test.feature_matrix().unwrap();
    assert_eq!(restored.predict(&x_test).unwrap(), result.runs[0].predictions);
}
