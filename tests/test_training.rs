//! Integration test: search, refit and uncertainty end-to-end

use ndarray::{Array1, Array2, Axis};

use mofcap::bootstrap::{bootstrap_scores, summarize};
use mofcap::features::FeatureTransform;
use mofcap::metrics::r2_score;
use mofcap::models::{ForestGrid, LassoGrid, ModelFamily, RidgeGrid, SearchGrid};
use mofcap::pipeline::FittedPipeline;
use mofcap::search::GridSearch;

/// Five smooth descriptor columns with a noiseless linear-plus-interaction
/// response, so every model family has something learnable.
fn descriptor_data(n: usize) -> (Array2<f64>, Array1<f64>) {
    let x = Array2::from_shape_fn((n, 5), |(i, j)| {
        let t = i as f64 / n as f64;
        match j {
            0 => 0.3 + 0.5 * t,
            1 => 0.3 + 0.4 * (((i * 3) % n) as f64 / n as f64),
            2 => 5.0 + 5.0 * (((i * 7) % n) as f64 / n as f64),
            3 => 3500.0 + 2000.0 * (((i * 11) % n) as f64 / n as f64),
            _ => 0.9 + 0.8 * (((i * 13) % n) as f64 / n as f64),
        }
    });
    let y = Array1::from_shape_fn(n, |i| {
        let density = x[[i, 0]];
        let porosity = x[[i, 1]];
        let ri = x[[i, 2]];
        let ssa = x[[i, 3]];
        let spv = x[[i, 4]];
        1.2 + 4.0 * density + 2.5 * porosity + 0.08 * ri + 0.0008 * ssa + 1.5 * spv
            + 0.6 * density * porosity
    });
    (x, y)
}

/// Every third row held out, the rest used for training.
fn stride_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
) -> (Array2<f64>, Array1<f64>, Array2<f64>, Array1<f64>) {
    let train: Vec<usize> = (0..x.nrows()).filter(|i| i % 3 != 0).collect();
    let test: Vec<usize> = (0..x.nrows()).filter(|i| i % 3 == 0).collect();
    (
        x.select(Axis(0), &train),
        y.select(Axis(0), &train),
        x.select(Axis(0), &test),
        y.select(Axis(0), &test),
    )
}

#[test]
fn test_transform_statistics_come_from_training_rows_only() {
    let (x, _) = descriptor_data(30);
    let mut transform = FeatureTransform::new();
    let scaled = transform.fit_transform(&x).unwrap();
    assert_eq!(scaled.ncols(), 20);
    for &v in scaled.iter() {
        assert!((-1e-12..=1.0 + 1e-12).contains(&v));
    }

    // a row beyond the fitted range must escape the unit interval
    let mut outside = x.row(0).to_owned().insert_axis(Axis(0));
    outside[[0, 0]] = 2.0;
    let mapped = transform.transform(&outside).unwrap();
    assert!(mapped.iter().any(|&v| v > 1.0));
}

#[test]
fn test_ridge_search_scores_every_candidate_and_generalizes() {
    let (x, y) = descriptor_data(60);
    let (x_train, y_train, x_test, y_test) = stride_split(&x, &y);

    let search = GridSearch::new(SearchGrid::Ridge(RidgeGrid::default()))
        .with_cv_folds(5)
        .with_seed(42);
    let outcome = search.run(&x_train, &y_train).unwrap();

    assert_eq!(outcome.candidates.len(), 4);
    for candidate in &outcome.candidates {
        assert!(!candidate.failed);
        assert_eq!(candidate.fold_scores.len(), 5);
        assert!(candidate.mean_score.is_finite());
    }
    assert_eq!(outcome.pipeline.family(), ModelFamily::Ridge);

    let predictions = outcome.pipeline.predict(&x_test).unwrap();
    let r2 = r2_score(&y_test, &predictions);
    assert!(r2 > 0.9, "held-out R² = {r2}");
}

#[test]
fn test_lasso_search_fits_expanded_descriptors() {
    let (x, y) = descriptor_data(60);
    let (x_train, y_train, x_test, y_test) = stride_split(&x, &y);

    let outcome = GridSearch::new(SearchGrid::Lasso(LassoGrid::default()))
        .run(&x_train, &y_train)
        .unwrap();

    let coefficients = outcome.pipeline.estimator.coefficients().unwrap();
    assert_eq!(coefficients.len(), 20);

    let predictions = outcome.pipeline.predict(&x_test).unwrap();
    let r2 = r2_score(&y_test, &predictions);
    assert!(r2 > 0.7, "held-out R² = {r2}");
}

#[test]
fn test_forest_search_reproducible_across_runs() {
    let (x, y) = descriptor_data(45);
    let grid = SearchGrid::Forest(ForestGrid {
        n_estimators: vec![15],
        max_depths: vec![Some(5), None],
        min_samples_leaf: vec![1],
    });

    let a = GridSearch::new(grid.clone()).with_seed(42).run(&x, &y).unwrap();
    let b = GridSearch::new(grid).with_seed(42).run(&x, &y).unwrap();

    assert_eq!(a.best_params, b.best_params);
    for (ca, cb) in a.candidates.iter().zip(b.candidates.iter()) {
        assert_eq!(ca.fold_scores, cb.fold_scores);
    }
    assert_eq!(a.pipeline.predict(&x).unwrap(), b.pipeline.predict(&x).unwrap());
}

#[test]
fn test_forest_winner_carries_importances() {
    let (x, y) = descriptor_data(42);
    let grid = SearchGrid::Forest(ForestGrid {
        n_estimators: vec![12],
        max_depths: vec![Some(6)],
        min_samples_leaf: vec![1],
    });
    let outcome = GridSearch::new(grid).run(&x, &y).unwrap();

    let importances = outcome.pipeline.estimator.feature_importances().unwrap();
    assert_eq!(importances.len(), 20);
    let total: f64 = importances.sum();
    assert!((total - 1.0).abs() < 1e-9, "importances sum to {total}");
    assert!(outcome.pipeline.estimator.coefficients().is_none());
}

#[test]
fn test_bootstrap_summary_of_searched_model() {
    let (x, y) = descriptor_data(45);
    let (x_train, y_train, x_test, y_test) = stride_split(&x, &y);
    assert_eq!(y_test.len(), 15);

    let outcome = GridSearch::new(SearchGrid::Ridge(RidgeGrid::default()))
        .run(&x_train, &y_train)
        .unwrap();

    let samples = bootstrap_scores(&outcome.pipeline, &x_test, &y_test, 200, 42).unwrap();
    assert_eq!(samples.len(), 200);

    let again = bootstrap_scores(&outcome.pipeline, &x_test, &y_test, 200, 42).unwrap();
    for (s, t) in samples.iter().zip(again.iter()) {
        assert_eq!(s.r2.to_bits(), t.r2.to_bits());
        assert_eq!(s.mae.to_bits(), t.mae.to_bits());
    }

    let summary = summarize(&samples, 0.05).unwrap();
    assert!(summary.r2.lower <= summary.r2.upper);
    assert!(summary.mae.lower <= summary.mae.upper);
    assert!(summary.mae.lower >= 0.0);
    assert_eq!(summary.n_resamples, 200);
    assert_eq!(summary.degenerate, 0);

    // interpolated quantiles stay inside the observed spread
    let r2_min = samples.iter().map(|s| s.r2).fold(f64::INFINITY, f64::min);
    let r2_max = samples.iter().map(|s| s.r2).fold(f64::NEG_INFINITY, f64::max);
    assert!(summary.r2.lower >= r2_min && summary.r2.upper <= r2_max);
    let mae_max = samples.iter().map(|s| s.mae).fold(f64::NEG_INFINITY, f64::max);
    assert!(summary.mae.upper <= mae_max);
}

#[test]
fn test_searched_pipeline_survives_save_and_load() {
    let (x, y) = descriptor_data(36);
    let grid = SearchGrid::Forest(ForestGrid {
        n_estimators: vec![8],
        max_depths: vec![Some(4)],
        min_samples_leaf: vec![2],
    });
    let outcome = GridSearch::new(grid).run(&x, &y).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rf_model.json");
    outcome.pipeline.save(&path).unwrap();

    let restored = FittedPipeline::load(&path).unwrap();
    assert_eq!(restored.family(), ModelFamily::RandomForest);
    assert_eq!(
        outcome.pipeline.predict(&x).unwrap(),
        restored.predict(&x).unwrap()
    );
}
