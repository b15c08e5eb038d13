//! Adaptive stratified train/test partitioning
//!
//! Rows are grouped by a composite label built from quantile bins of both
//! capacity targets. When the requested bin count leaves some label with a
//! single member, the bin count steps down until every label has at least
//! two; if even two bins cannot satisfy that, the split falls back to an
//! unstratified seeded draw. The partition itself never fails on small or
//! skewed data.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data::{Dataset, TargetKind};
use crate::error::Result;
use crate::metrics::quantile;

/// How the accepted row grouping was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StratifyOutcome {
    /// Joint quantile binning succeeded at this bin count
    Stratified { bins: usize },
    /// No bin count down to 2 gave every label two members
    Unstratified,
}

impl StratifyOutcome {
    pub fn bins(&self) -> Option<usize> {
        match self {
            StratifyOutcome::Stratified { bins } => Some(*bins),
            StratifyOutcome::Unstratified => None,
        }
    }
}

/// A seeded train/test partition of a dataset
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: Dataset,
    pub test: Dataset,
    pub outcome: StratifyOutcome,
}

/// Partition `dataset` into train and test rows.
///
/// The draw is fully determined by `(test_fraction, seed, max_bins)` and
/// the row order of the dataset. Stratification shortfalls degrade the
/// grouping, never the call: the only error paths are dataset access
/// failures.
pub fn split(
    dataset: &Dataset,
    test_fraction: f64,
    seed: u64,
    max_bins: usize,
) -> Result<TrainTestSplit> {
    let n = dataset.len();
    let gc = dataset.target(TargetKind::Gravimetric)?;
    let vc = dataset.target(TargetKind::Volumetric)?;
    let gc: Vec<f64> = gc.to_vec();
    let vc: Vec<f64> = vc.to_vec();

    let (groups, outcome) = match choose_labels(&gc, &vc, max_bins) {
        Some((labels, bins)) => {
            let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
            for (i, label) in labels.into_iter().enumerate() {
                groups.entry(label).or_default().push(i);
            }
            (groups, StratifyOutcome::Stratified { bins })
        }
        None => {
            let mut groups = BTreeMap::new();
            groups.insert("all".to_string(), (0..n).collect());
            (groups, StratifyOutcome::Unstratified)
        }
    };

    match outcome {
        StratifyOutcome::Stratified { bins } => {
            debug!(bins, groups = groups.len(), "stratified grouping accepted")
        }
        StratifyOutcome::Unstratified => {
            info!("stratification not viable, falling back to unstratified draw")
        }
    }

    let test_indices = draw_test_indices(&groups, test_fraction, n, seed);
    let in_test = {
        let mut flags = vec![false; n];
        for &i in &test_indices {
            flags[i] = true;
        }
        flags
    };
    let train_indices: Vec<usize> = (0..n).filter(|&i| !in_test[i]).collect();

    Ok(TrainTestSplit {
        train: dataset.take(&train_indices)?,
        test: dataset.take(&test_indices)?,
        outcome,
    })
}

/// Composite labels at the largest viable bin count.
///
/// Walks `max_bins` down to 2 and accepts the first labeling where every
/// composite label has at least two members. `None` when no count works.
fn choose_labels(gc: &[f64], vc: &[f64], max_bins: usize) -> Option<(Vec<String>, usize)> {
    let mut bins = max_bins.min(gc.len()).max(2);
    while bins >= 2 {
        let labels = composite_labels(gc, vc, bins);
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for label in &labels {
            *counts.entry(label.as_str()).or_insert(0) += 1;
        }
        if counts.values().all(|&c| c >= 2) {
            return Some((labels, bins));
        }
        bins -= 1;
    }
    None
}

fn composite_labels(gc: &[f64], vc: &[f64], bins: usize) -> Vec<String> {
    let gc_bins = quantile_bins(gc, bins);
    let vc_bins = quantile_bins(vc, bins);
    gc_bins
        .iter()
        .zip(vc_bins.iter())
        .map(|(g, v)| format!("{g}__{v}"))
        .collect()
}

/// Equal-count bin assignment with right-closed edges.
///
/// Interior boundaries sit at the `i/bins` quantiles; duplicate boundaries
/// collapse, so heavily tied data lands in fewer effective bins.
fn quantile_bins(values: &[f64], bins: usize) -> Vec<usize> {
    let mut edges: Vec<f64> = (1..bins)
        .map(|i| quantile(values, i as f64 / bins as f64))
        .collect();
    edges.dedup();
    values
        .iter()
        .map(|&x| edges.iter().filter(|&&e| x > e).count())
        .collect()
}

/// Seeded per-group draw of test rows.
///
/// The global test size is `round(test_fraction * n)`. Each group
/// contributes `floor(test_fraction * len)` rows; remaining slots go to
/// groups by largest fractional remainder, ties in label order. Groups are
/// shuffled and consumed in label order from a single ChaCha8 stream, so
/// the draw is reproducible across runs and platforms.
fn draw_test_indices(
    groups: &BTreeMap<String, Vec<usize>>,
    test_fraction: f64,
    n: usize,
    seed: u64,
) -> Vec<usize> {
    let total_test = (test_fraction * n as f64).round() as usize;
    let total_test = total_test.min(n);

    let group_sizes: Vec<usize> = groups.values().map(Vec::len).collect();
    let mut take: Vec<usize> = Vec::with_capacity(groups.len());
    let mut remainders: Vec<f64> = Vec::with_capacity(groups.len());
    for &size in &group_sizes {
        let exact = test_fraction * size as f64;
        let base = exact.floor() as usize;
        take.push(base.min(size));
        remainders.push(exact - base as f64);
    }

    let mut extra = total_test.saturating_sub(take.iter().sum());
    let mut order: Vec<usize> = (0..groups.len()).collect();
    order.sort_by(|&a, &b| {
        remainders[b]
            .partial_cmp(&remainders[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    while extra > 0 {
        let mut progressed = false;
        for &g in &order {
            if extra == 0 {
                break;
            }
            if take[g] < group_sizes[g] {
                take[g] += 1;
                extra -= 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut test_indices = Vec::with_capacity(total_test);
    for (g, indices) in groups.values().enumerate() {
        let mut shuffled = indices.clone();
        shuffled.shuffle(&mut rng);
        test_indices.extend(shuffled.into_iter().take(take[g]));
    }
    test_indices.sort_unstable();
    test_indices
}
