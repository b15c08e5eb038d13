//! Integration tests for loading, validation, partitioning and screening

use std::io::Write;

use polars::prelude::*;

use mofcap::data::loader::{read_csv, read_dat};
use mofcap::data::{Dataset, FEATURE_COLUMNS, ID_COLUMN, TARGET_COLUMNS};
use mofcap::screening::{apply_tier, default_tiers};
use mofcap::split::{split, StratifyOutcome};

const PREAMBLE: &str = "# usable capacities of reference sorbents\n\
                        # units: wt%, g/cm3, angstrom, m2/g, cm3/g\n\
                        # source: simulated isotherm dataset\n\
                        # name ugc uvc density porosity Ri SSA SPV\n";

fn write_dat_file(n_rows: usize, with_bad_rows: bool) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{PREAMBLE}").unwrap();
    for i in 0..n_rows {
        let gc = 2.0 + 0.1 * i as f64;
        let vc = 0.010 + 0.001 * i as f64;
        let density = 0.4 + 0.01 * i as f64;
        let porosity = 0.3 + 0.005 * (i % 9) as f64;
        let ri = 5.0 + 0.1 * i as f64;
        let ssa = 3000.0 + 25.0 * i as f64;
        let spv = 0.8 + 0.01 * i as f64;
        writeln!(
            file,
            "mof-{i}  {gc:.3}  {vc:.4}  {density:.3}  {porosity:.3}  {ri:.2}  {ssa:.1}  {spv:.3}"
        )
        .unwrap();
    }
    if with_bad_rows {
        writeln!(file, "broken-row  not_a_number  0.02  0.5  0.4  6.0  4000  1.0").unwrap();
        writeln!(file, "short-row  3.1  0.02").unwrap();
    }
    file.flush().unwrap();
    file
}

#[test]
fn test_dat_file_loads_with_schema() {
    let file = write_dat_file(10, false);
    let table = read_dat(file.path()).unwrap();
    assert_eq!(table.frame.height(), 10);
    assert_eq!(table.dropped_rows, 0);

    let mut expected = vec![ID_COLUMN];
    expected.extend(TARGET_COLUMNS);
    expected.extend(FEATURE_COLUMNS);
    assert_eq!(table.frame.get_column_names_str(), expected);
}

#[test]
fn test_bad_rows_are_dropped_and_counted() {
    let file = write_dat_file(8, true);
    let table = read_dat(file.path()).unwrap();
    assert_eq!(table.frame.height(), 8);
    assert_eq!(table.dropped_rows, 2);

    let dataset = Dataset::from_dataframe(table.frame).unwrap();
    assert_eq!(dataset.len(), 8);
}

#[test]
fn test_loaded_dataset_partitions_70_30() {
    let file = write_dat_file(50, false);
    let table = read_dat(file.path()).unwrap();
    let dataset = Dataset::from_dataframe(table.frame).unwrap();

    let parts = split(&dataset, 0.3, 42, 5).unwrap();
    assert_eq!(parts.train.len(), 35);
    assert_eq!(parts.test.len(), 15);

    // no structure appears on both sides
    let train_ids = parts.train.ids().unwrap();
    let test_ids = parts.test.ids().unwrap();
    for id in &test_ids {
        assert!(!train_ids.contains(id), "{id} leaked into both partitions");
    }
}

#[test]
fn test_partition_reproducible_from_file() {
    let file = write_dat_file(40, false);
    let table = read_dat(file.path()).unwrap();
    let dataset = Dataset::from_dataframe(table.frame).unwrap();

    let a = split(&dataset, 0.3, 42, 5).unwrap();
    let b = split(&dataset, 0.3, 42, 5).unwrap();
    assert_eq!(a.test.ids().unwrap(), b.test.ids().unwrap());
    assert_eq!(a.outcome, b.outcome);
}

#[test]
fn test_tiny_file_falls_back_without_error() {
    let file = write_dat_file(3, false);
    let table = read_dat(file.path()).unwrap();
    let dataset = Dataset::from_dataframe(table.frame).unwrap();

    let parts = split(&dataset, 0.3, 42, 5).unwrap();
    assert_eq!(parts.outcome, StratifyOutcome::Unstratified);
    assert_eq!(parts.train.len() + parts.test.len(), 3);
}

#[test]
fn test_screening_candidate_csv() {
    let mut file = tempfile::NamedTempFile::with_suffix(".csv").unwrap();
    writeln!(file, "name,usablegc,usablevc,density,porosity,Ri,SSA,SPV").unwrap();
    writeln!(file, "cand-1,6.1,0.045,0.8,0.6,7.0,4500,1.3").unwrap();
    writeln!(file, "cand-2,6.0,0.025,0.9,0.5,8.0,4800,1.4").unwrap();
    writeln!(file, "cand-3,0.4,0.050,0.7,0.7,6.0,4100,1.2").unwrap();
    file.flush().unwrap();

    let df = read_csv(file.path()).unwrap();
    assert_eq!(df.height(), 3);

    let tiers = default_tiers();
    let strict = apply_tier(&df, &tiers[0]).unwrap();
    assert_eq!(strict.height(), 1);

    let balanced = apply_tier(&df, &tiers[1]).unwrap();
    assert_eq!(balanced.height(), 2);

    // broad still requires the gravimetric floor of 0.5
    let broad = apply_tier(&df, &tiers[2]).unwrap();
    assert_eq!(broad.height(), 2);
}

#[test]
fn test_dataframe_validation_catches_missing_descriptor() {
    let df = df!(
        ID_COLUMN => ["a", "b"],
        "usablegc" => [5.0, 6.0],
        "usablevc" => [0.03, 0.04],
        "density" => [0.6, 0.7],
        "porosity" => [0.7, 0.6],
        "Ri" => [7.0, 8.0],
        "SSA" => [4000.0, 4500.0],
        // SPV missing
    )
    .unwrap();
    assert!(Dataset::from_dataframe(df).is_err());
}
