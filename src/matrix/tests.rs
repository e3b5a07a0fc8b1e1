use crate::matrix::*;
use crate::{Error, ErrorKind, Table};

use color_eyre::eyre::{Report, Result};
use std::collections::BTreeSet;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// omic1 = {A, B}, omic2 = {X, Y}
fn toy_matrix() -> ScoreMatrix {
    ScoreMatrix {
        omic1: strings(&["A", "B"]),
        omic2: strings(&["X", "Y"]),
        scores: vec![vec![Some(0.9), Some(0.1)], vec![Some(0.3), Some(0.7)]],
    }
}

fn triples(matrix: &ScoreMatrix, floor: f64) -> Result<Vec<(String, String, f64)>, Report> {
    let long_form = reshape(matrix, None, None, floor, "omic1", "omic2")?;
    Ok(long_form.pairs.into_iter().map(|p| (p.omic1, p.omic2, p.conditional)).collect())
}

#[test]
fn from_table_missing_cells() -> Result<(), Report> {
    let mut table = Table::new();
    table.headers = strings(&["featureid", "1", "2", "3"]);
    table.add_row(strings(&["10", "0.5", "NA", "nan"]))?;
    table.add_row(strings(&["20", "", "1e-2", "0"]))?;

    let matrix = ScoreMatrix::from_table(&table)?;
    assert_eq!(matrix.omic1, ["1", "2", "3"]);
    assert_eq!(matrix.omic2, ["10", "20"]);
    assert_eq!(matrix.scores, [[Some(0.5), None, None], [None, Some(0.01), Some(0.0)]]);
    Ok(())
}

#[test]
fn from_table_invalid_score() -> Result<(), Report> {
    let mut table = Table::new();
    table.headers = strings(&["featureid", "A"]);
    table.add_row(strings(&["X", "high"]))?;
    assert!(ScoreMatrix::from_table(&table).is_err());
    Ok(())
}

#[test]
fn from_table_duplicate_ids() -> Result<(), Report> {
    let mut table = Table::new();
    table.headers = strings(&["featureid", "A", "A"]);
    table.add_row(strings(&["X", "0.1", "0.2"]))?;
    assert!(ScoreMatrix::from_table(&table).is_err());
    Ok(())
}

#[test]
fn reshape_floor_keeps_partial_rows() -> Result<(), Report> {
    let observed = triples(&toy_matrix(), 0.2)?;
    let expected = vec![
        ("A".to_string(), "X".to_string(), 0.9),
        ("A".to_string(), "Y".to_string(), 0.3),
        ("B".to_string(), "Y".to_string(), 0.7),
    ];
    assert_eq!(observed, expected);
    Ok(())
}

#[test]
fn reshape_prunes_empty_axes() -> Result<(), Report> {
    let observed = triples(&toy_matrix(), 0.8)?;
    assert_eq!(observed, [("A".to_string(), "X".to_string(), 0.9)]);
    Ok(())
}

#[test]
fn reshape_floor_is_inclusive() -> Result<(), Report> {
    assert_eq!(triples(&toy_matrix(), 0.7)?.len(), 2);
    Ok(())
}

#[test]
fn reshape_empty_result() {
    let report = reshape(&toy_matrix(), None, None, 0.95, "omic1", "omic2").unwrap_err();
    assert_eq!(Error::kind_of(&report), Some(ErrorKind::EmptyResult));
}

#[test]
fn reshape_restricts_before_floor() -> Result<(), Report> {
    let ids: BTreeSet<String> = strings(&["B"]).into_iter().collect();
    let long_form = reshape(&toy_matrix(), Some(&ids), None, 0.2, "omic1", "omic2")?;
    let observed: Vec<_> = long_form.pairs.iter().map(|p| (p.omic1.as_str(), p.omic2.as_str())).collect();
    // row X only has B = 0.1 left after restriction, so it is pruned by the floor
    assert_eq!(observed, [("B", "Y")]);
    Ok(())
}

#[test]
fn reshape_empty_filter_set() {
    let ids = BTreeSet::new();
    let report = reshape(&toy_matrix(), None, Some(&ids), 0.0, "omic1", "omic2").unwrap_err();
    assert_eq!(Error::kind_of(&report), Some(ErrorKind::EmptyResult));
}

#[test]
fn subset_by_patterns_both_axes() -> Result<(), Report> {
    let matrix = toy_matrix();
    let omic1 = matrix.subset_by_patterns(Axis::Omic1, &strings(&["b"]))?;
    assert_eq!(omic1.omic1, ["B"]);
    assert_eq!(omic1.scores, [[Some(0.1)], [Some(0.7)]]);

    let omic2 = matrix.subset_by_patterns(Axis::Omic2, &strings(&["y", "z"]))?;
    assert_eq!(omic2.omic2, ["Y"]);
    assert_eq!(omic2.scores, [[Some(0.3), Some(0.7)]]);

    assert_eq!(matrix.subset_by_patterns(Axis::Omic2, &[])?, matrix);
    Ok(())
}

#[test]
fn unstack_numeric_identifiers_as_strings() {
    let matrix = ScoreMatrix {
        omic1: strings(&["10", "9"]),
        omic2: strings(&["1"]),
        scores: vec![vec![Some(0.2), Some(0.4)]],
    };
    let long_form = matrix.unstack("genes", "metabolites");
    assert_eq!(long_form.omic1, "genes");
    let ids: Vec<_> = long_form.pairs.iter().map(|p| p.omic1.as_str()).collect();
    assert_eq!(ids, ["10", "9"]);
}
