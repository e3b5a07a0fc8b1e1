use crate::matrix::Axis;
use crate::run::*;
use crate::{Error, ErrorKind, Table};

use color_eyre::eyre::{Report, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// In-memory inputs that record every read.
#[derive(Default)]
struct RecordingSource {
    tables: HashMap<PathBuf, Table<String>>,
    patterns: HashMap<PathBuf, Vec<String>>,
    reads: RefCell<Vec<PathBuf>>,
}

impl InputSource for RecordingSource {
    fn check_path(&self, path: &Path) -> Result<PathBuf, Report> {
        match self.tables.contains_key(path) || self.patterns.contains_key(path) {
            true => Ok(path.to_path_buf()),
            false => Err(Error::InputMissing { path: path.to_path_buf() }.into()),
        }
    }

    fn read_table(&self, path: &Path) -> Result<Table<String>, Report> {
        self.reads.borrow_mut().push(path.to_path_buf());
        let table = self.tables.get(path).cloned();
        table.ok_or_else(|| Error::InputMissing { path: path.to_path_buf() }.into())
    }

    fn read_patterns(&self, path: &Path) -> Result<Vec<String>, Report> {
        self.reads.borrow_mut().push(path.to_path_buf());
        let patterns = self.patterns.get(path).cloned();
        patterns.ok_or_else(|| Error::InputMissing { path: path.to_path_buf() }.into())
    }
}

/// Columns A, B (omic1) and rows X, Y (omic2).
fn toy_matrix() -> Result<Table<String>, Report> {
    let mut table = Table::new();
    table.headers = strings(&["featureid", "A", "B"]);
    table.add_row(strings(&["X", "0.9", "0.1"]))?;
    table.add_row(strings(&["Y", "0.3", "0.7"]))?;
    Ok(table)
}

fn toy_source() -> Result<RecordingSource, Report> {
    let mut source = RecordingSource::default();
    source.tables.insert(PathBuf::from("ranks.tsv"), toy_matrix()?);
    Ok(source)
}

#[test]
fn invalid_output_fails_before_reading() -> Result<(), Report> {
    let source = toy_source()?;
    let args = RunArgs {
        ranks: PathBuf::from("ranks.tsv"),
        output: Some(PathBuf::from("view.txt")),
        ..Default::default()
    };
    let report = run_with(&args, &source).unwrap_err();
    assert_eq!(Error::kind_of(&report), Some(ErrorKind::OutputPathInvalid));
    assert!(source.reads.borrow().is_empty());
    Ok(())
}

#[test]
fn missing_input() -> Result<(), Report> {
    let source = toy_source()?;
    let args = RunArgs {
        ranks: PathBuf::from("ranks.tsv"),
        output: Some(PathBuf::from("view.html")),
        omic2_metadata: Some(PathBuf::from("metabolites.tsv")),
        ..Default::default()
    };
    let report = run_with(&args, &source).unwrap_err();
    assert_eq!(Error::kind_of(&report), Some(ErrorKind::InputMissing));
    assert!(source.reads.borrow().is_empty());
    Ok(())
}

#[test]
fn same_axis_names() -> Result<(), Report> {
    let source = toy_source()?;
    let args = RunArgs {
        ranks: PathBuf::from("ranks.tsv"),
        output: Some(PathBuf::from("view.html")),
        omic1_name: "features".to_string(),
        omic2_name: "features".to_string(),
        ..Default::default()
    };
    assert!(run_with(&args, &source).is_err());
    Ok(())
}

#[test]
fn reserved_axis_names() -> Result<(), Report> {
    let source = toy_source()?;
    for name in ["rank", "conditional", "per_omic2_rank"] {
        let args = RunArgs {
            ranks: PathBuf::from("ranks.tsv"),
            output: Some(PathBuf::from("view.html")),
            omic1_name: name.to_string(),
            ..Default::default()
        };
        let report = run_with(&args, &source).unwrap_err();
        assert!(report.to_string().contains("reserved"));
    }
    assert!(source.reads.borrow().is_empty());
    Ok(())
}

#[test]
fn empty_metadata_path_is_no_metadata() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let source = toy_source()?;
    let args = RunArgs {
        ranks: PathBuf::from("ranks.tsv"),
        output: Some(dir.path().join("view.html")),
        omic1_metadata: Some(PathBuf::new()),
        omic2_subset: Some(PathBuf::new()),
        tree_taxonomy: Some(PathBuf::new()),
        ..Default::default()
    };
    assert_eq!(args.axis(Axis::Omic1).metadata, None);
    assert_eq!(args.axis(Axis::Omic2).subset, None);

    run_with(&args, &source)?;
    assert_eq!(*source.reads.borrow(), [PathBuf::from("ranks.tsv")]);
    Ok(())
}

#[test]
fn failed_table_leaves_no_view() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    // a regular file where the table's directory should be
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "")?;

    let source = toy_source()?;
    let args = RunArgs {
        ranks: PathBuf::from("ranks.tsv"),
        output: Some(dir.path().join("view.html")),
        output_table: Some(blocker.join("pairs.tsv")),
        ..Default::default()
    };
    assert!(run_with(&args, &source).is_err());
    assert!(!dir.path().join("view.html").exists());
    // no staged files are left behind either
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);
    Ok(())
}

#[test]
fn filter_too_strict() -> Result<(), Report> {
    let mut source = toy_source()?;
    let mut metadata = Table::new();
    metadata.headers = strings(&["id", "length"]);
    metadata.add_row(strings(&["A", "3"]))?;
    metadata.add_row(strings(&["B", "5"]))?;
    source.tables.insert(PathBuf::from("genes.tsv"), metadata);

    let args = RunArgs {
        ranks: PathBuf::from("ranks.tsv"),
        output: Some(PathBuf::from("view.html")),
        omic1_metadata: Some(PathBuf::from("genes.tsv")),
        omic1_filter: "length".to_string(),
        omic1_values: strings(&[">10"]),
        ..Default::default()
    };
    let report = run_with(&args, &source).unwrap_err();
    assert_eq!(Error::kind_of(&report), Some(ErrorKind::EmptyResult));

    // malformed filters are told apart from strict ones
    let args = RunArgs { omic1_values: strings(&[">1", "<2", "<3"]), ..args };
    let report = run_with(&args, &source).unwrap_err();
    assert_eq!(Error::kind_of(&report), Some(ErrorKind::MalformedFilter));
    Ok(())
}

#[test]
fn run_end_to_end() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let ranks = dir.path().join("ranks.tsv");
    let mut file = std::fs::File::create(&ranks)?;
    writeln!(file, "featureid\tA\tB\tC")?;
    writeln!(file, "X\t0.9\t0.1\t0.05")?;
    writeln!(file, "Y\t0.3\t0.7\t0.05")?;

    let metadata = dir.path().join("genes.tsv");
    let mut file = std::fs::File::create(&metadata)?;
    writeln!(file, "gene\tpathway\tlength")?;
    writeln!(file, "A\tglycolysis\t3")?;
    writeln!(file, "B\ttca\t5")?;

    let subset = dir.path().join("subset.txt");
    std::fs::write(&subset, "x\n\ny\n")?;

    let args = RunArgs {
        ranks: ranks.clone(),
        omic1_metadata: Some(metadata),
        omic1_column: "pathway".to_string(),
        omic1_name: "genes".to_string(),
        omic2_subset: Some(subset),
        min_probability: 0.2,
        output_table: Some(dir.path().join("tables").join("pairs.tsv")),
        ..Default::default()
    };
    let output = run(&args)?;

    assert_eq!(output, dir.path().join("ranks_p02_n10.html"));
    let html = std::fs::read_to_string(&output)?;
    assert!(html.contains("genes: pathway"));
    assert!(html.contains("glycolysis"));

    let table = Table::read(&dir.path().join("tables").join("pairs.tsv"), b'\t')?;
    assert_eq!(table.rows.len(), 3);
    assert_eq!(table.headers.first().map(String::as_str), Some("genes"));
    assert_eq!(table.headers.last().map(String::as_str), Some("genes: pathway"));
    Ok(())
}

#[test]
fn run_args_json() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("args.json");
    let args = RunArgs { ranks: PathBuf::from("ranks.tsv"), omic1_values: strings(&[">=5"]), ..Default::default() };
    args.write(&path)?;
    assert_eq!(RunArgs::read(&path)?, args);

    std::fs::write(&path, r#"{ "ranks": "other.tsv", "pair_number": 3 }"#)?;
    let partial = RunArgs::read(&path)?;
    assert_eq!(partial.pair_number, 3);
    assert_eq!(partial.omic1_name, "omic1");
    Ok(())
}
