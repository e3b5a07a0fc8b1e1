use crate::metadata::*;
use crate::{Error, ErrorKind, Table};

use color_eyre::eyre::{Report, Result};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Features a-f with a color, an integer length and a float abundance.
fn toy_metadata() -> Result<Table<String>, Report> {
    let mut table = Table::new();
    table.headers = strings(&["featureid", "color", "length", "abun\ndance"]);
    let rows = [
        ["a", "red", "3", "0.1"],
        ["b", "blue", "5", "0.4"],
        ["c", "blue", "7", "NaN"],
        ["d", "green", "10", "0.8"],
        ["e", "red", "12", "0.2"],
        ["f", "Green", "4", "1.5"],
    ];
    for row in rows {
        table.add_row(strings(&row))?;
    }
    Ok(table)
}

fn ids(table: &Table<String>, axis: &str) -> Result<Vec<String>, Report> {
    Ok(table.get_column(&axis.to_string())?.into_iter().cloned().collect())
}

fn column_filter(column: &str) -> MetadataFilter {
    MetadataFilter { column: column.to_string(), ..Default::default() }
}

#[test]
fn load_empty() -> Result<(), Report> {
    let (table, column) = load_metadata(Table::new(), "color", "omic1")?;
    assert!(table.is_empty());
    assert_eq!(column, None);
    Ok(())
}

#[test]
fn load_renames_and_strips() -> Result<(), Report> {
    let (table, column) = load_metadata(toy_metadata()?, "abun\ndance", "microbes")?;
    assert_eq!(table.headers, ["microbes", "color", "length", "abundance"]);
    assert_eq!(column.as_deref(), Some("abundance"));
    Ok(())
}

#[test]
fn load_unknown_stratify_column() -> Result<(), Report> {
    let (_, column) = load_metadata(toy_metadata()?, "shape", "microbes")?;
    assert_eq!(column, None);
    // the identifier column cannot be used for stratification
    let (_, column) = load_metadata(toy_metadata()?, "microbes", "microbes")?;
    assert_eq!(column, None);
    Ok(())
}

#[test]
fn load_duplicate_identifiers() -> Result<(), Report> {
    let mut table = toy_metadata()?;
    table.add_row(strings(&["a", "red", "1", "0.1"]))?;
    assert!(load_metadata(table, "", "omic1").is_err());
    Ok(())
}

#[test]
fn filter_no_column() -> Result<(), Report> {
    let table = toy_metadata()?;
    let filter = MetadataFilter { values: strings(&["red"]), ..Default::default() };
    assert_eq!(filter_metadata(&table, &filter)?, table);

    let filter = MetadataFilter { values: strings(&["red"]), ..column_filter("shape") };
    assert_eq!(filter_metadata(&table, &filter)?, table);
    Ok(())
}

#[test]
fn filter_categorical() -> Result<(), Report> {
    let table = toy_metadata()?;
    let filter = MetadataFilter { values: strings(&["red", "green", "purple"]), ..column_filter("color") };
    let observed = ids(&filter_metadata(&table, &filter)?, "featureid")?;
    // exact matching, so "Green" is not kept
    assert_eq!(observed, ["a", "d", "e"]);
    Ok(())
}

#[test]
fn filter_categorical_not_found() -> Result<(), Report> {
    let table = toy_metadata()?;
    let filter = MetadataFilter { values: strings(&["purple"]), ..column_filter("color") };
    let report = filter_metadata(&table, &filter).unwrap_err();
    assert_eq!(Error::kind_of(&report), Some(ErrorKind::MalformedFilter));
    let message = report.to_string();
    assert!(message.contains("purple"));
    assert!(message.contains("color"));
    Ok(())
}

#[test]
fn filter_numeric_range() -> Result<(), Report> {
    let table = toy_metadata()?;
    let filter = MetadataFilter { values: strings(&[">=5", "<=10"]), ..column_filter("length") };
    let observed = ids(&filter_metadata(&table, &filter)?, "featureid")?;
    assert_eq!(observed, ["b", "c", "d"]);
    Ok(())
}

#[test]
fn filter_numeric_single_bound_negative() -> Result<(), Report> {
    let table = toy_metadata()?;
    let filter = MetadataFilter { values: strings(&["> -1"]), ..column_filter("length") };
    assert_eq!(filter_metadata(&table, &filter)?.rows.len(), 6);
    let filter = MetadataFilter { values: strings(&["<5"]), ..column_filter("length") };
    let observed = ids(&filter_metadata(&table, &filter)?, "featureid")?;
    assert_eq!(observed, ["a", "f"]);
    Ok(())
}

#[test]
fn filter_numeric_on_text() -> Result<(), Report> {
    let table = toy_metadata()?;
    let filter = MetadataFilter { values: strings(&[">1"]), ..column_filter("color") };
    let report = filter_metadata(&table, &filter).unwrap_err();
    assert!(matches!(report.downcast_ref::<Error>(), Some(Error::NonNumericValue { .. })));
    Ok(())
}

#[test]
fn filter_numeric_mixed_tokens() -> Result<(), Report> {
    let table = toy_metadata()?;
    let filter = MetadataFilter { values: strings(&[">1", "red"]), ..column_filter("length") };
    let report = filter_metadata(&table, &filter).unwrap_err();
    assert!(matches!(report.downcast_ref::<Error>(), Some(Error::InvalidComparator { .. })));
    Ok(())
}

#[test]
fn filter_quantile() -> Result<(), Report> {
    let table = toy_metadata()?;
    // non-missing values: 0.1 0.2 0.4 0.8 1.5, median 0.4
    let filter = MetadataFilter { quantile: Some(50.0), ..column_filter("abun\ndance") };
    let (table, _) = load_metadata(table, "", "featureid")?;
    let observed = ids(&filter_metadata(&table, &filter)?, "featureid")?;
    assert_eq!(observed, ["d", "f"]);
    Ok(())
}

#[test]
fn filter_quantile_out_of_range() -> Result<(), Report> {
    let (table, _) = load_metadata(toy_metadata()?, "", "featureid")?;
    let filter = MetadataFilter { quantile: Some(101.0), ..column_filter("abundance") };
    let report = filter_metadata(&table, &filter).unwrap_err();
    assert!(matches!(report.downcast_ref::<Error>(), Some(Error::QuantileOutOfRange { .. })));
    Ok(())
}

#[test]
fn filter_quantile_integer_column() -> Result<(), Report> {
    let table = toy_metadata()?;
    let filter = MetadataFilter { quantile: Some(50.0), ..column_filter("length") };
    let report = filter_metadata(&table, &filter).unwrap_err();
    assert!(matches!(report.downcast_ref::<Error>(), Some(Error::QuantileNotFloat { .. })));
    Ok(())
}

#[test]
fn filter_patterns() -> Result<(), Report> {
    let table = toy_metadata()?;
    let filter = MetadataFilter { patterns: strings(&["GREEN", "^r"]), ..column_filter("color") };
    let observed = ids(&filter_metadata(&table, &filter)?, "featureid")?;
    assert_eq!(observed, ["a", "d", "e", "f"]);
    Ok(())
}

#[test]
fn filter_steps_compose() -> Result<(), Report> {
    let (table, _) = load_metadata(toy_metadata()?, "", "featureid")?;
    // quantile keeps d and f, then patterns are matched against abundance values, not colors
    let filter = MetadataFilter { quantile: Some(50.0), patterns: strings(&["green"]), ..column_filter("abundance") };
    let observed = ids(&filter_metadata(&table, &filter)?, "featureid")?;
    assert_eq!(observed, Vec::<String>::new());

    let quantile = filter_metadata(&table, &MetadataFilter { quantile: Some(50.0), ..column_filter("abundance") })?;
    let filter = MetadataFilter { values: strings(&["green", "Green"]), ..column_filter("color") };
    let observed = ids(&filter_metadata(&quantile, &filter)?, "featureid")?;
    assert_eq!(observed, ["d", "f"]);
    Ok(())
}

#[test]
fn column_kind_inference() {
    assert_eq!(ColumnKind::infer(&strings(&["1", "2"])), ColumnKind::Integer);
    assert_eq!(ColumnKind::infer(&strings(&["1", "NA"])), ColumnKind::Float);
    assert_eq!(ColumnKind::infer(&strings(&["1.5", "2"])), ColumnKind::Float);
    assert_eq!(ColumnKind::infer(&strings(&["1.5", "x"])), ColumnKind::Text);
}

#[test]
fn percentile_interpolates() {
    assert_eq!(percentile(&[0.0, 10.0], 25.0), Some(2.5));
    assert_eq!(percentile(&[7.0], 90.0), Some(7.0));
    assert_eq!(percentile(&[1.0, 2.0, 3.0], 100.0), Some(3.0));
}
