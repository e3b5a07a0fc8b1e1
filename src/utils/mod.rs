
use crate::Error;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use itertools::Itertools;
use regex::{RegexSet, RegexSetBuilder};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Returns the path unchanged if it points to an existing file.
///
/// ## Examples
///
/// ```rust
/// use xmmvec::utils::check_path;
/// assert!(check_path(&"Cargo.toml").is_ok());
/// assert!(check_path(&"missing/ranks.tsv").is_err());
/// ```
pub fn check_path<P>(path: &P) -> Result<PathBuf, Report>
where
    P: AsRef<Path> + Debug,
{
    let path = path.as_ref();
    match path.is_file() {
        true => Ok(path.to_path_buf()),
        false => Err(Error::InputMissing { path: path.to_path_buf() }.into()),
    }
}

/// Create the parent directory of a file path, if it does not exist yet.
pub fn create_parent_dir<P>(path: &P) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            log::info!("Creating output directory: {parent:?}");
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| eyre!("Failed to create directory: {parent:?}"))?;
        }
    }
    Ok(())
}

/// Create a temporary file next to `path`, to be persisted over it once fully written.
///
/// The parent directory of `path` is created if needed.
pub fn stage_file<P>(path: &P) -> Result<NamedTempFile, Report>
where
    P: AsRef<Path> + Debug,
{
    create_parent_dir(path)?;
    let dir = match path.as_ref().parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    NamedTempFile::new_in(dir).wrap_err_with(|| eyre!("Failed to create a temporary file in: {dir:?}"))
}

/// Remove newline characters that spreadsheet exports leave inside header names.
///
/// ## Examples
///
/// ```rust
/// use xmmvec::utils::strip_newlines;
/// assert_eq!(strip_newlines("tax\non\r\n"), "taxon");
/// ```
pub fn strip_newlines(s: &str) -> String {
    s.chars().filter(|c| *c != '\n' && *c != '\r').collect()
}

/// Parse one pattern per line, ignoring blank lines.
pub fn parse_patterns(text: &str) -> Vec<String> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from).collect_vec()
}

/// Compile patterns into a single case-insensitive [`RegexSet`].
///
/// ## Examples
///
/// ```rust
/// use xmmvec::utils::pattern_set;
/// let set = pattern_set(&["bacteroid".to_string(), "^lacto".to_string()])?;
/// assert!(set.is_match("g__Bacteroides"));
/// assert!(set.is_match("Lactobacillus"));
/// assert!(!set.is_match("Prevotella"));
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn pattern_set(patterns: &[String]) -> Result<RegexSet, Report> {
    RegexSetBuilder::new(patterns)
        .case_insensitive(true)
        .build()
        .wrap_err_with(|| eyre!("Failed to compile patterns: {patterns:?}"))
}

/// Format a float for use in a file name, without trailing zeros.
fn float_label(value: f64) -> String {
    let label = format!("{value}");
    label.replace('.', "")
}

/// Derive the artifact path from the score matrix path and run parameters.
///
/// ## Examples
///
/// ```rust
/// use xmmvec::utils::derive_output_path;
/// let path = derive_output_path(&"out/ranks.tsv", 0.1, 10);
/// assert_eq!(path, std::path::PathBuf::from("out/ranks_p01_n10.html"));
/// ```
pub fn derive_output_path<P>(matrix: &P, min_probability: f64, pair_number: usize) -> PathBuf
where
    P: AsRef<Path> + Debug,
{
    let matrix = matrix.as_ref();
    let stem = matrix.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    let name = format!("{stem}_p{}_n{pair_number}.html", float_label(min_probability));
    matrix.with_file_name(name)
}

/// Check that a path ends with the expected extension.
pub fn check_extension<P>(path: &P, extension: &str) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case(extension) => Ok(()),
        _ => Err(Error::OutputPathInvalid {
            path: path.to_path_buf(),
            extension: extension.to_string(),
        }
        .into()),
    }
}

/// Cell values read as missing, following the common dataframe conventions.
const MISSING_VALUES: &[&str] =
    &["", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "#N/A", "<NA>"];

/// Returns true if a table cell denotes a missing value.
///
/// ## Examples
///
/// ```rust
/// use xmmvec::utils::is_missing;
/// assert!(is_missing(" NA "));
/// assert!(!is_missing("0.5"));
/// ```
pub fn is_missing(value: &str) -> bool {
    MISSING_VALUES.contains(&value.trim())
}
