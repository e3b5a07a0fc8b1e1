//! Loading and filtering of the optional per-feature metadata.

mod filter;
#[cfg(test)]
mod tests;

#[doc(inline)]
pub use filter::*;

use crate::utils::strip_newlines;
use crate::Table;
use color_eyre::eyre::{eyre, Report, Result};
use color_eyre::Help;
use itertools::Itertools;
use log::{debug, info};

/// Prepare a metadata [`Table`] read from a tab-delimited file.
///
/// The first column is the feature identifier and is renamed to `axis_name`. Header names
/// are stripped of embedded newline characters. The stratification column is resolved only
/// when it names one of the non-identifier columns, otherwise stratification is disabled.
///
/// An empty table (no metadata supplied) returns an empty table and no column.
///
/// ## Examples
///
/// ```rust
/// use xmmvec::{metadata, Table};
///
/// let mut table = Table::new();
/// table.headers = vec!["#SampleID".to_string(), "tax\non".to_string()];
/// table.add_row(["ASV1".to_string(), "Bacteroides".to_string()])?;
///
/// let (metadata, column) = metadata::load_metadata(table, "taxon", "microbes")?;
/// assert_eq!(metadata.headers, ["microbes", "taxon"]);
/// assert_eq!(column.as_deref(), Some("taxon"));
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn load_metadata(
    table: Table<String>,
    stratify_column: &str,
    axis_name: &str,
) -> Result<(Table<String>, Option<String>), Report> {
    if table.is_empty() {
        debug!("No metadata for {axis_name}, stratification disabled.");
        return Ok((Table::new(), None));
    }
    let mut table = table;

    table.headers = table.headers.iter().map(|h| strip_newlines(h)).collect_vec();
    let first = table
        .headers
        .first()
        .cloned()
        .ok_or_else(|| eyre!("Metadata table has no columns: {:?}", table.path))?;
    table.rename_header(&first, axis_name.to_string())?;

    // feature identifiers must be unique
    let duplicates = table.get_column(&axis_name.to_string())?.into_iter().duplicates().collect_vec();
    if !duplicates.is_empty() {
        return Err(eyre!("Duplicate {axis_name} identifiers in metadata: {duplicates:?}"))
            .suggestion(format!("Check the first column of {:?}", table.path));
    }

    let stratify_column = strip_newlines(stratify_column);
    let column = match table.headers.iter().skip(1).any(|h| *h == stratify_column) {
        true => Some(stratify_column),
        false => {
            if !stratify_column.is_empty() {
                debug!("Column '{stratify_column}' not in {axis_name} metadata, stratification disabled.");
            }
            None
        }
    };

    info!(
        "Loaded {axis_name} metadata: {} features, {} columns.",
        table.rows.len(),
        table.headers.len()
    );
    debug!("{axis_name} metadata:\n{}", table.to_markdown(5));

    Ok((table, column))
}
