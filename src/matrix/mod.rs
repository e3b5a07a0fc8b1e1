//! The wide [`ScoreMatrix`] and its reshaping to [`LongForm`].

#[cfg(test)]
mod tests;

use crate::long_form::{LongForm, Pair};
use crate::utils::{is_missing, pattern_set};
use crate::{Error, Table};
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

// ----------------------------------------------------------------------------
// Axis

/// One of the two feature axes of a [`ScoreMatrix`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Axis {
    /// Matrix columns.
    Omic1,
    /// Matrix rows.
    Omic2,
}

impl Display for Axis {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let name = match self {
            Axis::Omic1 => "omic1",
            Axis::Omic2 => "omic2",
        };
        write!(f, "{name}")
    }
}

// ----------------------------------------------------------------------------
// Score Matrix

/// Conditional probabilities of omic2 features (rows) given omic1 features (columns).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScoreMatrix {
    /// Column identifiers.
    pub omic1: Vec<String>,
    /// Row identifiers.
    pub omic2: Vec<String>,
    /// Cell scores, indexed as `scores[row][column]`.
    pub scores: Vec<Vec<Option<f64>>>,
}

impl ScoreMatrix {
    /// Parse a [`ScoreMatrix`] from a table whose first column holds the row identifiers.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use xmmvec::{ScoreMatrix, Table};
    ///
    /// let mut table = Table::new();
    /// table.headers = vec!["featureid".to_string(), "A".to_string(), "B".to_string()];
    /// table.add_row(["X".to_string(), "0.9".to_string(), "".to_string()])?;
    ///
    /// let matrix = ScoreMatrix::from_table(&table)?;
    /// assert_eq!(matrix.omic1, ["A", "B"]);
    /// assert_eq!(matrix.scores, [[Some(0.9), None]]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn from_table(table: &Table<String>) -> Result<Self, Report> {
        let omic1 = table.headers.iter().skip(1).cloned().collect_vec();
        let omic2 = table.rows.iter().filter_map(|row| row.first().cloned()).collect_vec();

        for (axis, ids) in [(Axis::Omic1, &omic1), (Axis::Omic2, &omic2)] {
            let duplicates = ids.iter().duplicates().collect_vec();
            if !duplicates.is_empty() {
                return Err(eyre!("Duplicate {axis} identifiers in score matrix: {duplicates:?}"))
                    .suggestion(format!("Check the matrix file: {:?}", table.path));
            }
        }

        let scores = table
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .skip(1)
                    .map(|cell| match is_missing(cell) {
                        true => Ok(None),
                        false => cell
                            .trim()
                            .parse::<f64>()
                            .map(|v| (!v.is_nan()).then_some(v))
                            .wrap_err_with(|| eyre!("Invalid score '{cell}' for row '{}'", row[0])),
                    })
                    .collect::<Result<Vec<_>, Report>>()
            })
            .collect::<Result<Vec<_>, Report>>()?;

        Ok(ScoreMatrix { omic1, omic2, scores })
    }

    /// Number of rows and columns.
    pub fn shape(&self) -> (usize, usize) {
        (self.omic2.len(), self.omic1.len())
    }

    /// Returns true if the matrix has no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.omic1.is_empty() || self.omic2.is_empty()
    }

    /// Returns a new matrix with the selected row and column indices, in that order.
    fn select(&self, rows: &[usize], columns: &[usize]) -> ScoreMatrix {
        ScoreMatrix {
            omic1: columns.iter().map(|c| self.omic1[*c].clone()).collect(),
            omic2: rows.iter().map(|r| self.omic2[*r].clone()).collect(),
            scores: rows
                .iter()
                .map(|r| columns.iter().map(|c| self.scores[*r][*c]).collect())
                .collect(),
        }
    }

    /// Returns a new matrix keeping only the identifiers of `axis` for which `keep` is true.
    pub fn subset<F>(&self, axis: Axis, keep: F) -> ScoreMatrix
    where
        F: Fn(&str) -> bool,
    {
        let rows = (0..self.omic2.len()).collect_vec();
        let columns = (0..self.omic1.len()).collect_vec();
        match axis {
            Axis::Omic1 => {
                let columns = self.omic1.iter().positions(|id| keep(id)).collect_vec();
                self.select(&rows, &columns)
            }
            Axis::Omic2 => {
                let rows = self.omic2.iter().positions(|id| keep(id)).collect_vec();
                self.select(&rows, &columns)
            }
        }
    }

    /// Keep the identifiers of `axis` that match any case-insensitive pattern.
    ///
    /// No patterns means no subsetting.
    pub fn subset_by_patterns(&self, axis: Axis, patterns: &[String]) -> Result<ScoreMatrix, Report> {
        if patterns.is_empty() {
            return Ok(self.clone());
        }
        let set = pattern_set(patterns)?;
        let subset = self.subset(axis, |id| set.is_match(id));
        info!("Subset {axis} by {} patterns: {:?} -> {:?}", patterns.len(), self.shape(), subset.shape());
        Ok(subset)
    }

    /// Returns a new matrix where every score below `floor` is missing.
    pub fn apply_floor(&self, floor: f64) -> ScoreMatrix {
        let scores = self
            .scores
            .iter()
            .map(|row| row.iter().map(|s| s.filter(|s| *s >= floor)).collect())
            .collect();
        ScoreMatrix { omic1: self.omic1.clone(), omic2: self.omic2.clone(), scores }
    }

    /// Returns a new matrix without the rows and columns that are entirely missing.
    pub fn prune(&self) -> ScoreMatrix {
        let rows = (0..self.omic2.len())
            .filter(|r| self.scores[*r].iter().any(Option::is_some))
            .collect_vec();
        let columns = (0..self.omic1.len())
            .filter(|c| self.scores.iter().any(|row| row[*c].is_some()))
            .collect_vec();
        self.select(&rows, &columns)
    }

    /// Unstack to one [`Pair`] per non-missing cell, column by column.
    pub fn unstack(&self, omic1_name: &str, omic2_name: &str) -> LongForm {
        let pairs = self
            .omic1
            .iter()
            .enumerate()
            .flat_map(|(c, omic1)| {
                self.omic2.iter().enumerate().filter_map(move |(r, omic2)| {
                    self.scores[r][c].map(|score| Pair::new(omic1, omic2, score))
                })
            })
            .collect_vec();
        LongForm::new(omic1_name, omic2_name, pairs)
    }
}

// ----------------------------------------------------------------------------
// Reshape

/// Reshape a [`ScoreMatrix`] to [`LongForm`].
///
/// ## Arguments
///
/// - `ids_omic1`, `ids_omic2` - Feature identifiers kept by an active metadata filter. Each
///   axis with a set is restricted to it before the probability floor is applied, so that
///   pruning only reflects the explicit selection.
/// - `floor` - Minimum conditional probability; lower scores become missing.
/// - `omic1_name`, `omic2_name` - Display names of the axes.
///
/// Fails with [`Error::EmptyResult`] if no rows or no columns survive.
///
/// ## Examples
///
/// ```rust
/// use xmmvec::{matrix::reshape, ScoreMatrix};
///
/// let matrix = ScoreMatrix {
///     omic1: vec!["A".to_string(), "B".to_string()],
///     omic2: vec!["X".to_string(), "Y".to_string()],
///     scores: vec![vec![Some(0.9), Some(0.1)], vec![Some(0.3), Some(0.7)]],
/// };
/// let long_form = reshape(&matrix, None, None, 0.2, "omic1", "omic2")?;
/// assert_eq!(long_form.pairs.len(), 3);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn reshape(
    matrix: &ScoreMatrix,
    ids_omic1: Option<&BTreeSet<String>>,
    ids_omic2: Option<&BTreeSet<String>>,
    floor: f64,
    omic1_name: &str,
    omic2_name: &str,
) -> Result<LongForm, Report> {
    let mut restricted = matrix.clone();
    for (axis, ids) in [(Axis::Omic1, ids_omic1), (Axis::Omic2, ids_omic2)] {
        if let Some(ids) = ids {
            restricted = restricted.subset(axis, |id| ids.contains(id));
            debug!("Restricted {axis} to {} filtered features: {:?}", ids.len(), restricted.shape());
        }
    }

    let pruned = restricted.apply_floor(floor).prune();
    info!("Score matrix after probability floor {floor}: {:?} (rows, columns)", pruned.shape());

    if pruned.is_empty() {
        let (rows, columns) = pruned.shape();
        return Err(Error::EmptyResult {
            reason: format!(
                "{rows} {omic2_name} and {columns} {omic1_name} features remain after filtering and the probability floor ({floor})"
            ),
        })
        .suggestion("Lower the minimum probability or relax the metadata filters.");
    }

    Ok(pruned.unstack(omic1_name, omic2_name))
}
