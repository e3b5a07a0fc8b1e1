use crate::utils::{is_missing, pattern_set, strip_newlines};
use crate::{Error, Table};
use color_eyre::eyre::{Report, Result};
use itertools::Itertools;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

// ----------------------------------------------------------------------------
// Filter

/// Narrowing of a metadata table on one of its columns.
///
/// The steps are applied in the order quantile, value, regex, each one narrowing the
/// features that survived the previous.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct MetadataFilter {
    /// Column to filter on. An empty column disables filtering.
    pub column: String,
    /// Categorical values, or one or two comparator bounds such as `>=5`.
    pub values: Vec<String>,
    /// Keep features strictly above this percentile (0-100) of the column.
    pub quantile: Option<f64>,
    /// Keep features whose value matches any of these case-insensitive patterns.
    pub patterns: Vec<String>,
}

impl MetadataFilter {
    /// Returns true if the filter would narrow anything.
    pub fn is_active(&self) -> bool {
        !self.column.is_empty()
            && (!self.values.is_empty() || self.quantile.is_some() || !self.patterns.is_empty())
    }

    /// Returns true if the filter is active and its column exists in `table`.
    pub fn applies_to(&self, table: &Table<String>) -> bool {
        self.is_active() && resolve_column(table, &self.column).is_some()
    }
}

/// Apply a [`MetadataFilter`] to a metadata [`Table`], returning the surviving rows.
///
/// Filtering is a no-op when the column is empty or is not found in the table.
///
/// ## Examples
///
/// ```rust
/// use xmmvec::metadata::{filter_metadata, MetadataFilter};
/// use xmmvec::Table;
///
/// let mut table = Table::new();
/// table.headers = vec!["id".to_string(), "length".to_string()];
/// for (id, length) in [("a", "3"), ("b", "5"), ("c", "10"), ("d", "12")] {
///     table.add_row([id.to_string(), length.to_string()])?;
/// }
///
/// let filter = MetadataFilter {
///     column: "length".to_string(),
///     values: vec![">=5".to_string(), "<=10".to_string()],
///     ..Default::default()
/// };
/// let filtered = filter_metadata(&table, &filter)?;
/// assert_eq!(filtered.get_column(&"id".to_string())?, [&"b", &"c"]);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn filter_metadata(table: &Table<String>, filter: &MetadataFilter) -> Result<Table<String>, Report> {
    let Some(column) = resolve_column(table, &filter.column) else {
        if !filter.column.is_empty() && !table.is_empty() {
            warn!("Filter column '{}' was not found, no filtering applied.", filter.column);
        }
        return Ok(table.clone());
    };

    let mut filtered = table.clone();

    if let Some(quantile) = filter.quantile {
        filtered = filter_quantile(&filtered, &column, quantile)?;
    }

    if !filter.values.is_empty() {
        filtered = match ValueFilter::parse(&filter.values)? {
            ValueFilter::Categorical(values) => filter_categorical(&filtered, &column, &values)?,
            ValueFilter::Numeric(bounds) => filter_numeric(&filtered, &column, &bounds)?,
        };
    }

    if !filter.patterns.is_empty() {
        let set = pattern_set(&filter.patterns)?;
        filtered = filtered.retain_rows(&column, |v| set.is_match(v))?;
    }

    info!(
        "Filtered metadata on '{column}': {} of {} features kept.",
        filtered.rows.len(),
        table.rows.len()
    );
    Ok(filtered)
}

/// Find the filter column, falling back to its newline-stripped form.
fn resolve_column(table: &Table<String>, column: &str) -> Option<String> {
    if column.is_empty() {
        return None;
    }
    [column.to_string(), strip_newlines(column)].into_iter().find(|c| table.headers.contains(c))
}

// ----------------------------------------------------------------------------
// Column Kind

/// Value type of a metadata column, as a dataframe reader would infer it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

impl ColumnKind {
    /// Infer the kind of a column of raw cells.
    ///
    /// Integers with missing values are promoted to floats.
    pub fn infer<'a, I>(cells: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut has_missing = false;
        let mut all_integer = true;
        for cell in cells {
            if is_missing(cell) {
                has_missing = true;
            } else if cell.trim().parse::<i64>().is_err() {
                all_integer = false;
                if cell.trim().parse::<f64>().is_err() {
                    return ColumnKind::Text;
                }
            }
        }
        match all_integer && !has_missing {
            true => ColumnKind::Integer,
            false => ColumnKind::Float,
        }
    }
}

/// Linear-interpolation percentile (0-100) of already sorted values.
///
/// ## Examples
///
/// ```rust
/// use xmmvec::metadata::percentile;
/// assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0], 50.0), Some(2.5));
/// assert_eq!(percentile(&[], 50.0), None);
/// ```
pub fn percentile(sorted: &[f64], quantile: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let position = quantile / 100.0 * last as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

fn filter_quantile(table: &Table<String>, column: &str, quantile: f64) -> Result<Table<String>, Report> {
    if !(0.0..=100.0).contains(&quantile) {
        return Err(Error::QuantileOutOfRange { quantile }.into());
    }
    let column = column.to_string();
    let cells = table.get_column(&column)?;
    if ColumnKind::infer(cells.iter().copied()) != ColumnKind::Float {
        return Err(Error::QuantileNotFloat { column }.into());
    }

    let sorted = cells
        .iter()
        .filter(|c| !is_missing(c))
        .filter_map(|c| c.trim().parse::<f64>().ok())
        .sorted_by(f64::total_cmp)
        .collect_vec();

    let Some(threshold) = percentile(&sorted, quantile) else {
        return table.retain_rows(&column, |_| false);
    };
    info!("Quantile {quantile} of '{column}': {threshold}");

    table.retain_rows(&column, |v| v.trim().parse::<f64>().is_ok_and(|v| v > threshold))
}

fn filter_categorical(
    table: &Table<String>,
    column: &str,
    values: &[String],
) -> Result<Table<String>, Report> {
    let column = column.to_string();
    let cells = table.get_column(&column)?;
    if !values.iter().any(|v| cells.contains(&v)) {
        return Err(Error::ValuesNotFound { values: values.to_vec(), column }.into());
    }
    table.retain_rows(&column, |v| values.contains(v))
}

fn filter_numeric(table: &Table<String>, column: &str, bounds: &[Bound]) -> Result<Table<String>, Report> {
    let column = column.to_string();
    // coerce the whole column first, so that bad content fails regardless of the bounds
    if let Some(value) = table
        .get_column(&column)?
        .into_iter()
        .find(|c| !is_missing(c) && c.trim().parse::<f64>().is_err())
    {
        return Err(Error::NonNumericValue { column, value: value.clone() }.into());
    }
    table.retain_rows(&column, |v| {
        v.trim().parse::<f64>().is_ok_and(|v| !v.is_nan() && bounds.iter().all(|b| b.contains(v)))
    })
}

// ----------------------------------------------------------------------------
// Value Filter

/// Numeric comparison operator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Comparator {
    Lt,
    Gt,
    Le,
    Ge,
}

impl Display for Comparator {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let symbol = match self {
            Comparator::Lt => "<",
            Comparator::Gt => ">",
            Comparator::Le => "<=",
            Comparator::Ge => ">=",
        };
        write!(f, "{symbol}")
    }
}

/// A signed numeric bound, such as `>=-1.5`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bound {
    pub comparator: Comparator,
    pub value: f64,
}

impl Bound {
    /// Returns true if `x` satisfies the bound.
    pub fn contains(&self, x: f64) -> bool {
        match self.comparator {
            Comparator::Lt => x < self.value,
            Comparator::Gt => x > self.value,
            Comparator::Le => x <= self.value,
            Comparator::Ge => x >= self.value,
        }
    }

    /// Returns true if the token starts with a comparator.
    pub fn is_bound(token: &str) -> bool {
        token.trim_start().starts_with(['<', '>'])
    }
}

impl FromStr for Bound {
    type Err = Report;

    fn from_str(token: &str) -> Result<Self, Report> {
        let trimmed = token.trim();
        // two-character operators must be matched first
        let (comparator, rest) = [
            ("<=", Comparator::Le),
            (">=", Comparator::Ge),
            ("<", Comparator::Lt),
            (">", Comparator::Gt),
        ]
        .into_iter()
        .find_map(|(symbol, comparator)| trimmed.strip_prefix(symbol).map(|rest| (comparator, rest)))
        .ok_or_else(|| Error::InvalidComparator {
            token: token.to_string(),
            reason: "expected one of <, >, <=, >=".to_string(),
        })?;

        let value = rest.trim().parse::<f64>().map_err(|_| Error::InvalidComparator {
            token: token.to_string(),
            reason: format!("'{}' is not a number", rest.trim()),
        })?;

        Ok(Bound { comparator, value })
    }
}

/// Parsed value tokens of a [`MetadataFilter`].
#[derive(Clone, Debug, PartialEq)]
pub enum ValueFilter {
    /// Exact-match set of values.
    Categorical(Vec<String>),
    /// One or two bounds, combined by AND.
    Numeric(Vec<Bound>),
}

impl ValueFilter {
    /// Parse value tokens. Any token starting with a comparator makes it a numeric filter.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use xmmvec::metadata::{ValueFilter, Bound, Comparator};
    ///
    /// let filter = ValueFilter::parse(&[">=5".to_string(), "<= 10".to_string()])?;
    /// let expected = ValueFilter::Numeric(vec![
    ///     Bound { comparator: Comparator::Ge, value: 5.0 },
    ///     Bound { comparator: Comparator::Le, value: 10.0 },
    /// ]);
    /// assert_eq!(filter, expected);
    ///
    /// assert!(ValueFilter::parse(&[">1".to_string(), "<2".to_string(), "<3".to_string()]).is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn parse(tokens: &[String]) -> Result<Self, Report> {
        if !tokens.iter().any(|t| Bound::is_bound(t)) {
            return Ok(ValueFilter::Categorical(tokens.to_vec()));
        }
        if tokens.len() > 2 {
            return Err(Error::InvalidComparator {
                token: tokens.join(" "),
                reason: "at most two numeric bounds are allowed".to_string(),
            }
            .into());
        }
        let bounds = tokens.iter().map(|t| t.parse::<Bound>()).collect::<Result<Vec<_>, _>>()?;
        Ok(ValueFilter::Numeric(bounds))
    }
}
