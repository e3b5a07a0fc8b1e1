//! The [`LongForm`] table of scored feature pairs, with metadata groups and stacking.


use crate::matrix::Axis;
use crate::utils::is_missing;
use crate::Table;
use color_eyre::eyre::{Report, Result};
use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

// ----------------------------------------------------------------------------
// Measure

/// The four alternative measures of conditional strength a pair can be viewed by.
#[derive(
    AsRefStr, Clone, Copy, Debug, Deserialize, Display, EnumIter, EnumString, Eq, Hash, PartialEq,
    Serialize,
)]
pub enum Measure {
    /// The conditional score itself.
    #[strum(serialize = "conditional_score")]
    RawScore,
    /// Rank of the score among all pairs.
    #[strum(serialize = "ranked_conditional_score")]
    GlobalRank,
    /// Rank of the score among the pairs sharing the omic1 feature.
    #[strum(serialize = "per_omic1_rank")]
    PerOmic1Rank,
    /// Rank of the score among the pairs sharing the omic2 feature.
    #[strum(serialize = "per_omic2_rank")]
    PerOmic2Rank,
}

impl Measure {
    /// Value of this measure for a pair.
    pub fn value(&self, pair: &Pair) -> f64 {
        match self {
            Measure::RawScore => pair.conditional,
            Measure::GlobalRank => pair.ranked_conditional as f64,
            Measure::PerOmic1Rank => pair.rank_omic1 as f64,
            Measure::PerOmic2Rank => pair.rank_omic2 as f64,
        }
    }

    /// Human-readable label, using the axis display names.
    pub fn label(&self, omic1: &str, omic2: &str) -> String {
        match self {
            Measure::RawScore => "conditional score".to_string(),
            Measure::GlobalRank => "ranked conditional score".to_string(),
            Measure::PerOmic1Rank => format!("rank per {omic1}"),
            Measure::PerOmic2Rank => format!("rank per {omic2}"),
        }
    }
}

// ----------------------------------------------------------------------------
// Pair

/// One scored (omic1, omic2) feature pair.
///
/// Ranks are 0 until [`annotate_ranks`](crate::rank::annotate_ranks) fills them.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Pair {
    pub omic1: String,
    pub omic2: String,
    /// Conditional probability of omic2 given omic1.
    pub conditional: f64,
    /// Rank among all pairs (1 = highest score).
    pub ranked_conditional: usize,
    /// Rank among the pairs of the same omic1 feature.
    pub rank_omic1: usize,
    /// Rank among the pairs of the same omic2 feature.
    pub rank_omic2: usize,
    /// Group values, aligned with [`LongForm::groups`].
    pub groups: Vec<Option<String>>,
}

impl Pair {
    pub fn new(omic1: &str, omic2: &str, conditional: f64) -> Self {
        Pair { omic1: omic1.to_string(), omic2: omic2.to_string(), conditional, ..Default::default() }
    }

    /// Identifier of this pair's feature on `axis`.
    pub fn id(&self, axis: Axis) -> &str {
        match axis {
            Axis::Omic1 => &self.omic1,
            Axis::Omic2 => &self.omic2,
        }
    }

    /// Rank of this pair within its feature group on `axis`.
    pub fn axis_rank(&self, axis: Axis) -> usize {
        match axis {
            Axis::Omic1 => self.rank_omic1,
            Axis::Omic2 => self.rank_omic2,
        }
    }
}

// ----------------------------------------------------------------------------
// Long Form

/// A metadata column joined onto the long form.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GroupColumn {
    /// Axis whose features the column describes.
    pub axis: Axis,
    /// Composite name, `"<axis name>: <metadata column>"`.
    pub name: String,
}

/// One row per retained feature pair.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct LongForm {
    /// Display name of the omic1 axis.
    pub omic1: String,
    /// Display name of the omic2 axis.
    pub omic2: String,
    /// Extra grouping columns, in join order.
    pub groups: Vec<GroupColumn>,
    pub pairs: Vec<Pair>,
}

impl LongForm {
    pub fn new(omic1: &str, omic2: &str, pairs: Vec<Pair>) -> Self {
        LongForm { omic1: omic1.to_string(), omic2: omic2.to_string(), groups: Vec::new(), pairs }
    }

    /// Display name of an axis.
    pub fn axis_name(&self, axis: Axis) -> &str {
        match axis {
            Axis::Omic1 => &self.omic1,
            Axis::Omic2 => &self.omic2,
        }
    }

    /// Index of the group column describing `axis`, if any.
    pub fn group_index(&self, axis: Axis) -> Option<usize> {
        self.groups.iter().position(|g| g.axis == axis)
    }

    /// Names of the key columns: both axes, then every group column.
    pub fn key_columns(&self) -> Vec<String> {
        [self.omic1.clone(), self.omic2.clone()]
            .into_iter()
            .chain(self.groups.iter().map(|g| g.name.clone()))
            .collect()
    }

    /// Highest rank observed on an axis, 0 if there are no pairs.
    pub fn max_rank(&self, axis: Axis) -> usize {
        self.pairs.iter().map(|p| p.axis_rank(axis)).max().unwrap_or_default()
    }

    /// Returns a new long form with only the pairs for which `keep` is true.
    pub fn retain<F>(&self, keep: F) -> LongForm
    where
        F: Fn(&Pair) -> bool,
    {
        let pairs = self.pairs.iter().filter(|p| keep(p)).cloned().collect_vec();
        LongForm { pairs, ..self.clone_empty() }
    }

    fn clone_empty(&self) -> LongForm {
        LongForm {
            omic1: self.omic1.clone(),
            omic2: self.omic2.clone(),
            groups: self.groups.clone(),
            pairs: Vec::new(),
        }
    }

    /// Stack the measures: four rows per pair, one per [`Measure`].
    ///
    /// Every stacked row carries the values of all [`key_columns`](Self::key_columns),
    /// whatever their number.
    pub fn stack(&self) -> Vec<StackedRow> {
        self.pairs
            .iter()
            .flat_map(|pair| {
                let keys = [Some(pair.omic1.clone()), Some(pair.omic2.clone())]
                    .into_iter()
                    .chain(pair.groups.iter().cloned())
                    .collect_vec();
                Measure::iter().map(move |measure| StackedRow {
                    keys: keys.clone(),
                    measure,
                    value: measure.value(pair),
                    rank_omic1: pair.rank_omic1,
                    rank_omic2: pair.rank_omic2,
                })
            })
            .collect()
    }

    /// Convert to a [`Table`] of strings, one row per pair.
    pub fn to_table(&self) -> Result<Table<String>, Report> {
        let mut table = Table::new();
        table.headers = [self.omic1.clone(), self.omic2.clone()]
            .into_iter()
            .chain(Measure::iter().map(|m| m.to_string()))
            .chain(self.groups.iter().map(|g| g.name.clone()))
            .collect();

        for pair in &self.pairs {
            let row = [pair.omic1.clone(), pair.omic2.clone()]
                .into_iter()
                .chain(Measure::iter().map(|m| m.value(pair).to_string()))
                .chain(pair.groups.iter().map(|g| g.clone().unwrap_or_default()))
                .collect_vec();
            table.add_row(row)?;
        }
        Ok(table)
    }
}

// ----------------------------------------------------------------------------
// Stacked Row

/// A single (pair, measure) row, the unit of data embedded in the view.
#[derive(Clone, Debug, PartialEq)]
pub struct StackedRow {
    /// Values of [`LongForm::key_columns`].
    pub keys: Vec<Option<String>>,
    pub measure: Measure,
    pub value: f64,
    pub rank_omic1: usize,
    pub rank_omic2: usize,
}

/// Field holding the [`Measure`] tag of a stacked row.
pub const MEASURE_FIELD: &str = "conditional";
/// Field holding the measure value of a stacked row.
pub const VALUE_FIELD: &str = "rank";
/// Fields every stacked record carries, which no key column may be named.
pub const RESERVED_FIELDS: [&str; 4] =
    [MEASURE_FIELD, VALUE_FIELD, "per_omic1_rank", "per_omic2_rank"];

impl StackedRow {
    /// Convert to a JSON record, given the key column names.
    pub fn to_record(&self, key_columns: &[String]) -> Value {
        let mut record = Map::new();
        for (name, key) in key_columns.iter().zip(&self.keys) {
            let value = key.clone().map(Value::String).unwrap_or(Value::Null);
            record.insert(name.clone(), value);
        }
        record.insert(MEASURE_FIELD.to_string(), Value::from(self.measure.as_ref()));
        record.insert(VALUE_FIELD.to_string(), Value::from(self.value));
        record.insert(Measure::PerOmic1Rank.to_string(), Value::from(self.rank_omic1));
        record.insert(Measure::PerOmic2Rank.to_string(), Value::from(self.rank_omic2));
        Value::Object(record)
    }
}

// ----------------------------------------------------------------------------
// Merge

/// Left-join a metadata column onto the long form.
///
/// Identifiers absent from the metadata, or with a missing value, get no group.
fn join_group(
    long_form: LongForm,
    metadata: &Table<String>,
    column: &str,
    axis: Axis,
) -> Result<(LongForm, String), Report> {
    let axis_name = long_form.axis_name(axis).to_string();
    let selected = metadata.select(&[axis_name.clone(), column.to_string()])?;
    let lookup: HashMap<&str, &str> =
        selected.rows.iter().map(|row| (row[0].as_str(), row[1].as_str())).collect();

    let name = format!("{axis_name}: {column}");
    let mut missing = 0;
    let pairs = long_form
        .pairs
        .into_iter()
        .map(|mut pair| {
            let value = lookup.get(pair.id(axis)).filter(|v| !is_missing(v)).map(|v| v.to_string());
            if value.is_none() {
                missing += 1;
            }
            pair.groups.push(value);
            pair
        })
        .collect_vec();
    if missing > 0 {
        debug!("{missing} pairs have no '{name}' value.");
    }

    let mut groups = long_form.groups;
    groups.push(GroupColumn { axis, name: name.clone() });
    Ok((LongForm { omic1: long_form.omic1, omic2: long_form.omic2, groups, pairs }, name))
}

/// Join the stratification columns of both axes onto the long form.
///
/// ## Arguments
///
/// - `metadata_omic1`, `metadata_omic2` - Metadata tables, first column renamed to the axis name.
/// - `column_omic1`, `column_omic2` - Resolved stratification columns; `None` adds nothing.
///
/// Returns the new long form and the composite names of the joined columns.
pub fn merge_groups(
    long_form: LongForm,
    metadata_omic1: &Table<String>,
    metadata_omic2: &Table<String>,
    column_omic1: Option<&str>,
    column_omic2: Option<&str>,
) -> Result<(LongForm, Option<String>, Option<String>), Report> {
    let mut long_form = long_form;
    let mut names = [None, None];

    for (i, (axis, metadata, column)) in [
        (Axis::Omic1, metadata_omic1, column_omic1),
        (Axis::Omic2, metadata_omic2, column_omic2),
    ]
    .into_iter()
    .enumerate()
    {
        if let Some(column) = column {
            let (merged, name) = join_group(long_form, metadata, column, axis)?;
            info!("Merged metadata column '{name}'.");
            long_form = merged;
            names[i] = Some(name);
        }
    }

    let [name_omic1, name_omic2] = names;
    Ok((long_form, name_omic1, name_omic2))
}
