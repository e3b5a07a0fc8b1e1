//! Run the explorer: from a score matrix and optional metadata to an interactive view.

#[cfg(test)]
mod tests;

use crate::long_form::{merge_groups, RESERVED_FIELDS};
use crate::matrix::{reshape, Axis, ScoreMatrix};
use crate::metadata::{filter_metadata, load_metadata, MetadataFilter};
use crate::rank::annotate_ranks;
use crate::utils::{check_extension, derive_output_path, parse_patterns, stage_file};
use crate::view::{Palette, View, ViewParams};
use crate::{Error, ErrorKind, Table};
#[cfg(feature = "cli")]
use clap::Args as ClapArgs;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

// ----------------------------------------------------------------------------
// Input Source

/// Where the pipeline reads its inputs from.
pub trait InputSource {
    /// Returns the path if it exists, an [`Error::InputMissing`] otherwise.
    fn check_path(&self, path: &Path) -> Result<PathBuf, Report>;
    /// Read a tab-delimited table.
    fn read_table(&self, path: &Path) -> Result<Table<String>, Report>;
    /// Read a list of patterns, one per line.
    fn read_patterns(&self, path: &Path) -> Result<Vec<String>, Report>;
}

/// Inputs read from the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileSource;

impl InputSource for FileSource {
    fn check_path(&self, path: &Path) -> Result<PathBuf, Report> {
        crate::utils::check_path(&path)
    }

    fn read_table(&self, path: &Path) -> Result<Table<String>, Report> {
        Table::read(&path, b'\t')
    }

    fn read_patterns(&self, path: &Path) -> Result<Vec<String>, Report> {
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| eyre!("Failed to read patterns: {path:?}"))?;
        Ok(parse_patterns(&text))
    }
}

// ----------------------------------------------------------------------------
// RunArgs

/// Explore the conditional probabilities between two omics.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[cfg_attr(feature = "cli", derive(ClapArgs))]
#[serde(default)]
pub struct RunArgs {
    /// Score matrix of conditional probabilities (tab-delimited).
    ///
    /// Columns are omic1 features, rows are omic2 features.
    #[cfg_attr(feature = "cli", clap(short = 'r', long, required = true))]
    pub ranks: PathBuf,

    /// Output HTML view.
    ///
    /// Defaults to `<ranks>_p<min-probability>_n<pair-number>.html` next to the matrix.
    #[cfg_attr(feature = "cli", clap(short = 'o', long))]
    pub output: Option<PathBuf>,

    /// Tree with labelled internal nodes. Checked but not used yet.
    #[cfg_attr(feature = "cli", clap(short = 't', long))]
    pub tree_taxonomy: Option<PathBuf>,

    /// Metadata table of omic1 features (columns of the matrix).
    #[cfg_attr(feature = "cli", arg(long))]
    pub omic1_metadata: Option<PathBuf>,

    /// Omic1 metadata column used to stratify features.
    #[cfg_attr(feature = "cli", arg(long, default_value_t = RunArgs::default().omic1_column))]
    pub omic1_column: String,

    /// Omic1 metadata column used to filter features.
    #[cfg_attr(feature = "cli", arg(long, default_value_t = RunArgs::default().omic1_filter))]
    pub omic1_filter: String,

    /// Values of the omic1 filter column to keep.
    ///
    /// Either categories, or one or two numeric bounds such as '>=5' '<10'.
    #[cfg_attr(feature = "cli", arg(long, num_args = 1..))]
    pub omic1_values: Vec<String>,

    /// File of patterns (one per line) matched against the omic1 filter column.
    #[cfg_attr(feature = "cli", arg(long))]
    pub omic1_value_regex: Option<PathBuf>,

    /// Keep omic1 features above this percentile (0-100) of the filter column.
    #[cfg_attr(feature = "cli", arg(long))]
    pub omic1_quantile: Option<f64>,

    /// Display name of omic1 features.
    #[cfg_attr(feature = "cli", arg(long, default_value_t = RunArgs::default().omic1_name))]
    pub omic1_name: String,

    /// File of patterns (one per line) selecting omic1 features by identifier.
    #[cfg_attr(feature = "cli", arg(long))]
    pub omic1_subset: Option<PathBuf>,

    /// Maximum number of co-occurrences per omic1 feature, 0 for no limit.
    #[cfg_attr(feature = "cli", arg(long, default_value_t = RunArgs::default().omic1_max))]
    pub omic1_max: usize,

    /// Metadata table of omic2 features (rows of the matrix).
    #[cfg_attr(feature = "cli", arg(long))]
    pub omic2_metadata: Option<PathBuf>,

    /// Omic2 metadata column used to stratify features.
    #[cfg_attr(feature = "cli", arg(long, default_value_t = RunArgs::default().omic2_column))]
    pub omic2_column: String,

    /// Omic2 metadata column used to filter features.
    #[cfg_attr(feature = "cli", arg(long, default_value_t = RunArgs::default().omic2_filter))]
    pub omic2_filter: String,

    /// Values of the omic2 filter column to keep.
    #[cfg_attr(feature = "cli", arg(long, num_args = 1..))]
    pub omic2_values: Vec<String>,

    /// File of patterns (one per line) matched against the omic2 filter column.
    #[cfg_attr(feature = "cli", arg(long))]
    pub omic2_value_regex: Option<PathBuf>,

    /// Keep omic2 features above this percentile (0-100) of the filter column.
    #[cfg_attr(feature = "cli", arg(long))]
    pub omic2_quantile: Option<f64>,

    /// Display name of omic2 features.
    #[cfg_attr(feature = "cli", arg(long, default_value_t = RunArgs::default().omic2_name))]
    pub omic2_name: String,

    /// File of patterns (one per line) selecting omic2 features by identifier.
    #[cfg_attr(feature = "cli", arg(long))]
    pub omic2_subset: Option<PathBuf>,

    /// Maximum number of co-occurrences per omic2 feature, 0 for no limit.
    #[cfg_attr(feature = "cli", arg(long, default_value_t = RunArgs::default().omic2_max))]
    pub omic2_max: usize,

    /// Minimum conditional probability.
    #[cfg_attr(feature = "cli", clap(short = 'p', long, default_value_t = RunArgs::default().min_probability))]
    pub min_probability: f64,

    /// Initial number of co-occurrences shown per feature.
    #[cfg_attr(feature = "cli", clap(short = 'n', long, default_value_t = RunArgs::default().pair_number))]
    pub pair_number: usize,

    /// Color palette of the matrix.
    #[cfg_attr(feature = "cli", arg(long, value_enum, default_value_t = RunArgs::default().palette))]
    pub palette: Palette,

    /// Color of the top-hits labels.
    #[cfg_attr(feature = "cli", arg(long, default_value_t = RunArgs::default().top_color))]
    pub top_color: String,

    /// Also write the ranked pairs as a tab-delimited table.
    #[cfg_attr(feature = "cli", arg(long))]
    pub output_table: Option<PathBuf>,
}

impl Default for RunArgs {
    fn default() -> Self {
        let view = ViewParams::default();
        RunArgs {
            ranks: PathBuf::new(),
            output: None,
            tree_taxonomy: None,
            omic1_metadata: None,
            omic1_column: String::new(),
            omic1_filter: String::new(),
            omic1_values: Vec::new(),
            omic1_value_regex: None,
            omic1_quantile: None,
            omic1_name: Axis::Omic1.to_string(),
            omic1_subset: None,
            omic1_max: view.max_omic1,
            omic2_metadata: None,
            omic2_column: String::new(),
            omic2_filter: String::new(),
            omic2_values: Vec::new(),
            omic2_value_regex: None,
            omic2_quantile: None,
            omic2_name: Axis::Omic2.to_string(),
            omic2_subset: None,
            omic2_max: view.max_omic2,
            min_probability: 0.0,
            pair_number: view.pair_number,
            palette: view.palette,
            top_color: view.top_color,
            output_table: None,
        }
    }
}

/// The per-axis subset of [`RunArgs`].
#[derive(Clone, Debug, PartialEq)]
pub struct AxisArgs<'a> {
    pub axis: Axis,
    pub metadata: Option<&'a Path>,
    pub column: &'a str,
    pub filter: &'a str,
    pub values: &'a [String],
    pub value_regex: Option<&'a Path>,
    pub quantile: Option<f64>,
    pub name: &'a str,
    pub subset: Option<&'a Path>,
}

/// An optional input path, where an empty path counts as not given.
fn given(path: &Option<PathBuf>) -> Option<&Path> {
    path.as_deref().filter(|p| !p.as_os_str().is_empty())
}

impl RunArgs {
    /// Borrow the arguments of one axis.
    pub fn axis(&self, axis: Axis) -> AxisArgs<'_> {
        match axis {
            Axis::Omic1 => AxisArgs {
                axis,
                metadata: given(&self.omic1_metadata),
                column: &self.omic1_column,
                filter: &self.omic1_filter,
                values: &self.omic1_values,
                value_regex: given(&self.omic1_value_regex),
                quantile: self.omic1_quantile,
                name: &self.omic1_name,
                subset: given(&self.omic1_subset),
            },
            Axis::Omic2 => AxisArgs {
                axis,
                metadata: given(&self.omic2_metadata),
                column: &self.omic2_column,
                filter: &self.omic2_filter,
                values: &self.omic2_values,
                value_regex: given(&self.omic2_value_regex),
                quantile: self.omic2_quantile,
                name: &self.omic2_name,
                subset: given(&self.omic2_subset),
            },
        }
    }

    /// Path of the HTML view, derived from the matrix path when not given.
    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(output) => output.clone(),
            None => derive_output_path(&self.ranks, self.min_probability, self.pair_number),
        }
    }

    /// Display parameters of the view.
    pub fn view_params(&self) -> ViewParams {
        ViewParams {
            palette: self.palette,
            top_color: self.top_color.clone(),
            pair_number: self.pair_number,
            max_omic1: self.omic1_max,
            max_omic2: self.omic2_max,
        }
    }

    /// Reads [`RunArgs`] from a JSON file.
    pub fn read<P>(path: &P) -> Result<RunArgs, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let input = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read run arguments: {path:?}."))?;
        let run_args = serde_json::from_str(&input)
            .wrap_err_with(|| format!("Failed to deserialize run arguments: {input}"))?;
        Ok(run_args)
    }

    /// Write [`RunArgs`] to a JSON file.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use xmmvec::RunArgs;
    /// let dir = tempfile::tempdir()?;
    /// let path = dir.path().join("run_args.json");
    /// RunArgs::default().write(&path)?;
    /// assert_eq!(RunArgs::read(&path)?, RunArgs::default());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn write<P>(&self, path: &P) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
    {
        crate::utils::create_parent_dir(path)?;
        let output = serde_json::to_string_pretty(self)
            .wrap_err(format!("Failed to serialize run arguments: {self:?}"))?;
        std::fs::write(path, output)
            .wrap_err(format!("Failed to write run arguments: {path:?}"))?;
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Run

/// Metadata of one axis, ready for the merge.
struct AxisMetadata {
    table: Table<String>,
    /// Resolved stratification column.
    column: Option<String>,
    /// Identifiers kept by the filter, if one applied.
    ids: Option<BTreeSet<String>>,
}

/// Load and filter the metadata of one axis.
fn load_axis<S>(args: &AxisArgs, source: &S) -> Result<AxisMetadata, Report>
where
    S: InputSource,
{
    let mut filter = MetadataFilter {
        column: args.filter.to_string(),
        values: args.values.to_vec(),
        quantile: args.quantile,
        patterns: Vec::new(),
    };

    let Some(path) = args.metadata else {
        if filter.is_active() || args.value_regex.is_some() {
            warn!("No {} metadata, the {} filter is ignored.", args.axis, args.axis);
        }
        return Ok(AxisMetadata { table: Table::new(), column: None, ids: None });
    };

    let table = source.read_table(path)?;
    let (table, column) = load_metadata(table, args.column, args.name)?;

    if let Some(regex) = args.value_regex {
        filter.patterns = source.read_patterns(regex)?;
    }
    if !filter.applies_to(&table) {
        return Ok(AxisMetadata { table, column, ids: None });
    }

    let filtered = filter_metadata(&table, &filter)?;
    let ids: BTreeSet<String> = filtered.get_column(&args.name.to_string())?.into_iter().cloned().collect();
    debug!("{} {} features kept by the metadata filter.", ids.len(), args.name);
    Ok(AxisMetadata { table, column, ids: Some(ids) })
}

/// Attach a suggestion matching the kind of a pipeline failure.
fn suggest(report: Report) -> Report {
    match Error::kind_of(&report) {
        Some(ErrorKind::InputMissing) => report.suggestion("Check the input paths."),
        Some(ErrorKind::MalformedFilter) => {
            report.suggestion("Check the filter column, values and quantile of the metadata.")
        }
        Some(ErrorKind::OutputPathInvalid) => report.suggestion("Use an output path ending in '.html'."),
        _ => report,
    }
}

/// Explore a score matrix with the [`FileSource`], returning the path of the view.
pub fn run(args: &RunArgs) -> Result<PathBuf, Report> {
    run_with(args, &FileSource)
}

/// Explore a score matrix read from `source`, returning the path of the view.
///
/// The output path is validated before any input is read.
pub fn run_with<S>(args: &RunArgs, source: &S) -> Result<PathBuf, Report>
where
    S: InputSource,
{
    // ------------------------------------------------------------------------
    // Output

    let output = args.output_path();
    check_extension(&output, "html").map_err(suggest)?;

    // ------------------------------------------------------------------------
    // Inputs

    source.check_path(&args.ranks).map_err(suggest)?;
    let axes = [args.axis(Axis::Omic1), args.axis(Axis::Omic2)];
    let optional = [given(&args.tree_taxonomy)]
        .into_iter()
        .chain(axes.iter().flat_map(|a| [a.metadata, a.value_regex, a.subset]))
        .flatten();
    for path in optional {
        source.check_path(path).map_err(suggest)?;
    }
    if let Some(tree) = given(&args.tree_taxonomy) {
        warn!("The taxonomy tree is not used yet: {tree:?}");
    }
    if args.omic1_name == args.omic2_name {
        return Err(eyre!("Both omics are named '{}'.", args.omic1_name))
            .suggestion("Use --omic1-name and --omic2-name to give them different names.");
    }
    let reserved =
        [&args.omic1_name, &args.omic2_name].into_iter().find(|n| RESERVED_FIELDS.contains(&n.as_str()));
    if let Some(name) = reserved {
        return Err(eyre!("The omic name '{name}' is reserved for the ranked pair fields."))
            .suggestion(format!("Use an omic name other than: {}", RESERVED_FIELDS.join(", ")));
    }

    // ------------------------------------------------------------------------
    // Metadata

    let [omic1, omic2] = [
        load_axis(&axes[0], source).map_err(suggest)?,
        load_axis(&axes[1], source).map_err(suggest)?,
    ];

    // ------------------------------------------------------------------------
    // Matrix

    info!("Reading score matrix: {:?}", args.ranks);
    let table = source.read_table(&args.ranks)?;
    let mut matrix = ScoreMatrix::from_table(&table)?;
    info!("Score matrix: {:?} (rows, columns)", matrix.shape());
    for axis_args in &axes {
        if let Some(subset) = axis_args.subset {
            let patterns = source.read_patterns(subset)?;
            matrix = matrix.subset_by_patterns(axis_args.axis, &patterns)?;
        }
    }

    let long_form = reshape(
        &matrix,
        omic1.ids.as_ref(),
        omic2.ids.as_ref(),
        args.min_probability,
        &args.omic1_name,
        &args.omic2_name,
    )?;

    // ------------------------------------------------------------------------
    // Ranks and groups

    let long_form = annotate_ranks(long_form);
    let (long_form, _, _) = merge_groups(
        long_form,
        &omic1.table,
        &omic2.table,
        omic1.column.as_deref(),
        omic2.column.as_deref(),
    )?;

    // ------------------------------------------------------------------------
    // View

    let view = View::new(&long_form, args.view_params())?;

    // both artifacts are fully written before either is persisted
    let table = match &args.output_table {
        Some(path) => {
            let file = stage_file(path)?;
            view.long_form.to_table()?.write(&file.path(), b'\t')?;
            Some((file, path))
        }
        None => None,
    };
    let html = view.stage_html(&output)?;

    html.persist(&output).wrap_err_with(|| eyre!("Failed to persist view: {output:?}"))?;
    info!("Wrote view of {} pairs: {output:?}", view.long_form.pairs.len());
    if let Some((file, path)) = table {
        if let Err(e) = file.persist(path) {
            // the view must not outlive a failed run
            let _ = std::fs::remove_file(&output);
            return Err(e).wrap_err_with(|| eyre!("Failed to persist ranked pairs: {path:?}"));
        }
        info!("Wrote ranked pairs: {path:?}");
    }

    Ok(output)
}
