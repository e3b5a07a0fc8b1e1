//! Interactive view of a ranked [`LongForm`], rendered as a Vega-Lite page.


use crate::long_form::{LongForm, Measure, MEASURE_FIELD, VALUE_FIELD};
use crate::matrix::Axis;
use crate::rank::cap_ranks;
use crate::utils::stage_file;
use crate::Error;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use indoc::formatdoc;
use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::Debug;
use std::io::Write;
use std::path::Path;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use tempfile::NamedTempFile;

/// Vega-Lite schema the specification is written against.
pub const SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";
/// Size in pixels of one matrix cell.
const CELL_SIZE: usize = 10;
/// Thickness in pixels of the marginal bar panels.
const BAR_PANEL_SIZE: usize = 50;

// ----------------------------------------------------------------------------
// Palette

/// Named color schemes of the matrix panel.
#[derive(Clone, Copy, Debug, Default, Deserialize, Display, EnumIter, EnumString, Eq, PartialEq, Serialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[cfg_attr(feature = "cli", value(rename_all = "lower"))]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    Blues,
    Greens,
    Oranges,
    Reds,
    Purples,
    Greys,
    Viridis,
    Magma,
    Inferno,
    Plasma,
    BlueGreen,
    BluePurple,
    GreenBlue,
    OrangeRed,
    PurpleBlueGreen,
    PurpleBlue,
    PurpleRed,
    RedPurple,
    YellowGreenBlue,
    YellowGreen,
    YellowOrangeBrown,
    YellowOrangeRed,
    BlueOrange,
    BrownBlueGreen,
    PurpleGreen,
    PinkYellowGreen,
    PurpleOrange,
    RedBlue,
    RedGrey,
    RedYellowBlue,
    RedYellowGreen,
    Spectral,
    #[default]
    Rainbow,
    Sinebow,
}

// ----------------------------------------------------------------------------
// View Parameters

/// Display parameters of a [`View`].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ViewParams {
    pub palette: Palette,
    /// Color of the top-hits labels.
    pub top_color: String,
    /// Requested initial rank cutoff, on both axes.
    pub pair_number: usize,
    /// Static per-feature rank cap on omic1, 0 for none.
    pub max_omic1: usize,
    /// Static per-feature rank cap on omic2, 0 for none.
    pub max_omic2: usize,
}

impl Default for ViewParams {
    fn default() -> Self {
        ViewParams {
            palette: Palette::default(),
            top_color: "black".to_string(),
            pair_number: 10,
            max_omic1: 50,
            max_omic2: 50,
        }
    }
}

// ----------------------------------------------------------------------------
// View

/// Everything needed to render the interactive view.
#[derive(Clone, Debug, PartialEq)]
pub struct View {
    /// Ranked pairs, after the static rank caps.
    pub long_form: LongForm,
    pub params: ViewParams,
    /// Highest per-feature rank on each axis, `[omic1, omic2]`.
    pub max_rank: [usize; 2],
    /// Initial interactive rank cutoff on each axis, `[omic1, omic2]`.
    pub cutoff: [usize; 2],
    /// Display order of the feature identifiers on each axis, `[omic1, omic2]`.
    pub order: [Vec<String>; 2],
}

/// Position of an axis in the per-axis arrays of a [`View`].
fn slot(axis: Axis) -> usize {
    match axis {
        Axis::Omic1 => 0,
        Axis::Omic2 => 1,
    }
}

/// Escape the characters Vega-Lite reads as nested field access.
///
/// ## Examples
///
/// ```rust
/// use xmmvec::view::escape_field;
/// assert_eq!(escape_field("taxa: g.[x]"), "taxa: g\\.\\[x\\]");
/// ```
pub fn escape_field(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '.' | '[' | ']' | '\\' => format!("\\{c}"),
            c => c.to_string(),
        })
        .collect()
}

/// Reference a record field inside a Vega expression.
fn datum(name: &str) -> String {
    format!("datum[{}]", Value::from(name))
}

impl View {
    /// Prepare a view: apply the static caps, then derive cutoffs and axis orders.
    pub fn new(long_form: &LongForm, params: ViewParams) -> Result<View, Report> {
        let long_form = cap_ranks(long_form, params.max_omic1, params.max_omic2);
        if long_form.pairs.is_empty() {
            return Err(Error::EmptyResult { reason: "no pairs left to display".to_string() }.into());
        }

        let max_rank = [long_form.max_rank(Axis::Omic1), long_form.max_rank(Axis::Omic2)];
        let cutoff = max_rank.map(|max| params.pair_number.min(max).max(1));
        let order = [axis_order(&long_form, Axis::Omic1), axis_order(&long_form, Axis::Omic2)];
        debug!("Maximum ranks: {max_rank:?}, initial cutoffs: {cutoff:?}");

        Ok(View { long_form, params, max_rank, cutoff, order })
    }

    /// Build the Vega-Lite specification.
    pub fn to_vega_lite(&self) -> Value {
        let key_columns = self.long_form.key_columns();
        let values = self.long_form.stack().iter().map(|row| row.to_record(&key_columns)).collect_vec();

        json!({
            "$schema": SCHEMA,
            "data": { "values": values },
            "params": self.params(),
            "vconcat": [
                { "hconcat": [self.matrix_panel(), self.bar_panel(Axis::Omic2)] },
                self.bar_panel(Axis::Omic1),
            ],
            "resolve": { "legend": { "color": "independent", "size": "independent" } },
            "config": {
                "axis": { "labelLimit": 300, "labelFontSize": 6 },
                "legend": { "labelLimit": 1000, "labelFontSize": 6, "titleFontSize": 6, "symbolSize": 10 },
            },
        })
    }

    /// Interactive controls shared by every panel.
    fn params(&self) -> Value {
        let (omic1, omic2) = (&self.long_form.omic1, &self.long_form.omic2);
        let measures = Measure::iter().map(|m| m.to_string()).collect_vec();
        let labels = Measure::iter().map(|m| m.label(omic1, omic2)).collect_vec();

        let mut params = vec![json!({
            "name": "conditional",
            "value": Measure::RawScore.to_string(),
            "bind": { "input": "radio", "options": measures, "labels": labels, "name": "Conditional " },
        })];
        for (axis, partner) in [(Axis::Omic1, omic2), (Axis::Omic2, omic1)] {
            let i = slot(axis);
            let name = self.long_form.axis_name(axis);
            params.push(json!({
                "name": format!("cutoff_{axis}"),
                "value": self.cutoff[i],
                "bind": {
                    "input": "range", "min": 1, "max": self.max_rank[i], "step": 1,
                    "name": format!("max. rank of {partner} per each {name}: "),
                },
            }));
        }
        for (axis, partner) in [(Axis::Omic1, omic2), (Axis::Omic2, omic1)] {
            let i = slot(axis);
            let name = self.long_form.axis_name(axis);
            params.push(json!({
                "name": format!("label_{axis}"),
                "value": 0,
                "bind": {
                    "input": "range", "min": 0, "max": self.max_rank[i], "step": 1,
                    "name": format!("label top {partner} per each {name}: "),
                },
            }));
        }
        Value::Array(params)
    }

    /// Filter expression keeping the pairs within both rank cutoffs.
    fn cutoff_filter(prefix: &str) -> Value {
        let omic1 = datum(Measure::PerOmic1Rank.as_ref());
        let omic2 = datum(Measure::PerOmic2Rank.as_ref());
        json!({ "filter": format!("{omic1} <= {prefix}_omic1 && {omic2} <= {prefix}_omic2") })
    }

    /// Filter keeping the rows whose measure equals the Vega expression `measure`.
    fn measure_filter(measure: &str) -> Value {
        json!({ "filter": format!("{} == {measure}", datum(MEASURE_FIELD)) })
    }

    /// Positional encoding of an axis.
    fn position(&self, axis: Axis, kind: &str, axis_props: Value) -> Value {
        json!({
            "field": escape_field(self.long_form.axis_name(axis)),
            "type": kind,
            "sort": self.order[slot(axis)],
            "axis": axis_props,
        })
    }

    /// The matrix panel: colored cells plus the top-hits labels.
    fn matrix_panel(&self) -> Value {
        let (omic1, omic2) = (&self.long_form.omic1, &self.long_form.omic2);
        let label_props = json!({ "labelOverlap": false, "labelFontSize": 8, "titleFontSize": 6 });
        let mut x_props = label_props.clone();
        x_props["orient"] = json!("top");
        x_props["labelAngle"] = json!(45);

        let tooltip = [omic1.as_str(), omic2.as_str(), MEASURE_FIELD, VALUE_FIELD]
            .into_iter()
            .chain([Measure::PerOmic1Rank.as_ref(), Measure::PerOmic2Rank.as_ref()])
            .map(|field| json!({ "field": escape_field(field) }))
            .collect_vec();

        json!({
            "name": "matrix",
            "width": self.order[0].len() * CELL_SIZE,
            "height": self.order[1].len() * CELL_SIZE,
            "transform": [
                View::measure_filter("conditional"),
                { "filter": { "param": "highlight_omic1" } },
                { "filter": { "param": "highlight_omic2" } },
                View::cutoff_filter("cutoff"),
            ],
            "encoding": {
                "x": self.position(Axis::Omic1, "ordinal", x_props),
                "y": self.position(Axis::Omic2, "ordinal", label_props),
            },
            "layer": [
                {
                    "mark": "rect",
                    "encoding": {
                        "color": {
                            "field": VALUE_FIELD,
                            "type": "quantitative",
                            "scale": { "scheme": self.params.palette.to_string() },
                            "legend": { "orient": "left" },
                        },
                        "tooltip": tooltip,
                    },
                },
                {
                    "mark": { "type": "text", "color": self.params.top_color, "fontSize": 6 },
                    "transform": [View::cutoff_filter("label")],
                    "encoding": {
                        "text": { "field": VALUE_FIELD, "type": "quantitative", "format": ".2~f" },
                    },
                },
            ],
        })
    }

    /// Marginal panel of mean values per feature along an axis.
    fn bar_panel(&self, axis: Axis) -> Value {
        let name = self.long_form.axis_name(axis);
        let field = escape_field(name);
        let highlight = format!("highlight_{axis}");
        let rank_field = match axis {
            Axis::Omic1 => Measure::PerOmic1Rank,
            Axis::Omic2 => Measure::PerOmic2Rank,
        };

        let mean = json!({ "aggregate": "mean", "field": VALUE_FIELD, "type": "quantitative", "axis": { "titleFontSize": 6 } });
        let (x, y, width, height) = match axis {
            Axis::Omic1 => {
                let x = self.position(axis, "nominal", Value::Null);
                (x, mean, self.order[0].len() * CELL_SIZE, BAR_PANEL_SIZE)
            }
            Axis::Omic2 => {
                let mut x = mean;
                x["axis"]["orient"] = json!("top");
                let y = self.position(axis, "nominal", Value::Null);
                (x, y, BAR_PANEL_SIZE, self.order[1].len() * CELL_SIZE)
            }
        };

        let color = match self.long_form.group_index(axis) {
            Some(i) => json!({
                "condition": {
                    "param": highlight,
                    "field": escape_field(&self.long_form.groups[i].name),
                    "type": "nominal",
                },
                "value": "grey",
            }),
            None => json!({ "condition": { "param": highlight, "value": "steelblue" }, "value": "grey" }),
        };

        json!({
            "name": format!("bars_{axis}"),
            "width": width,
            "height": height,
            "params": [{
                "name": highlight,
                "select": { "type": "point", "fields": [field], "toggle": true },
            }],
            "transform": [
                View::measure_filter(&Value::from(Measure::RawScore.as_ref()).to_string()),
                View::cutoff_filter("cutoff"),
            ],
            "mark": "bar",
            "encoding": {
                "x": x,
                "y": y,
                "color": color,
                "tooltip": [
                    { "field": field, "type": "nominal" },
                    { "aggregate": "mean", "field": VALUE_FIELD, "type": "quantitative" },
                    { "aggregate": "stdev", "field": VALUE_FIELD, "type": "quantitative" },
                    { "aggregate": "min", "field": rank_field.as_ref(), "type": "quantitative" },
                ],
            },
        })
    }

    /// Render the self-contained HTML page.
    pub fn to_html(&self) -> Result<String, Report> {
        let spec = serde_json::to_string(&self.to_vega_lite()).wrap_err("Failed to serialize the view.")?;
        // a literal "</" would close the script element early
        let spec = spec.replace("</", "<\\/");
        let title = format!("{} - {}", self.long_form.omic1, self.long_form.omic2);

        let html = formatdoc!(
            r##"
            <!DOCTYPE html>
            <html>
            <head>
              <meta charset="utf-8">
              <title>{title}</title>
              <script src="https://cdn.jsdelivr.net/npm/vega@5"></script>
              <script src="https://cdn.jsdelivr.net/npm/vega-lite@5"></script>
              <script src="https://cdn.jsdelivr.net/npm/vega-embed@6"></script>
            </head>
            <body>
              <div id="vis"></div>
              <script type="text/javascript">
                vegaEmbed("#vis", {spec}).catch(console.error);
              </script>
            </body>
            </html>
            "##,
            title = html_escape(&title),
        );
        Ok(html)
    }

    /// Write the HTML page into a temporary file next to `path`, for the caller to persist.
    pub fn stage_html<P>(&self, path: &P) -> Result<NamedTempFile, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let html = self.to_html()?;
        let mut file = stage_file(path)?;
        file.write_all(html.as_bytes()).wrap_err_with(|| eyre!("Failed to write view: {path:?}"))?;
        Ok(file)
    }

    /// Write the HTML page atomically: a failed write leaves no file at `path`.
    pub fn write_html<P>(&self, path: &P) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
    {
        let path = path.as_ref();
        self.stage_html(&path)?
            .persist(path)
            .wrap_err_with(|| eyre!("Failed to persist view: {path:?}"))?;
        info!("Wrote view of {} pairs: {path:?}", self.long_form.pairs.len());
        Ok(())
    }
}

/// Escape the characters with a meaning in HTML text.
fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Order the identifiers of an axis for display.
///
/// With a group column, groups come in first-seen order and identifiers are sorted
/// within each group. Otherwise identifiers are sorted.
fn axis_order(long_form: &LongForm, axis: Axis) -> Vec<String> {
    let Some(i) = long_form.group_index(axis) else {
        return long_form.pairs.iter().map(|p| p.id(axis).to_string()).sorted().dedup().collect();
    };

    let groups = long_form.pairs.iter().map(|p| &p.groups[i]).unique().collect_vec();
    groups
        .into_iter()
        .flat_map(|group| {
            long_form
                .pairs
                .iter()
                .filter(|p| &p.groups[i] == group)
                .map(|p| p.id(axis).to_string())
                .sorted()
                .dedup()
        })
        .unique()
        .collect()
}
