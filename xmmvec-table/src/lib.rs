//! Create and manipulate a row-based [`Table`].

use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::cmp::PartialEq;
use std::fmt::{Debug, Display};
use std::path::{Path, PathBuf};

/// A row-based [`Table`] of generic data.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Table<T> {
    /// Names of the table columns.
    pub headers: Vec<T>,
    /// Rows of table values.
    pub rows: Vec<Vec<T>>,
    /// Optional file path for where the table was read from.
    pub path: Option<PathBuf>,
}

impl<T> Default for Table<T>
where
    T: Clone + Display + Debug + PartialEq<T>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Table<T>
where
    T: Clone + Display + Debug + PartialEq<T>,
{
    /// Returns a new row-based [`Table`] with empty headers and rows.
    ///
    /// ## Examples
    ///
    /// ```
    /// let mut table = xmmvec_table::Table::new();
    /// table.headers = vec!["1", "2", "3"];
    /// table.add_row(vec!["A", "B", "C"])?;
    /// # assert_eq!(table.rows, vec![vec!["A", "B", "C"]]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    ///
    /// | 1 | 2 | 3 |
    /// |---|---|---|
    /// | A | B | C |
    pub fn new() -> Self {
        Table { headers: Vec::new(), rows: Vec::new(), path: None }
    }

    /// Returns true if the table has neither headers nor rows.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }

    /// Add a new row to the table.
    ///
    /// ## Arguments
    ///
    /// * `row` - A iterable object of new data (`T`) to add as a row.
    ///
    /// ## Examples
    ///
    /// ```
    /// let mut table = xmmvec_table::Table::new();
    /// table.headers = vec!["1", "2", "3"];
    /// table.add_row(["A", "B", "C"])?;
    /// table.add_row(["D", "E", "F"])?;
    /// assert!(table.add_row(["G"]).is_err());
    /// # assert_eq!(table.rows, [["A", "B", "C"], ["D", "E", "F"]]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    ///
    /// | 1 | 2 | 3 |
    /// |---|---|---|
    /// | A | B | C |
    /// | D | E | F |
    pub fn add_row<I>(&mut self, row: I) -> Result<(), Report>
    where
        I: IntoIterator<Item = T>,
    {
        let row = row.into_iter().collect::<Vec<T>>();
        // a row must line up with the headers, or with existing rows if headerless
        let ex = match (self.headers.is_empty(), self.rows.first()) {
            (false, _) => Some(self.headers.len()),
            (true, Some(first)) => Some(first.len()),
            (true, None) => None,
        };
        if let Some(ex) = ex {
            if ex != row.len() {
                return Err(eyre!(
                    "New row size ({}) does not match existing table ({ex}).",
                    row.len()
                ));
            }
        }
        self.rows.push(row);
        Ok(())
    }

    /// Returns a [`Vec`] of [`Table`] values under a header.
    ///
    /// ## Examples
    ///
    /// ```
    /// let mut table = xmmvec_table::Table::new();
    /// table.headers = vec!["1", "2", "3"];
    /// table.add_row(["A", "B", "C"])?;
    /// table.add_row(["D", "E", "F"])?;
    ///
    /// assert_eq!(table.get_column(&"1")?, [&"A", &"D"]);
    /// assert_eq!(table.get_column(&"3")?, [&"C", &"F"]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn get_column(&self, header: &T) -> Result<Vec<&T>, Report> {
        let header_i = self.get_header_index(header)?;
        let column = self.rows.iter().map(|row| &row[header_i]).collect();
        Ok(column)
    }

    /// Returns the column index (0-based) of the header in the [`Table`].
    ///
    /// # Examples
    ///
    /// ```
    /// let mut table = xmmvec_table::Table::new();
    /// table.headers = vec!["1", "2", "3"];
    ///
    /// assert_eq!(table.get_header_index(&"1")?, 0);
    /// assert_eq!(table.get_header_index(&"3")?, 2);
    /// assert!(table.get_header_index(&"4").is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn get_header_index(&self, header: &T) -> Result<usize, Report> {
        let pos =
            self.headers.iter().position(|h| h == header).ok_or_else(|| {
                eyre!("Column '{header}' was not found in table: {:?}.", self.path)
            })?;

        Ok(pos)
    }

    /// Rename a column header.
    ///
    /// ## Examples
    ///
    /// ```
    /// let mut table = xmmvec_table::Table::new();
    /// table.headers = vec!["1", "2", "3"];
    /// table.rename_header(&"1", "id")?;
    /// assert_eq!(table.headers, ["id", "2", "3"]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn rename_header(&mut self, header: &T, new: T) -> Result<(), Report> {
        let header_i = self.get_header_index(header)?;
        self.headers[header_i] = new;
        Ok(())
    }

    /// Returns a new [`Table`] with only the rows whose value under `header` satisfies `keep`.
    ///
    /// ## Examples
    ///
    /// ```
    /// let mut table = xmmvec_table::Table::new();
    /// table.headers = vec!["id", "color"];
    /// table.add_row(["A", "red"])?;
    /// table.add_row(["B", "blue"])?;
    ///
    /// let red = table.retain_rows(&"color", |v| *v == "red")?;
    /// assert_eq!(red.rows, [["A", "red"]]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn retain_rows<F>(&self, header: &T, mut keep: F) -> Result<Table<T>, Report>
    where
        F: FnMut(&T) -> bool,
    {
        let header_i = self.get_header_index(header)?;
        let rows = self.rows.iter().filter(|row| keep(&row[header_i])).cloned().collect_vec();
        Ok(Table { headers: self.headers.clone(), rows, path: self.path.clone() })
    }

    /// Returns a new [`Table`] with only the requested columns, in the requested order.
    ///
    /// ## Examples
    ///
    /// ```
    /// let mut table = xmmvec_table::Table::new();
    /// table.headers = vec!["id", "color", "size"];
    /// table.add_row(["A", "red", "3"])?;
    ///
    /// let selected = table.select(&["size", "id"])?;
    /// assert_eq!(selected.headers, ["size", "id"]);
    /// assert_eq!(selected.rows, [["3", "A"]]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn select(&self, headers: &[T]) -> Result<Table<T>, Report> {
        let indices =
            headers.iter().map(|h| self.get_header_index(h)).collect::<Result<Vec<_>, _>>()?;
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|i| row[*i].clone()).collect_vec())
            .collect_vec();
        Ok(Table { headers: headers.to_vec(), rows, path: self.path.clone() })
    }

    /// Write [`Table`] to file [`Path`].
    ///
    /// ## Examples
    ///
    /// ```
    /// use tempfile::NamedTempFile;
    ///
    /// let mut table = xmmvec_table::Table::new();
    /// table.headers = vec!["1", "2", "3"];
    /// table.add_row(["A", "B", "C"])?;
    ///
    /// let file = NamedTempFile::new()?;
    /// table.write(&file.path(), b'\t')?;
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn write<P>(&self, path: &P, delim: u8) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delim)
            .from_path(path)
            .wrap_err_with(|| eyre!("Unable to create file: {path:?}"))?;

        // write headers
        writer
            .write_record(self.headers.iter().map(|h| h.to_string()))
            .wrap_err_with(|| eyre!("Unable to write table headers: {path:?}"))?;

        // write regular rows
        self.rows.iter().try_for_each(|row| {
            writer
                .write_record(row.iter().map(|v| v.to_string()))
                .wrap_err_with(|| eyre!("Unable to write table row: {}", row.iter().join(",")))
        })?;

        writer.flush().wrap_err_with(|| eyre!("Unable to flush file: {path:?}"))?;
        Ok(())
    }

    /// Convert the first `n` rows of the table to markdown format.
    ///
    /// ## Examples
    ///
    /// ```
    /// let mut table = xmmvec_table::Table::new();
    /// table.headers = vec!["1", "2", "3"];
    /// table.add_row(["A", "B", "C"])?;
    ///
    /// let markdown = table.to_markdown(10);
    /// assert!(markdown.starts_with("| 1 | 2 | 3 |"));
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    /// | 1 | 2 | 3 |
    /// |---|---|---|
    /// | A | B | C |
    pub fn to_markdown(&self, n: usize) -> String {
        let rows = self.rows.iter().take(n).collect_vec();

        // get the maximum width of each column, +2 to add space on either side
        let col_widths = self
            .headers
            .iter()
            .enumerate()
            .map(|(col_i, header)| {
                rows.iter()
                    .filter_map(|row| row.get(col_i))
                    .map(|cell| cell.to_string().chars().count())
                    .chain(std::iter::once(header.to_string().chars().count()))
                    .max()
                    .unwrap_or_default()
                    + 2
            })
            .collect_vec();

        let format_line = |cells: Vec<String>| {
            let line = cells
                .iter()
                .zip(col_widths.iter())
                .map(|(cell, width)| format!("{cell:^width$}"))
                .join("|");
            format!("|{line}|")
        };

        let mut markdown = vec![
            format_line(self.headers.iter().map(|h| h.to_string()).collect()),
            format_line(col_widths.iter().map(|w| "-".repeat(*w)).collect()),
        ];
        markdown.extend(
            rows.iter().map(|row| format_line(row.iter().map(|v| v.to_string()).collect())),
        );
        markdown.join("\n")
    }
}

impl Table<String> {
    /// Read a delimited file into a [`Table`] of owned strings.
    ///
    /// The first line is used as headers. A header line that is exactly one field shorter
    /// than the rows (an unnamed index column) is padded with an empty first header.
    ///
    /// ## Examples
    ///
    /// ```
    /// use std::io::Write;
    /// use tempfile::NamedTempFile;
    ///
    /// let mut file = NamedTempFile::new()?;
    /// writeln!(file, "1\t2\t3\nA\tB\tC")?;
    /// let table = xmmvec_table::Table::read(&file.path(), b'\t')?;
    /// assert_eq!(table.headers, ["1", "2", "3"]);
    /// assert_eq!(table.rows, [["A", "B", "C"]]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn read<P>(path: &P, delim: u8) -> Result<Table<String>, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delim)
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .wrap_err_with(|| eyre!("Failed to read file: {path:?}"))?;

        let mut table = Table::new();
        for (i, record) in reader.records().enumerate() {
            let record = record.wrap_err_with(|| eyre!("Failed to parse line {i} of {path:?}"))?;
            let row = record.iter().map(String::from).collect_vec();
            // if headers are empty, this is the first line, write headers
            if i == 0 {
                table.headers = row;
                continue;
            }
            if i == 1 && row.len() == table.headers.len() + 1 {
                table.headers.insert(0, String::new());
            }
            table
                .add_row(row)
                .wrap_err_with(|| eyre!("Malformed line {i} of {path:?}"))?;
        }

        table.path = Some(path.as_ref().to_path_buf());
        Ok(table)
    }
}
