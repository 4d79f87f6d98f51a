use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ptr;

use crate::error::{Result, SearchError};

/// One row of a sheet.
///
/// Cells are always strings; blank or missing cells are stored as `""` so text
/// search never has to deal with absent values. `haystack` is the lower-cased,
/// space-joined concatenation of every cell, computed once when the row is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    cells: Vec<String>,
    haystack: String,
}

impl Row {
    fn new(cells: Vec<String>) -> Self {
        let haystack = cells.join(" ").to_lowercase();
        Row { cells, haystack }
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    /// Value of the cell at `col`, or `""` when the index is out of range.
    pub fn get(&self, col: usize) -> &str {
        self.cells.get(col).map(String::as_str).unwrap_or("")
    }

    pub fn haystack(&self) -> &str {
        &self.haystack
    }
}

/// An ordered sequence of uniformly shaped rows with named columns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Row>,
}

/// Plain serializable form of a [`Table`], used by the snapshot cache.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableData {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table from a header row and raw data rows.
    ///
    /// Header names are trimmed; blank headers become `Unnamed: <index>` and repeated
    /// headers get a `.1`, `.2`, ... suffix so every column name is unique. Data rows
    /// are padded with `""` or truncated to the header width.
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let columns = normalize_headers(columns);
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut cells| {
                cells.resize(width, String::new());
                Row::new(cells)
            })
            .collect();

        Table {
            name: name.into(),
            columns,
            rows,
        }
    }

    pub fn from_data(data: TableData) -> Self {
        Table::new(data.name, data.columns, data.rows)
    }

    pub fn to_data(&self) -> TableData {
        TableData {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows: self.rows.iter().map(|r| r.cells.clone()).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, idx: usize) -> Option<&Row> {
        self.rows.get(idx)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| SearchError::UnknownColumn {
                table: self.name.clone(),
                column: name.to_string(),
            })
    }

    /// Every row, in source order.
    pub fn all(&self) -> Subset<'_> {
        Subset {
            table: self,
            rows: (0..self.rows.len()).collect(),
        }
    }
}

fn normalize_headers(columns: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    columns
        .into_iter()
        .enumerate()
        .map(|(i, raw)| {
            let base = match raw.trim() {
                "" => format!("Unnamed: {}", i),
                name => name.to_string(),
            };
            let mut name = base.clone();
            let mut n = 1;
            while !seen.insert(name.clone()) {
                name = format!("{}.{}", base, n);
                n += 1;
            }
            name
        })
        .collect()
}

/// A selection of rows from one table, in display order.
///
/// Holds row indices into the source table; the rows themselves are never copied.
#[derive(Clone, Debug)]
pub struct Subset<'a> {
    table: &'a Table,
    rows: Vec<usize>,
}

impl<'a> Subset<'a> {
    /// Indices must be valid for `table`; out-of-range entries are dropped.
    pub fn new(table: &'a Table, rows: Vec<usize>) -> Self {
        let rows = rows.into_iter().filter(|&i| i < table.len()).collect();
        Subset { table, rows }
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    pub fn indices(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Row> + '_ {
        let table = self.table;
        self.rows.iter().map(move |&i| &table.rows[i])
    }

    /// Values of one column, in subset order.
    pub fn column_values(&self, column: &str) -> Result<Vec<&'a str>> {
        let col = self.table.column_index(column)?;
        Ok(self.iter().map(|row| row.get(col)).collect())
    }

    pub(crate) fn into_indices(self) -> Vec<usize> {
        self.rows
    }
}

impl PartialEq for Subset<'_> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.table, other.table) && self.rows == other.rows
    }
}

impl Eq for Subset<'_> {}

/// The two sheets of the workbook.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tables {
    /// Raw per-material records, keyed by material number.
    pub records: Table,
    /// Grade/coating reference rows; grade is not unique across alloys.
    pub grades: Table,
}
