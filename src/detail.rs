use serde::Serialize;

use crate::error::{Result, SearchError};
use crate::table::{Row, Table};

/// Look up the first row of the full `table` whose `key_column` equals `key`.
///
/// Always searches the whole source table, never a filtered subset, so the detail
/// shows every attribute. When the key is not unique the first row in source order
/// wins; [`match_count`] tells callers whether that happened.
pub fn resolve_detail<'a>(table: &'a Table, key_column: &str, key: &str) -> Result<&'a Row> {
    let col = table.column_index(key_column)?;
    table
        .rows()
        .iter()
        .find(|row| row.get(col) == key)
        .ok_or_else(|| SearchError::NotFound {
            table: table.name().to_string(),
            key: key.to_string(),
        })
}

/// Number of rows whose `key_column` equals `key`.
pub fn match_count(table: &Table, key_column: &str, key: &str) -> Result<usize> {
    let col = table.column_index(key_column)?;
    Ok(table.rows().iter().filter(|row| row.get(col) == key).count())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub value: String,
}

/// Every column of `row` as name/value pairs.
///
/// Columns named in `preferred` come first in that order (names the table lacks
/// are skipped); the rest follow in source order.
pub fn detail_fields<S: AsRef<str>>(table: &Table, row: &Row, preferred: &[S]) -> Vec<Field> {
    let columns = table.columns();
    let mut order: Vec<usize> = Vec::with_capacity(columns.len());
    let named = preferred
        .iter()
        .filter_map(|p| columns.iter().position(|c| c == p.as_ref()));
    for c in named.chain(0..columns.len()) {
        if !order.contains(&c) {
            order.push(c);
        }
    }

    order
        .into_iter()
        .map(|c| Field {
            name: columns[c].clone(),
            value: row.get(c).to_string(),
        })
        .collect()
}
