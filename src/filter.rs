use crate::error::Result;
use crate::table::{Row, Subset};

/// Dropdown value meaning "no restriction".
pub const ANY: &str = "전체";

/// True when a constraint value should not restrict anything: the sentinel or a
/// blank value. Any other text, `ALL` included, is matched literally.
pub fn is_any(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == ANY
}

/// Exact-match column constraints, applied in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Constraints {
    items: Vec<(String, String)>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(column, value);
        self
    }

    /// Set the constraint on `column`, replacing an earlier value for it.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.items.iter_mut().find(|(c, _)| *c == column) {
            Some(item) => item.1 = value,
            None => self.items.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    /// Constraints that actually restrict rows.
    pub fn active(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items
            .iter()
            .filter(|(_, v)| !is_any(v))
            .map(|(c, v)| (c.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.active().next().is_none()
    }
}

/// Lower-cased whitespace-separated keywords of a free-text query.
pub fn keywords(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|word| word.to_lowercase())
        .collect()
}

/// A row matches when every keyword occurs somewhere in its cached haystack.
pub fn row_matches(row: &Row, keywords: &[String]) -> bool {
    keywords.iter().all(|k| row.haystack().contains(k.as_str()))
}

/// Rows of `subset` that satisfy every active constraint and every query keyword.
///
/// Constraints run first as exact matches on their column. An empty query keeps
/// every row that passed the constraints. Source order is preserved. The only
/// failure is a constraint on a column the table does not have.
pub fn filter<'a>(subset: &Subset<'a>, query: &str, constraints: &Constraints) -> Result<Subset<'a>> {
    let table = subset.table();
    let active: Vec<(usize, &str)> = constraints
        .active()
        .map(|(column, value)| table.column_index(column).map(|col| (col, value)))
        .collect::<Result<_>>()?;
    let keywords = keywords(query);

    let rows = subset
        .indices()
        .iter()
        .copied()
        .filter(|&i| {
            let Some(row) = table.row(i) else {
                return false;
            };
            active.iter().all(|&(col, value)| row.get(col) == value) && row_matches(row, &keywords)
        })
        .collect();

    Ok(Subset::new(table, rows))
}
