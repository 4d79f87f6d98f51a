use serde::Serialize;
use std::cmp::Ordering;

use crate::error::Result;
use crate::table::Subset;

/// Order `subset` ascending by each key column in turn.
///
/// Comparison is lexicographic on the cell string. The sort is stable, so rows
/// with equal keys keep their relative order.
pub fn sort<'a, S: AsRef<str>>(subset: Subset<'a>, keys: &[S]) -> Result<Subset<'a>> {
    let table = subset.table();
    let cols = keys
        .iter()
        .map(|k| table.column_index(k.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    let mut rows = subset.into_indices();
    rows.sort_by(|&a, &b| {
        let (ra, rb) = (&table.rows()[a], &table.rows()[b]);
        cols.iter()
            .map(|&c| ra.get(c).cmp(rb.get(c)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });

    Ok(Subset::new(table, rows))
}

/// A run of consecutive rows sharing one group-header value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GroupSpan {
    pub key: String,
    /// Offset of the first row of the run within the subset.
    pub start: usize,
    pub len: usize,
}

/// Collapse consecutive equal values of `column` into spans.
///
/// Only adjacent rows are merged; nothing is reordered, so a value that appears
/// in two separate runs yields two spans.
pub fn group_spans(subset: &Subset<'_>, column: &str) -> Result<Vec<GroupSpan>> {
    let mut spans: Vec<GroupSpan> = Vec::new();
    for (offset, value) in subset.column_values(column)?.into_iter().enumerate() {
        match spans.last_mut() {
            Some(last) if last.key == value => last.len += 1,
            _ => spans.push(GroupSpan {
                key: value.to_string(),
                start: offset,
                len: 1,
            }),
        }
    }
    Ok(spans)
}
