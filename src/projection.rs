use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::table::{Subset, Table};

/// Restrict `subset` to `columns`, in that order.
///
/// The result is a new table with the source table's name, so projecting it again
/// with the same column list returns an equal table.
pub fn project<S: AsRef<str>>(subset: &Subset<'_>, columns: &[S]) -> Result<Table> {
    let table = subset.table();
    let cols = columns
        .iter()
        .map(|c| table.column_index(c.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    let rows = subset
        .iter()
        .map(|row| cols.iter().map(|&c| row.get(c).to_string()).collect())
        .collect();
    let names = columns.iter().map(|c| c.as_ref().to_string()).collect();

    Ok(Table::new(table.name(), names, rows))
}

/// Pixel width heuristic for grid columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidthPolicy {
    pub px_per_char: u32,
    pub margin: u32,
    pub min_px: u32,
    pub max_px: u32,
}

impl Default for WidthPolicy {
    fn default() -> Self {
        WidthPolicy {
            px_per_char: 9,
            margin: 24,
            min_px: 80,
            max_px: 360,
        }
    }
}

impl WidthPolicy {
    /// `clamp(chars * px_per_char + margin, min_px, max_px)`
    pub fn width_for(&self, chars: usize) -> u32 {
        let chars = u32::try_from(chars).unwrap_or(u32::MAX);
        chars
            .saturating_mul(self.px_per_char)
            .saturating_add(self.margin)
            .clamp(self.min_px, self.max_px.max(self.min_px))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ColumnHint {
    pub name: String,
    pub width: u32,
}

/// One width hint per column, from the longest of the header and every cell.
pub fn width_hints(table: &Table, policy: &WidthPolicy) -> Vec<ColumnHint> {
    table
        .columns()
        .iter()
        .enumerate()
        .map(|(c, name)| {
            let longest = table
                .rows()
                .iter()
                .map(|row| row.get(c).chars().count())
                .max()
                .unwrap_or(0)
                .max(name.chars().count());
            ColumnHint {
                name: name.clone(),
                width: policy.width_for(longest),
            }
        })
        .collect()
}

/// One page of an ordered result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<'a> {
    /// 1-based page number actually served.
    pub number: usize,
    pub page_count: usize,
    pub total: usize,
    pub rows: Subset<'a>,
}

/// Slice `subset` into pages of `page_size` and return page `page` (1-based).
///
/// Page 0 is treated as page 1 and pages past the end clamp to the last page.
/// An empty subset has a single empty page.
pub fn paginate<'a>(subset: &Subset<'a>, page: usize, page_size: usize) -> Page<'a> {
    let page_size = page_size.max(1);
    let total = subset.len();
    let page_count = total.div_ceil(page_size).max(1);
    let number = page.clamp(1, page_count);
    let start = (number - 1) * page_size;
    let end = (start + page_size).min(total);

    Page {
        number,
        page_count,
        total,
        rows: Subset::new(subset.table(), subset.indices()[start..end].to_vec()),
    }
}
