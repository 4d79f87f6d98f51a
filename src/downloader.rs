#![cfg(not(tarpaulin_include))]

use crate::table::Table;
use std::error::Error;

/// Convert a table to CSV format
///
/// The header row holds the column names; values containing commas, quotes or
/// newlines are quoted with inner quotes doubled. Output starts with a UTF-8 byte
/// order mark so spreadsheet programs detect the Korean headers correctly.
///
/// # Examples
/// ```
/// use pvd_search::table::Table;
/// use pvd_search::downloader::to_csv;
///
/// let table = Table::new("raw", vec!["자재번호".into()], vec![vec!["1-02-A".into()]]);
/// assert!(to_csv(&table).ends_with("자재번호\n1-02-A\n"));
/// ```
pub fn to_csv(table: &Table) -> String {
    let mut csv_content = String::from("\u{feff}");

    push_csv_line(&mut csv_content, table.columns());
    for row in table.rows() {
        push_csv_line(&mut csv_content, row.cells());
    }

    csv_content
}

fn push_csv_line(out: &mut String, values: &[String]) {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if value.contains([',', '"', '\n', '\r']) {
            let escaped = value.replace('"', "\"\"");
            out.push_str(&format!("\"{}\"", escaped));
        } else {
            out.push_str(value);
        }
    }
    out.push('\n');
}

/// Convert a table to XLSX format
///
/// Writes one worksheet named after the table, header in the first row, every
/// value as a string cell.
pub fn to_xlsx(table: &Table) -> Result<Vec<u8>, Box<dyn Error>> {
    use rust_xlsxwriter::{Format, Workbook, Worksheet};

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name(table.name())?;

    let bold = Format::new().set_bold();
    for (c, name) in table.columns().iter().enumerate() {
        worksheet.write_string_with_format(0, col_index(c)?, name, &bold)?;
    }

    for (r, row) in table.rows().iter().enumerate() {
        let r = u32::try_from(r + 1)?;
        for (c, value) in row.cells().iter().enumerate() {
            if !value.is_empty() {
                worksheet.write_string(r, col_index(c)?, value)?;
            }
        }
    }

    workbook.push_worksheet(worksheet);

    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}

fn col_index(c: usize) -> Result<u16, Box<dyn Error>> {
    Ok(u16::try_from(c)?)
}
