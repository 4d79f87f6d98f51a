#![cfg(not(tarpaulin_include))]

use calamine::{Data, Reader, open_workbook_auto};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SearchError};
use crate::table::{Table, Tables};

/// Sheet holding the per-material records in the process workbook.
pub const DEFAULT_RECORDS_SHEET: &str = "raw";
/// Sheet holding the grade/coating reference table.
pub const DEFAULT_GRADES_SHEET: &str = "참조표2";

/// Where the two tables come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataSource {
    /// One workbook with two named sheets.
    Workbook {
        path: PathBuf,
        records_sheet: String,
        grades_sheet: String,
    },
    /// One CSV file per sheet.
    Csv { records: PathBuf, grades: PathBuf },
}

impl DataSource {
    pub fn workbook(path: impl Into<PathBuf>) -> Self {
        DataSource::Workbook {
            path: path.into(),
            records_sheet: DEFAULT_RECORDS_SHEET.to_string(),
            grades_sheet: DEFAULT_GRADES_SHEET.to_string(),
        }
    }

    /// Files read by this source.
    pub fn paths(&self) -> Vec<&Path> {
        match self {
            DataSource::Workbook { path, .. } => vec![path.as_path()],
            DataSource::Csv { records, grades } => vec![records.as_path(), grades.as_path()],
        }
    }

    pub fn describe(&self) -> String {
        match self {
            DataSource::Workbook {
                path,
                records_sheet,
                grades_sheet,
            } => format!(
                "{} [{}, {}]",
                path.display(),
                records_sheet,
                grades_sheet
            ),
            DataSource::Csv { records, grades } => {
                format!("{} + {}", records.display(), grades.display())
            }
        }
    }
}

/// Read both tables from `source`.
///
/// Any missing file, missing sheet or sheet without a header row is reported as
/// [`SearchError::DataUnavailable`].
pub fn load_tables(source: &DataSource) -> Result<Tables> {
    let (records, grades) = match source {
        DataSource::Workbook {
            path,
            records_sheet,
            grades_sheet,
        } => (
            load_table(path, records_sheet)?,
            load_table(path, grades_sheet)?,
        ),
        DataSource::Csv { records, grades } => (
            load_table(records, DEFAULT_RECORDS_SHEET)?,
            load_table(grades, DEFAULT_GRADES_SHEET)?,
        ),
    };

    debug!(
        "loaded {} records and {} grade rows from {}",
        records.len(),
        grades.len(),
        source.describe()
    );

    Ok(Tables { records, grades })
}

/// Detect file type and load the appropriate format
///
/// Workbooks are read through calamine and `sheet` selects the worksheet. A CSV
/// file holds exactly one sheet, so `sheet` only names the resulting table.
pub fn load_table(filepath: impl AsRef<Path>, sheet: &str) -> Result<Table> {
    let path = filepath.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("csv") => from_csv(path, sheet),
        Some("xlsx") | Some("xlsm") | Some("xls") | Some("ods") => from_excel(path, sheet),
        Some(ext) => Err(SearchError::unavailable(
            path,
            format!("unsupported file extension: {}", ext),
        )),
        None => Err(SearchError::unavailable(path, "file has no extension")),
    }
}

/// Load one worksheet of an Excel/ODS workbook as a [`Table`]
///
/// The first row is the header. Every cell is converted to its display string and
/// empty cells become `""`. Rows whose cells are all blank are skipped.
pub fn from_excel(filepath: impl AsRef<Path>, sheet: &str) -> Result<Table> {
    let path = filepath.as_ref();
    let mut workbook = open_workbook_auto(path).map_err(|e| SearchError::unavailable(path, e))?;

    if !workbook.sheet_names().iter().any(|name| name == sheet) {
        return Err(SearchError::unavailable(
            path,
            format!("sheet '{}' not found", sheet),
        ));
    }

    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| SearchError::unavailable(path, e))?;

    let mut rows = range.rows();
    let header: Vec<String> = match rows.next() {
        Some(cells) => cells.iter().map(cell_to_string).collect(),
        None => {
            return Err(SearchError::unavailable(
                path,
                format!("sheet '{}' is empty", sheet),
            ));
        }
    };

    let data: Vec<Vec<String>> = rows
        .map(|cells| cells.iter().map(cell_to_string).collect::<Vec<_>>())
        .filter(|cells| cells.iter().any(|c| !c.trim().is_empty()))
        .collect();

    Ok(Table::new(sheet, header, data))
}

/// Display string for one workbook cell.
///
/// Whole floats are written without a fractional part so that numeric material
/// numbers and counts search the same way they read on screen.
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Error(e) => {
            warn!("cell error value {:?} read as blank", e);
            String::new()
        }
        other => other.to_string(),
    }
}

/// Load a CSV file as a [`Table`]
///
/// The first record is the header. Quoted fields may hold commas, doubled quotes
/// and line breaks; a UTF-8 byte order mark is stripped. Blank lines are skipped.
pub fn from_csv(filepath: impl AsRef<Path>, name: &str) -> Result<Table> {
    let path = filepath.as_ref();
    let text = fs::read_to_string(path).map_err(|e| SearchError::unavailable(path, e))?;

    let mut records = parse_csv(text.trim_start_matches('\u{feff}'))
        .into_iter()
        .filter(|record| !record.is_blank());
    let header = match records.next() {
        Some(record) => record.fields,
        None => return Err(SearchError::unavailable(path, "CSV file is empty")),
    };

    let width = header.len();
    let rows: Vec<Vec<String>> = records
        .map(|record| {
            if record.fields.len() != width {
                warn!(
                    "{}: line {} has {} fields, expected {}",
                    path.display(),
                    record.line,
                    record.fields.len(),
                    width
                );
            }
            record.fields
        })
        .collect();

    Ok(Table::new(name, header, rows))
}

/// One CSV record and the line it starts on.
struct CsvRecord {
    line: usize,
    fields: Vec<String>,
}

impl CsvRecord {
    fn is_blank(&self) -> bool {
        self.fields.len() == 1 && self.fields[0].trim().is_empty()
    }
}

// Split CSV text into records; a line break inside quotes stays in the field
fn parse_csv(text: &str) -> Vec<CsvRecord> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    // Doubled quote inside a quoted field
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current_field));
            }
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if !in_quotes => {
                fields.push(std::mem::take(&mut current_field));
                records.push(CsvRecord {
                    line: record_line,
                    fields: std::mem::take(&mut fields),
                });
                line += 1;
                record_line = line;
            }
            '\n' => {
                line += 1;
                current_field.push(c);
            }
            _ => current_field.push(c),
        }
    }

    if !fields.is_empty() || !current_field.is_empty() {
        fields.push(current_field);
        records.push(CsvRecord {
            line: record_line,
            fields,
        });
    }
    records
}
