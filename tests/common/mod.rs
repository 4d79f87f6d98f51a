#![allow(dead_code)]

use pvd_search::table::{Table, Tables};
use std::fs;
use std::path::{Path, PathBuf};

pub const RECORD_COLUMNS: [&str; 6] = ["자재번호", "형번", "재종", "코팅그룹", "전처리", "후처리"];
pub const GRADE_COLUMNS: [&str; 6] = ["재종", "코팅그룹", "재종내역", "박막명", "합금", "색상"];

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub fn table(name: &str, columns: &[&str], rows: &[&[&str]]) -> Table {
    Table::new(name, strings(columns), rows.iter().map(|r| strings(r)).collect())
}

/// Four material records across two coating groups, in unsorted source order.
pub fn records() -> Table {
    table("raw", &RECORD_COLUMNS, &records_rows())
}

/// Grade reference rows; `PC3700` appears under two alloys.
pub fn grades() -> Table {
    table("참조표2", &GRADE_COLUMNS, &grades_rows())
}

pub fn tables() -> Tables {
    Tables {
        records: records(),
        grades: grades(),
    }
}

fn csv_line(values: &[&str]) -> String {
    let mut line = values.join(",");
    line.push('\n');
    line
}

/// Write the fixture tables as a CSV pair and return their paths.
pub fn write_csv_pair(dir: &Path) -> (PathBuf, PathBuf) {
    let records = dir.join("raw.csv");
    let grades = dir.join("grades.csv");

    let mut contents = csv_line(&RECORD_COLUMNS);
    for row in records_rows() {
        contents.push_str(&csv_line(row));
    }
    fs::write(&records, contents).unwrap();

    let mut contents = csv_line(&GRADE_COLUMNS);
    for row in grades_rows() {
        contents.push_str(&csv_line(row));
    }
    fs::write(&grades, contents).unwrap();

    (records, grades)
}

pub fn records_rows() -> [&'static [&'static str]; 4] {
    [
        &["M-100", "SPGT 0603", "PC3700", "G2", "랩핑", ""],
        &["M-050", "CNMG 1204", "PC5300", "G1", "", "폴리싱"],
        &["M-200", "SPGT 0603", "PC3700", "G1", "", ""],
        &["M-150", "TNMG 1604", "PC8110", "G2", "블라스트", ""],
    ]
}

pub fn grades_rows() -> [&'static [&'static str]; 4] {
    [
        &["PC3700", "G2", "TiAlN 코팅", "TiAlN", "초경", "보라"],
        &["PC5300", "G1", "AlTiN 코팅", "AlTiN", "초경", "흑색"],
        &["PC8110", "G3", "TiN 코팅", "TiN", "서멧", "금색"],
        &["PC3700", "G4", "서멧 TiAlN", "TiAlN", "서멧", "보라"],
    ]
}

/// Write the fixture tables as one workbook with `raw` and `참조표2` sheets.
pub fn write_workbook(path: &Path) {
    use rust_xlsxwriter::{Workbook, Worksheet};

    let mut workbook = Workbook::new();
    for (name, columns, rows) in [
        ("raw", &RECORD_COLUMNS, records_rows()),
        ("참조표2", &GRADE_COLUMNS, grades_rows()),
    ] {
        let mut sheet = Worksheet::new();
        sheet.set_name(name).unwrap();
        for (c, column) in columns.iter().enumerate() {
            sheet.write_string(0, c as u16, *column).unwrap();
        }
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    sheet.write_string(r as u32 + 1, c as u16, *value).unwrap();
                }
            }
        }
        workbook.push_worksheet(sheet);
    }
    workbook.save(path).unwrap();
}
