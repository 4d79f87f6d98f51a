mod common;

use calamine::{Reader, Xlsx};
use pvd_search::downloader::{to_csv, to_xlsx};
use std::io::Cursor;

#[test]
fn test_csv_escaping() {
    let table = common::table(
        "raw",
        &["자재번호", "비고"],
        &[
            &["M-1", "plain"],
            &["M-2", "a, b"],
            &["M-3", "say \"hi\""],
            &["M-4", "two\nlines"],
            &["M-5", ""],
        ],
    );

    let csv = to_csv(&table);
    assert!(csv.starts_with('\u{feff}'));
    assert_eq!(
        csv.trim_start_matches('\u{feff}'),
        "자재번호,비고\nM-1,plain\nM-2,\"a, b\"\nM-3,\"say \"\"hi\"\"\"\nM-4,\"two\nlines\"\nM-5,\n"
    );
    assert!(to_csv(&common::table("raw", &["a"], &[&["x\ry"]])).ends_with("\"x\ry\"\n"));
    println!("✓ CSV export quotes commas, quotes and line breaks");
}

#[test]
fn test_csv_reads_back_through_loader() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.csv");
    let table = common::records();
    std::fs::write(&path, to_csv(&table)).unwrap();

    let loaded = pvd_search::loader::from_csv(&path, "raw").unwrap();
    assert_eq!(loaded, table);
}

#[test]
fn test_multiline_cells_read_back_through_loader() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.csv");
    let table = common::table(
        "raw",
        &["자재번호", "비고"],
        &[
            &["A1", "line one\nline two"],
            &["A2", "x"],
            &["A3", "crlf\r\ninside, \"quoted\""],
            &["A4", "bare\rreturn"],
        ],
    );
    std::fs::write(&path, to_csv(&table)).unwrap();

    let loaded = pvd_search::loader::from_csv(&path, "raw").unwrap();
    assert_eq!(loaded.len(), 4);
    assert_eq!(loaded.rows()[0].get(1), "line one\nline two");
    assert_eq!(loaded.rows()[1].cells(), &["A2", "x"]);
    assert_eq!(loaded, table);
    println!("✓ Line breaks inside cells survive an export and reload");
}

#[test]
fn test_loader_accepts_crlf_line_endings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crlf.csv");
    std::fs::write(&path, "자재번호,비고\r\nA1,\"two\r\nlines\"\r\n\r\nA2,x\r\n").unwrap();

    let loaded = pvd_search::loader::from_csv(&path, "raw").unwrap();
    assert_eq!(loaded.columns(), &["자재번호", "비고"]);
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.rows()[0].get(1), "two\r\nlines");
    assert_eq!(loaded.rows()[1].get(0), "A2");
}

#[test]
fn test_xlsx_export() {
    let table = common::grades();
    let bytes = to_xlsx(&table).unwrap();
    assert!(bytes.starts_with(b"PK"));

    let mut workbook = Xlsx::new(Cursor::new(bytes)).unwrap();
    let range = workbook.worksheet_range("참조표2").unwrap();
    assert_eq!(range.height(), table.len() + 1);
    assert_eq!(range.width(), table.columns().len());
    assert_eq!(
        range.get_value((0, 0)).map(|c| c.to_string()),
        Some("재종".to_string())
    );
    assert_eq!(
        range.get_value((4, 4)).map(|c| c.to_string()),
        Some("서멧".to_string())
    );
}
