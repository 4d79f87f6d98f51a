use bincode::{deserialize_from, serialize_into};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::SystemTime;

use crate::table::{Table, TableData, Tables};

/// On-disk form of a parsed workbook.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    records: TableData,
    grades: TableData,
}

/// Write the parsed tables as a gzip-compressed bincode snapshot.
pub fn save_snapshot(tables: &Tables, filename: impl AsRef<Path>) -> std::io::Result<()> {
    let snapshot = Snapshot {
        records: tables.records.to_data(),
        grades: tables.grades.to_data(),
    };

    let file = File::create(filename)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut writer = BufWriter::new(encoder);

    serialize_into(&mut writer, &snapshot)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    writer
        .into_inner()
        .map_err(|e| e.into_error())?
        .finish()?
        .flush()?;

    Ok(())
}

pub fn load_snapshot(filename: impl AsRef<Path>) -> std::io::Result<Tables> {
    let file = File::open(filename)?;
    let decoder = GzDecoder::new(file);
    let mut reader = BufReader::new(decoder);

    let snapshot: Snapshot = deserialize_from(&mut reader)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    Ok(Tables {
        records: Table::from_data(snapshot.records),
        grades: Table::from_data(snapshot.grades),
    })
}

/// True when `snapshot` exists and is at least as new as every source file.
///
/// A source file whose modification time cannot be read makes the snapshot stale.
pub fn is_fresh(snapshot: &Path, sources: &[&Path]) -> bool {
    let Some(snap_time) = modified(snapshot) else {
        return false;
    };
    sources
        .iter()
        .all(|src| modified(src).is_some_and(|t| t <= snap_time))
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
