//! Raw Capture CSV Export and Replay
//!
//! Captured sample records are exported as UTF-8, LF-terminated CSV with
//! the header `Timestamp,Clock,Data,DST,Latch,Motor1,Motor2`. The
//! exported file is the ground truth of a capture: reading it back
//! through [`read_records`] and feeding the records to the emulator
//! reproduces the printout exactly.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::record::SampleRecord;
use crate::{AnalyserError, Result};

const CSV_HEADER: [&str; 7] = [
    "Timestamp", "Clock", "Data", "DST", "Latch", "Motor1", "Motor2",
];

/// One CSV line; signal levels are written as `0`/`1`.
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    #[serde(rename = "Timestamp")]
    timestamp: f64,
    #[serde(rename = "Clock")]
    clock: u8,
    #[serde(rename = "Data")]
    data: u8,
    #[serde(rename = "DST")]
    dst: u8,
    #[serde(rename = "Latch")]
    latch: u8,
    #[serde(rename = "Motor1")]
    motor1: u8,
    #[serde(rename = "Motor2")]
    motor2: u8,
}

impl From<&SampleRecord> for CsvRow {
    fn from(record: &SampleRecord) -> Self {
        CsvRow {
            timestamp: record.timestamp,
            clock: u8::from(record.clock),
            data: u8::from(record.data),
            dst: u8::from(record.dst),
            latch: u8::from(record.latch),
            motor1: u8::from(record.motor1),
            motor2: u8::from(record.motor2),
        }
    }
}

impl From<CsvRow> for SampleRecord {
    fn from(row: CsvRow) -> Self {
        SampleRecord {
            timestamp: row.timestamp,
            clock: row.clock != 0,
            data: row.data != 0,
            dst: row.dst != 0,
            latch: row.latch != 0,
            motor1: row.motor1 != 0,
            motor2: row.motor2 != 0,
        }
    }
}

/// Write captured records to `path` in the raw capture CSV format.
///
/// A capture that emitted no records produces a header-only file.
pub fn export_records<P: AsRef<Path>>(path: P, records: &[SampleRecord]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| format!("failed to create capture CSV {}: {e}", path.display()))?;

    writer
        .write_record(CSV_HEADER)
        .map_err(|e| format!("failed to write capture CSV header: {e}"))?;
    for record in records {
        writer
            .serialize(CsvRow::from(record))
            .map_err(|e| format!("failed to write capture CSV record: {e}"))?;
    }
    writer.flush()?;
    Ok(())
}

/// Lazy iterator over the records of a capture CSV file.
///
/// Obtained from [`read_records`]; restartable by calling
/// [`read_records`] again on the same path.
pub struct CsvRecords {
    inner: csv::DeserializeRecordsIntoIter<File, CsvRow>,
}

impl Iterator for CsvRecords {
    type Item = Result<SampleRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|row| {
            row.map(SampleRecord::from)
                .map_err(|e| AnalyserError::Decode(format!("malformed capture CSV record: {e}")))
        })
    }
}

/// Open a capture CSV file and iterate its records one at a time.
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<CsvRecords> {
    let path = path.as_ref();
    let reader = csv::Reader::from_path(path)
        .map_err(|e| AnalyserError::Decode(format!("failed to open capture CSV {}: {e}", path.display())))?;
    Ok(CsvRecords {
        inner: reader.into_deserialize(),
    })
}
