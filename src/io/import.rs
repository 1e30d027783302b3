//! CSV import for metered interval usage.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::NaiveDateTime;

use crate::error::{EngineError, Result};
use crate::profile::IntervalReading;

/// Accepted timestamp layouts, tried in order.
const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Reads interval readings from a CSV file with `timestamp,kwh` columns.
///
/// # Errors
///
/// Returns `Io` if the file cannot be opened, `Csv` on malformed CSV and
/// `InvalidUsage` for a missing column, bad timestamp or bad reading.
pub fn read_intervals_csv(path: &Path) -> Result<Vec<IntervalReading>> {
    let file = File::open(path)?;
    parse_intervals(BufReader::new(file))
}

/// Parses interval readings from any reader.
///
/// Columns are located by header name, so extra columns are ignored. Row
/// order is preserved; spacing and coverage are checked later by the
/// profile generator.
///
/// # Errors
///
/// See [`read_intervals_csv`].
pub fn parse_intervals(reader: impl Read) -> Result<Vec<IntervalReading>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                EngineError::InvalidUsage(format!("interval CSV has no `{name}` column"))
            })
    };
    let ts_col = column("timestamp")?;
    let kwh_col = column("kwh")?;

    let mut readings = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        // header is line 1
        let line = i + 2;
        let raw_ts = record.get(ts_col).unwrap_or_default();
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| {
            EngineError::InvalidUsage(format!("line {line}: unrecognised timestamp {raw_ts:?}"))
        })?;
        let raw_kwh = record.get(kwh_col).unwrap_or_default();
        let kwh: f64 = raw_kwh.parse().map_err(|_| {
            EngineError::InvalidUsage(format!("line {line}: kwh {raw_kwh:?} is not a number"))
        })?;
        if !kwh.is_finite() || kwh < 0.0 {
            return Err(EngineError::InvalidUsage(format!(
                "line {line}: kwh must be finite and >= 0, got {kwh}"
            )));
        }
        readings.push(IntervalReading::new(timestamp, kwh));
    }

    if readings.is_empty() {
        return Err(EngineError::InvalidUsage("interval CSV has no readings".into()));
    }
    Ok(readings)
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}
