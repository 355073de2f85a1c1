//! Scan log readers.

use crate::writer::{LogFormat, LogRecord};
use crate::{Error, Result};
use monoscan_core::{MonoidValue, Position, ResultSeries};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Reader for logs produced by [`crate::ScanLogWriter`].
///
/// JSON Lines logs restore the full monoid value of each point. CSV logs
/// only carry the scalar view, which is read back as a `Sum`.
pub struct ScanLogReader {
    path: PathBuf,
    format: LogFormat,
}

impl ScanLogReader {
    /// Opens a log, choosing the format from its extension.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no scan log at {}", path.display()),
            )));
        }
        let format = LogFormat::from_path(&path);
        Ok(Self { path, format })
    }

    /// Format of the log.
    pub fn format(&self) -> LogFormat {
        self.format
    }

    /// Reads every record into a series, in file order.
    pub fn read_series(&self) -> Result<ResultSeries> {
        let reader = BufReader::new(File::open(&self.path)?);
        match self.format {
            LogFormat::JsonLines => read_jsonl(reader),
            LogFormat::Csv => read_csv(reader),
        }
    }
}

fn read_jsonl<R: BufRead>(reader: R) -> Result<ResultSeries> {
    let mut series = ResultSeries::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: LogRecord = serde_json::from_str(&line)
            .map_err(|e| Error::InvalidFormat(format!("line {}: {e}", line_no + 1)))?;
        series.push(record.point.position, record.point.value);
    }
    Ok(series)
}

fn read_csv<R: BufRead>(reader: R) -> Result<ResultSeries> {
    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => return Ok(ResultSeries::new()),
    };
    let columns: Vec<&str> = header.trim().split(',').collect();
    let n = columns.len();
    if n < 3 || columns[0] != "index" || columns[n - 2] != "value" || columns[n - 1] != "uncertainty"
    {
        return Err(Error::InvalidFormat(format!(
            "unexpected CSV header `{header}`"
        )));
    }
    let axes = &columns[1..n - 2];

    let mut series = ResultSeries::new();
    for (line_no, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row = line_no + 2;
        let fields: Vec<&str> = line.trim().split(',').collect();
        if fields.len() != n {
            return Err(Error::InvalidFormat(format!(
                "line {row}: expected {n} fields, got {}",
                fields.len()
            )));
        }

        let mut position = Position::new();
        for (axis, field) in axes.iter().zip(&fields[1..n - 2]) {
            if !field.trim().is_empty() {
                position.set(*axis, parse_field(field, row)?);
            }
        }
        let value = match fields[n - 2] {
            "" => MonoidValue::from(monoscan_core::Unit),
            field => MonoidValue::from(parse_field(field, row)?),
        };
        series.push(position, value);
    }
    Ok(series)
}

fn parse_field(field: &str, row: usize) -> Result<f64> {
    field
        .trim()
        .parse::<f64>()
        .map_err(|e| Error::InvalidFormat(format!("line {row}: `{field}`: {e}")))
}
