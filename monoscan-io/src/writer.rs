//! Append-only scan log writers.

use crate::{Error, Result};
use monoscan_core::{MonoidValue, Position, ScanPoint};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// On-disk log layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// `index,<axes>,value,uncertainty` rows.
    Csv,
    /// One JSON object per line carrying the full monoid value.
    JsonLines,
}

impl LogFormat {
    /// Chooses the format from a file extension.
    ///
    /// `.jsonl` and `.json` select JSON Lines; anything else, including
    /// `.csv` and `.dat`, is CSV.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("jsonl" | "json") => Self::JsonLines,
            _ => Self::Csv,
        }
    }
}

/// One JSON Lines record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Position index within the scan.
    pub index: usize,
    /// Measured point.
    #[serde(flatten)]
    pub point: ScanPoint,
}

/// Writer for scan logs.
///
/// Every record is flushed as soon as it is written, so a scan aborted by
/// an error leaves a log containing exactly the points measured so far.
/// Buffered data is also flushed on drop.
pub struct ScanLogWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    format: LogFormat,
    axes: Vec<String>,
    records: usize,
}

impl ScanLogWriter {
    /// Creates a log at `path` for a scan over `axes`.
    ///
    /// The format follows the extension, see [`LogFormat::from_path`]. CSV
    /// logs get their header immediately.
    pub fn create<P: AsRef<Path>>(path: P, axes: &[String]) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let format = LogFormat::from_path(&path);
        Self::create_with_format(path, axes, format)
    }

    /// Creates a log with an explicit format.
    pub fn create_with_format<P: AsRef<Path>>(
        path: P,
        axes: &[String],
        format: LogFormat,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        let mut log = Self {
            writer: BufWriter::new(file),
            path,
            format,
            axes: axes.to_vec(),
            records: 0,
        };
        if format == LogFormat::Csv {
            let mut header = String::from("index");
            for axis in &log.axes {
                header.push(',');
                header.push_str(axis);
            }
            header.push_str(",value,uncertainty");
            writeln!(log.writer, "{header}")?;
            log.writer.flush()?;
        }
        Ok(log)
    }

    /// Path being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format being written.
    pub fn format(&self) -> LogFormat {
        self.format
    }

    /// Records written so far.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Appends one point and flushes it to disk.
    ///
    /// In CSV logs an axis the position does not carry is left empty.
    pub fn write_point(
        &mut self,
        index: usize,
        position: &Position,
        value: &MonoidValue,
    ) -> Result<()> {
        match self.format {
            LogFormat::Csv => self.write_csv_row(index, position, value)?,
            LogFormat::JsonLines => {
                let record = LogRecord {
                    index,
                    point: ScanPoint {
                        position: position.clone(),
                        value: value.clone(),
                    },
                };
                serde_json::to_writer(&mut self.writer, &record)?;
                self.writer.write_all(b"\n")?;
            }
        }
        self.writer.flush()?;
        self.records += 1;
        Ok(())
    }

    fn write_csv_row(
        &mut self,
        index: usize,
        position: &Position,
        value: &MonoidValue,
    ) -> Result<()> {
        let mut row = index.to_string();
        if let Some(extra) = position.axes().find(|axis| !self.axes.iter().any(|a| a == axis)) {
            return Err(Error::InvalidFormat(format!(
                "position {position} has axis `{extra}` missing from the log header"
            )));
        }
        for axis in &self.axes {
            row.push(',');
            row.push_str(&optional(position.get(axis)));
        }
        row.push(',');
        row.push_str(&optional(value.value()));
        row.push(',');
        row.push_str(&optional(value.uncertainty()));
        writeln!(self.writer, "{row}")?;
        Ok(())
    }

    /// Flushes buffered data.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for ScanLogWriter {
    fn drop(&mut self) {
        if let Err(err) = self.writer.flush() {
            log::warn!("failed to flush scan log {}: {err}", self.path.display());
        }
    }
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use monoscan_core::Average;
    use tempfile::tempdir;

    fn axes() -> Vec<String> {
        vec!["theta".to_string()]
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(LogFormat::from_path(Path::new("a.csv")), LogFormat::Csv);
        assert_eq!(LogFormat::from_path(Path::new("a.dat")), LogFormat::Csv);
        assert_eq!(LogFormat::from_path(Path::new("a.JSONL")), LogFormat::JsonLines);
        assert_eq!(LogFormat::from_path(Path::new("a.json")), LogFormat::JsonLines);
        assert_eq!(LogFormat::from_path(Path::new("noext")), LogFormat::Csv);
    }

    #[test]
    fn test_csv_rows_are_flushed_per_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scan.csv");
        let mut log = ScanLogWriter::create(&path, &axes()).unwrap();

        log.write_point(0, &Position::single("theta", 0.5), &MonoidValue::from(4_u64))
            .unwrap();
        // Still open: the row must already be on disk.
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "index,theta,value,uncertainty\n0,0.5,4,2\n");

        log.write_point(
            1,
            &Position::single("theta", 1.0),
            &MonoidValue::from(Average::new(3.0)),
        )
        .unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("1,1,3,\n"));
        assert_eq!(log.records(), 2);
    }

    #[test]
    fn test_csv_rejects_unknown_axis() {
        let dir = tempdir().unwrap();
        let mut log = ScanLogWriter::create(dir.path().join("scan.dat"), &axes()).unwrap();
        let err = log
            .write_point(0, &Position::single("phi", 1.0), &MonoidValue::from(1.0))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_csv_leaves_absent_axes_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scan.csv");
        let axes = vec!["x".to_string(), "y".to_string()];
        let mut log = ScanLogWriter::create(&path, &axes).unwrap();
        log.write_point(0, &Position::single("x", 1.0), &MonoidValue::from(2.0))
            .unwrap();
        log.write_point(1, &Position::single("y", 3.0), &MonoidValue::from(4.0))
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "index,x,y,value,uncertainty\n0,1,,2,\n1,,3,4,\n");
    }

    #[test]
    fn test_jsonl_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scan.jsonl");
        {
            let mut log = ScanLogWriter::create(&path, &axes()).unwrap();
            assert_eq!(log.format(), LogFormat::JsonLines);
            log.write_point(0, &Position::single("theta", 2.0), &MonoidValue::from(1.5))
                .unwrap();
        }
        let content = std::fs::read_to_string(&path).unwrap();
        let line = content.lines().next().unwrap();
        let record: LogRecord = serde_json::from_str(line).unwrap();
        assert_eq!(record.index, 0);
        assert_eq!(record.point.value, MonoidValue::from(1.5));
        assert!(line.contains("\"kind\":\"Sum\""));
    }
}
