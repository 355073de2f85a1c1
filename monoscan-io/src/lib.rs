//! monoscan-io: Scan log I/O for monoscan.
//!
//! This crate writes one record per measured position as a scan runs,
//! reads finished logs back into a [`monoscan_core::ResultSeries`], and
//! generates unique timestamped log paths.
//!

mod error;
mod naming;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use naming::LogFileNamer;
pub use reader::ScanLogReader;
pub use writer::{LogFormat, LogRecord, ScanLogWriter};
