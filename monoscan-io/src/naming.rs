//! Unique log paths.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Generates a fresh, timestamped log path per scan.
///
/// Paths look like `<dir>/<prefix>_2026_10_19_14_03_07.<ext>`. Two scans
/// started within the same second, or a name that already exists on disk,
/// get a `_<n>` suffix.
#[derive(Debug)]
pub struct LogFileNamer {
    directory: PathBuf,
    prefix: String,
    extension: String,
    last: Mutex<Option<(String, u32)>>,
}

impl LogFileNamer {
    /// Names logs `<prefix>_<timestamp>.dat` in `directory`.
    pub fn new(directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
            extension: "dat".to_string(),
            last: Mutex::new(None),
        }
    }

    /// Set the file extension, which also selects the log format.
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    /// Directory logs are placed in.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Next unused path, stamped with the current local time.
    pub fn next_path(&self) -> PathBuf {
        self.path_at(Local::now())
    }

    /// Next unused path for a given start time.
    pub fn path_at(&self, time: DateTime<Local>) -> PathBuf {
        let stamp = time.format("%Y_%m_%d_%H_%M_%S").to_string();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);

        let mut sequence = match last.as_ref() {
            Some((previous, n)) if *previous == stamp => n + 1,
            _ => 0,
        };
        loop {
            let candidate = self.candidate(&stamp, sequence);
            if !candidate.exists() {
                *last = Some((stamp, sequence));
                return candidate;
            }
            sequence += 1;
        }
    }

    fn candidate(&self, stamp: &str, sequence: u32) -> PathBuf {
        let name = if sequence == 0 {
            format!("{}_{stamp}.{}", self.prefix, self.extension)
        } else {
            format!("{}_{stamp}_{sequence}.{}", self.prefix, self.extension)
        };
        self.directory.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn test_paths_are_unique_within_a_second() {
        let dir = tempdir().unwrap();
        let namer = LogFileNamer::new(dir.path(), "zoom_scan").with_extension(".csv");
        let time = Local.with_ymd_and_hms(2026, 10, 19, 14, 3, 7).unwrap();

        let first = namer.path_at(time);
        let second = namer.path_at(time);
        assert_eq!(
            first.file_name().unwrap().to_str().unwrap(),
            "zoom_scan_2026_10_19_14_03_07.csv"
        );
        assert_eq!(
            second.file_name().unwrap().to_str().unwrap(),
            "zoom_scan_2026_10_19_14_03_07_1.csv"
        );
    }

    #[test]
    fn test_existing_files_are_skipped() {
        let dir = tempdir().unwrap();
        let namer = LogFileNamer::new(dir.path(), "larmor");
        let time = Local.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        std::fs::write(dir.path().join("larmor_2026_01_02_03_04_05.dat"), "").unwrap();

        let path = namer.path_at(time);
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "larmor_2026_01_02_03_04_05_1.dat"
        );
    }
}
