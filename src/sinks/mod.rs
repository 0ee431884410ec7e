//! Analytics and record sinks.
//!
//! Sinks receive facts after a routing decision has been made. Their
//! failures are logged by the caller and never change the decision.
//! Both sinks have an append-only JSONL implementation and an in-memory
//! one for tests.

pub mod analytics;
pub mod records;

pub use analytics::{
    AnalyticsEvent, AnalyticsSink, JsonlAnalyticsSink, MemoryAnalyticsSink,
    ANALYTICS_SCHEMA_VERSION,
};
pub use records::{JsonlRecordSink, MemoryRecordSink, RecordEntry, RecordSink};

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{LeadflowError, Result};

/// Append-only JSONL file shared by the file-backed sinks.
#[derive(Debug, Clone)]
pub(crate) struct JsonlLog {
    path: PathBuf,
}

impl JsonlLog {
    pub(crate) fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Append one value as a JSON line, creating parent directories.
    pub(crate) fn append<T: Serialize>(&self, value: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                LeadflowError::sink(format!(
                    "failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let json = serde_json::to_string(value)
            .map_err(|e| LeadflowError::serde(format!("failed to serialize entry: {}", e)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                LeadflowError::sink(format!("failed to open {}: {}", self.path.display(), e))
            })?;

        writeln!(file, "{}", json).map_err(|e| {
            LeadflowError::sink(format!(
                "failed to write to {}: {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Read every line. A missing file is empty.
    pub(crate) fn read_all<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| LeadflowError::storage(&self.path, e))?;

        let mut entries = Vec::new();
        for (line_num, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: T = serde_json::from_str(line).map_err(|e| {
                LeadflowError::serde(format!(
                    "failed to parse {} line {}: {}",
                    self.path.display(),
                    line_num + 1,
                    e
                ))
            })?;
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Count non-empty lines.
    pub(crate) fn count(&self) -> Result<usize> {
        if !self.path.exists() {
            return Ok(0);
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| LeadflowError::storage(&self.path, e))?;
        Ok(content.lines().filter(|l| !l.trim().is_empty()).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Line {
        n: u32,
    }

    #[test]
    fn test_append_creates_parent_dirs() {
        let temp = TempDir::new().unwrap();
        let log = JsonlLog::new(temp.path().join("nested/dir/out.log"));

        log.append(&Line { n: 1 }).unwrap();
        log.append(&Line { n: 2 }).unwrap();

        let lines: Vec<Line> = log.read_all().unwrap();
        assert_eq!(lines, vec![Line { n: 1 }, Line { n: 2 }]);
        assert_eq!(log.count().unwrap(), 2);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let log = JsonlLog::new(temp.path().join("absent.log"));

        let lines: Vec<Line> = log.read_all().unwrap();
        assert!(lines.is_empty());
        assert_eq!(log.count().unwrap(), 0);
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.log");
        fs::write(&path, "{\"n\":1}\n\n   \n{\"n\":3}\n").unwrap();

        let log = JsonlLog::new(&path);
        let lines: Vec<Line> = log.read_all().unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(log.count().unwrap(), 2);
    }

    #[test]
    fn test_corrupt_line_reports_line_number() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.log");
        fs::write(&path, "{\"n\":1}\nnot json\n").unwrap();

        let log = JsonlLog::new(&path);
        let err = log.read_all::<Line>().unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
