//! Step trace in JSON Lines format
//!
//! Every executed row (and every failed one) becomes one line in the trace
//! file, so a run can be replayed or diffed against another seed later.

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use sync_sim::{Binding, StepReport};

/// A single trace entry
#[derive(Debug, Serialize, Deserialize)]
pub struct StepLogEntry {
    /// Unix timestamp of the step
    pub timestamp: i64,
    /// ISO 8601 formatted date string
    pub datetime: String,
    /// Scheduling tick the step belongs to (1-based)
    pub tick: u64,
    /// Scheduling mode (round_robin, random, single)
    pub mode: String,
    /// Thread name
    pub thread: String,
    /// Row index inside the thread's column
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    /// Row text as executed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub skipped_block: bool,
    #[serde(default)]
    pub blocked: bool,
    /// Newly defined bindings as `name=value`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defined: Vec<String>,
    /// Rebound bindings as `name=value`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output: Vec<String>,
    /// Error message for a failed step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepLogEntry {
    pub fn from_report(report: &StepReport, tick: u64, mode: &str) -> Self {
        let (timestamp, datetime) = now();
        Self {
            timestamp,
            datetime,
            tick,
            mode: mode.to_string(),
            thread: report.thread_name.clone(),
            row: Some(report.at.row),
            source: Some(truncate_source_line(&report.source, 200)),
            skipped_block: report.skipped_block,
            blocked: report.blocked,
            defined: flatten(&report.defined),
            changed: flatten(&report.changed),
            output: report.output.clone(),
            error: None,
        }
    }

    pub fn from_failure(thread: &str, error: &str, tick: u64, mode: &str) -> Self {
        let (timestamp, datetime) = now();
        Self {
            timestamp,
            datetime,
            tick,
            mode: mode.to_string(),
            thread: thread.to_string(),
            row: None,
            source: None,
            skipped_block: false,
            blocked: false,
            defined: Vec::new(),
            changed: Vec::new(),
            output: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

/// Logger that appends step entries to a file
pub struct TraceLogger {
    writer: Option<BufWriter<File>>,
    log_path: PathBuf,
}

impl TraceLogger {
    /// Create a new logger that writes to the specified file
    /// If the file exists, it will be appended to; otherwise created
    pub fn new(log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            writer: Some(BufWriter::new(file)),
            log_path: log_path.to_path_buf(),
        })
    }

    pub fn log(&mut self, entry: &StepLogEntry) -> std::io::Result<()> {
        if let Some(ref mut writer) = self.writer {
            let json = serde_json::to_string(entry)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            writeln!(writer, "{}", json)?;
            writer.flush()?;
        }
        Ok(())
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}

fn now() -> (i64, String) {
    let now = chrono::Utc::now();
    (now.timestamp(), now.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

fn flatten(bindings: &[Binding]) -> Vec<String> {
    bindings
        .iter()
        .map(|b| format!("{}={}", b.name, b.value))
        .collect()
}

/// Truncate source line if too long
fn truncate_source_line(line: &str, max_chars: usize) -> String {
    match line.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &line[..cut]),
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_sim::{ColumnRef, RowRef, ThreadId};
    use tempfile::TempDir;

    fn report() -> StepReport {
        StepReport {
            thread: ThreadId::from_raw(0),
            thread_name: "A".to_string(),
            at: RowRef {
                column: ColumnRef::Thread(0),
                row: 2,
            },
            source: "count += 1".to_string(),
            skipped_block: false,
            blocked: false,
            defined: Vec::new(),
            changed: vec![Binding {
                name: "count".to_string(),
                value: "3".to_string(),
            }],
            output: Vec::new(),
        }
    }

    #[test]
    fn test_entry_from_report() {
        let entry = StepLogEntry::from_report(&report(), 4, "random");
        assert_eq!(entry.thread, "A");
        assert_eq!(entry.row, Some(2));
        assert_eq!(entry.changed, vec!["count=3"]);
        assert_eq!(entry.mode, "random");
        assert!(entry.datetime.ends_with('Z'));
    }

    #[test]
    fn test_logger_appends_lines() {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join("logs").join("trace.jsonl");

        let mut logger = TraceLogger::new(&log_path).unwrap();
        logger
            .log(&StepLogEntry::from_report(&report(), 1, "round_robin"))
            .unwrap();
        logger
            .log(&StepLogEntry::from_failure("B", "division by zero", 1, "round_robin"))
            .unwrap();
        assert_eq!(logger.log_path(), log_path.as_path());

        let content = std::fs::read_to_string(&log_path).unwrap();
        let entries: Vec<StepLogEntry> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].source.as_deref(), Some("count += 1"));
        assert_eq!(entries[1].error.as_deref(), Some("division by zero"));
        assert!(!content.lines().next().unwrap().contains("\"error\""));
    }

    #[test]
    fn test_truncate_source_line() {
        assert_eq!(truncate_source_line("short line", 100), "short line");

        let long = "a".repeat(250);
        let truncated = truncate_source_line(&long, 200);
        assert_eq!(truncated.len(), 203);
        assert!(truncated.ends_with("..."));
    }
}
