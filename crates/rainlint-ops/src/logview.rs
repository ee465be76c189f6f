//! Reader for the skin engine's log file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::OperationError;

static ERROR_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bERRO\b").expect("valid regex"));
static WARNING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bWARN\b").expect("valid regex"));
static DEBUG_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:DBUG|DEBUG)\b").expect("valid regex"));

const BYTE_ORDER_MARK: char = '\u{feff}';

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warning,
    Debug,
    Note,
}

impl LogLevel {
    /// Level implied by the tag the engine writes at the start of each entry.
    pub fn detect(line: &str) -> Self {
        if ERROR_TAG.is_match(line) {
            LogLevel::Error
        } else if WARNING_TAG.is_match(line) {
            LogLevel::Warning
        } else if DEBUG_TAG.is_match(line) {
            LogLevel::Debug
        } else {
            LogLevel::Note
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warning => "warning",
            LogLevel::Debug => "debug",
            LogLevel::Note => "note",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub text: String,
}

/// What the log viewer should show.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogView {
    Missing { path: PathBuf },
    Empty { path: PathBuf },
    /// Newest entry first.
    Entries(Vec<LogEntry>),
}

impl LogView {
    /// Notice shown in place of entries, if any.
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            LogView::Missing { .. } => Some("Rainmeter.log not found. Please select the correct path."),
            LogView::Empty { .. } => Some(
                "Rainmeter.log is empty. Please ensure that logging is enabled (Logging=1 in Rainmeter.ini).",
            ),
            LogView::Entries(_) => None,
        }
    }
}

/// Read and classify the log at `path`.
pub fn read_log(path: &Path) -> Result<LogView, OperationError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "log file not found");
            return Ok(LogView::Missing {
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(OperationError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    Ok(parse_log(&contents, path))
}

/// Truncate the log at `path`. A missing log is left missing.
pub fn clear_log(path: &Path) -> Result<(), OperationError> {
    if !path.exists() {
        return Ok(());
    }
    fs::write(path, "").map_err(|source| OperationError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Tails a log file, yielding entries appended since the previous poll.
///
/// Only complete lines are consumed; a partially written last line is picked
/// up by a later poll. When the log shrinks (cleared or rotated) reading
/// starts over from the beginning.
#[derive(Debug)]
pub struct LogFollower {
    path: PathBuf,
    offset: usize,
}

impl LogFollower {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LogFollower {
            path: path.into(),
            offset: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// New entries in the order they were written, oldest first.
    pub fn poll(&mut self) -> Result<Vec<LogEntry>, OperationError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                self.offset = 0;
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(OperationError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if bytes.len() < self.offset {
            debug!(path = %self.path.display(), "log shrank, reading from the start");
            self.offset = 0;
        }
        let fresh = &bytes[self.offset..];
        let Some(last_newline) = fresh.iter().rposition(|byte| *byte == b'\n') else {
            return Ok(Vec::new());
        };
        let complete = &fresh[..=last_newline];
        self.offset += complete.len();

        let text = String::from_utf8_lossy(complete);
        Ok(entries(text.trim_start_matches(BYTE_ORDER_MARK)).collect())
    }
}

fn parse_log(contents: &str, path: &Path) -> LogView {
    let contents = contents.trim_start_matches(BYTE_ORDER_MARK);
    if contents.trim().is_empty() {
        return LogView::Empty {
            path: path.to_path_buf(),
        };
    }

    let mut newest_first: Vec<LogEntry> = entries(contents).collect();
    newest_first.reverse();
    LogView::Entries(newest_first)
}

fn entries(contents: &str) -> impl Iterator<Item = LogEntry> + '_ {
    contents
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(|line| LogEntry {
            level: LogLevel::detect(line),
            text: line.to_string(),
        })
}
