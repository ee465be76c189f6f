//! Diagnostic model and output formatters for rainlint commands.

use std::fmt::Write as _;
use std::path::PathBuf;

use rainlint_config::{Rule, SeverityLevel};
use serde::{Serialize, Serializer};

/// Severity of an emitted diagnostic.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Hint,
}

impl Severity {
    /// Map a configured level to an emitted severity; `Ignore` yields `None`.
    pub fn from_level(level: SeverityLevel) -> Option<Self> {
        match level {
            SeverityLevel::Error => Some(Severity::Error),
            SeverityLevel::Warning => Some(Severity::Warning),
            SeverityLevel::Hint => Some(Severity::Hint),
            SeverityLevel::Ignore => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Hint => "hint",
        }
    }
}

/// Zero-based line/column pair; columns count characters.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

impl Position {
    pub fn new(line: usize, character: usize) -> Self {
        Position { line, character }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    /// Range covering `start..end` columns of a single line.
    pub fn on_line(line: usize, start: usize, end: usize) -> Self {
        Range {
            start: Position::new(line, start),
            end: Position::new(line, end.max(start)),
        }
    }

    /// Empty range at the start of the document.
    pub fn document_start() -> Self {
        Range::default()
    }
}

/// A positioned finding produced by one validation pass.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Diagnostic {
    #[serde(serialize_with = "serialize_rule")]
    pub rule: Rule,
    pub severity: Severity,
    pub range: Range,
    pub message: String,
}

fn serialize_rule<S: Serializer>(rule: &Rule, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(rule.as_str())
}

/// Diagnostic tagged with the file it was found in.
#[derive(Clone, Debug, Serialize)]
pub struct Finding {
    pub path: PathBuf,
    #[serde(flatten)]
    pub diagnostic: Diagnostic,
}

/// A selected file that could not be read or decoded.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Aggregated result of checking one or more files.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CheckReport {
    pub files_scanned: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub hint_count: usize,
    pub findings: Vec<Finding>,
    pub skipped: Vec<SkippedFile>,
}

impl CheckReport {
    /// Build a report, computing per-severity counts from `findings`.
    pub fn new(files_scanned: usize, findings: Vec<Finding>) -> Self {
        let mut report = CheckReport {
            files_scanned,
            findings,
            ..CheckReport::default()
        };
        for finding in &report.findings {
            match finding.diagnostic.severity {
                Severity::Error => report.error_count += 1,
                Severity::Warning => report.warning_count += 1,
                Severity::Hint => report.hint_count += 1,
            }
        }
        report
    }

    /// Attach files that were selected but never validated.
    pub fn with_skipped(mut self, skipped: Vec<SkippedFile>) -> Self {
        self.skipped = skipped;
        self
    }

    /// Error diagnostics were found or some file could not be checked.
    pub fn has_errors(&self) -> bool {
        self.error_count > 0 || !self.skipped.is_empty()
    }
}

/// Output flavours for `check`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReportFormat {
    Plain,
    Json,
}

/// Render a check report in the requested format.
pub fn render_report(report: &CheckReport, format: ReportFormat) -> String {
    match format {
        ReportFormat::Plain => render_plain(report),
        ReportFormat::Json => serde_json::to_string_pretty(report)
            .unwrap_or_else(|err| format!("{{\"error\":\"{err}\"}}")),
    }
}

fn render_plain(report: &CheckReport) -> String {
    let mut out = String::new();
    for finding in &report.findings {
        let diagnostic = &finding.diagnostic;
        let _ = writeln!(
            out,
            "{}:{}:{}: {}[{}] {}",
            finding.path.display(),
            diagnostic.range.start.line + 1,
            diagnostic.range.start.character + 1,
            diagnostic.severity.as_str(),
            diagnostic.rule,
            diagnostic.message
        );
    }
    for skipped in &report.skipped {
        let _ = writeln!(
            out,
            "{}: error: could not read file: {}",
            skipped.path.display(),
            skipped.reason
        );
    }
    let _ = write!(
        out,
        "{} file(s) checked: {} error(s), {} warning(s), {} hint(s)",
        report.files_scanned, report.error_count, report.warning_count, report.hint_count
    );
    if !report.skipped.is_empty() {
        let _ = write!(out, "; {} file(s) unreadable", report.skipped.len());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_report() -> CheckReport {
        CheckReport::new(
            1,
            vec![
                Finding {
                    path: PathBuf::from("Clock/Clock.ini"),
                    diagnostic: Diagnostic {
                        rule: Rule::DuplicateKey,
                        severity: Severity::Warning,
                        range: Range::on_line(3, 0, 4),
                        message: "Duplicate key 'Text' found in section [Meter].".into(),
                    },
                },
                Finding {
                    path: PathBuf::from("Clock/Clock.ini"),
                    diagnostic: Diagnostic {
                        rule: Rule::MissingRainmeter,
                        severity: Severity::Error,
                        range: Range::document_start(),
                        message: "Missing required section: [Rainmeter].".into(),
                    },
                },
            ],
        )
    }

    #[test]
    fn counts_findings_by_severity() {
        let report = sample_report();
        assert_eq!(report.error_count, 1);
        assert_eq!(report.warning_count, 1);
        assert_eq!(report.hint_count, 0);
        assert!(report.has_errors());
    }

    #[test]
    fn plain_output_uses_one_based_positions() {
        let rendered = render_report(&sample_report(), ReportFormat::Plain);
        assert_eq!(
            rendered,
            "Clock/Clock.ini:4:1: warning[duplicate-key] Duplicate key 'Text' found in section [Meter].\n\
             Clock/Clock.ini:1:1: error[missing-rainmeter] Missing required section: [Rainmeter].\n\
             1 file(s) checked: 1 error(s), 1 warning(s), 0 hint(s)"
        );
    }

    #[test]
    fn json_output_flattens_diagnostics() {
        let rendered = render_report(&sample_report(), ReportFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&rendered).expect("valid json");
        assert_eq!(value["error_count"], 1);
        let first = &value["findings"][0];
        assert_eq!(first["rule"], "duplicate-key");
        assert_eq!(first["severity"], "warning");
        assert_eq!(first["range"]["start"]["line"], 3);
        assert_eq!(first["path"], "Clock/Clock.ini");
    }

    #[test]
    fn skipped_files_are_errors_in_every_format() {
        let report = CheckReport::new(2, Vec::new()).with_skipped(vec![SkippedFile {
            path: PathBuf::from("Clock/Broken.ini"),
            reason: "invalid UTF-16 data".into(),
        }]);
        assert!(report.has_errors());

        let plain = render_report(&report, ReportFormat::Plain);
        assert_eq!(
            plain,
            "Clock/Broken.ini: error: could not read file: invalid UTF-16 data\n\
             2 file(s) checked: 0 error(s), 0 warning(s), 0 hint(s); 1 file(s) unreadable"
        );

        let json: serde_json::Value =
            serde_json::from_str(&render_report(&report, ReportFormat::Json)).expect("valid json");
        assert_eq!(json["skipped"][0]["path"], "Clock/Broken.ini");
    }

    #[test]
    fn ignore_level_has_no_severity() {
        assert_eq!(Severity::from_level(SeverityLevel::Ignore), None);
        assert_eq!(
            Severity::from_level(SeverityLevel::Hint),
            Some(Severity::Hint)
        );
    }
}
