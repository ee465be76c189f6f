//! Single-pass structural validator for skin configuration files.
//!
//! [`Validator::validate`] walks the classified lines once, feeding section
//! headers and keys to the [`tracker`], include directives to the
//! [`includes`] guard, and finally runs the per-meter key checks in
//! [`meters`]. The pass is total: every problem becomes a diagnostic and
//! nothing here returns an error.

mod includes;
mod macros;
mod meters;
mod tracker;

use std::path::Path;

use rainlint_config::{Config, MeterType, Rule, ValidateSettings};
use rainlint_format::{Diagnostic, Range, Severity};
use rainlint_parser::{classify_document, LineKind};
use tracing::{debug, trace};

pub use includes::IncludeGuard;
pub use macros::{MacroTable, Resolution};
pub use meters::{MeterKeySet, NumberedKey, NUMBERED_KEYS};
pub use tracker::SectionTracker;

/// Read-only filesystem queries made while validating.
pub trait PathLookup: Send + Sync {
    /// Whether `path` exists. Access errors count as "does not exist".
    fn exists(&self, path: &Path) -> bool;
}

/// Lookup backed by the real filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiskLookup;

impl PathLookup for DiskLookup {
    fn exists(&self, path: &Path) -> bool {
        path.try_exists().unwrap_or(false)
    }
}

static DISK_LOOKUP: DiskLookup = DiskLookup;

/// Validator bound to a configuration and a filesystem lookup.
pub struct Validator<'a> {
    config: &'a Config,
    lookup: &'a dyn PathLookup,
}

impl<'a> Validator<'a> {
    pub fn new(config: &'a Config) -> Self {
        Validator {
            config,
            lookup: &DISK_LOOKUP,
        }
    }

    pub fn with_lookup(config: &'a Config, lookup: &'a dyn PathLookup) -> Self {
        Validator { config, lookup }
    }

    /// Validate `text`, the contents of the file at `document_path`.
    ///
    /// Diagnostics come back ordered by start position; diagnostics on the
    /// same position keep the order they were produced in. A leading byte
    /// order mark is ignored.
    pub fn validate(&self, text: &str, document_path: &Path) -> Vec<Diagnostic> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let settings = &self.config.validate;
        let lines = classify_document(text);
        let mut emitter = Emitter::new(settings);

        let table = MacroTable::build(document_path, settings, self.lookup);
        debug!(
            document = %document_path.display(),
            resources = %table.resources,
            skins = %table.skins,
            current_path = %table.current_path,
            current_file = %table.current_file,
            root_config_path = %table.root_config_path,
            root_config = %table.root_config,
            current_config = %table.current_config,
            "resolved macro table"
        );

        let file_dir = document_path.parent().unwrap_or_else(|| Path::new(""));
        let mut tracker = SectionTracker::new(settings);
        let mut guard = IncludeGuard::new(file_dir, &table, self.lookup);

        for line in &lines {
            trace!(line = line.index, kind = ?line.kind, "classified line");
            match line.kind {
                LineKind::Blank | LineKind::Comment => {}
                LineKind::SectionHeader { name } => tracker.open_section(line, name, &mut emitter),
                LineKind::UnterminatedHeader => emitter.emit(
                    Rule::UnterminatedSection,
                    Range::on_line(line.index, 0, line.width()),
                    "Section header must end with ']'.".to_string(),
                ),
                LineKind::Include { value, .. } => guard.check(line, value, &mut emitter),
                LineKind::KeyValue { key, .. } => tracker.record_key(line, key, &mut emitter),
                LineKind::Malformed => emitter.emit(
                    Rule::MalformedKeyValue,
                    Range::on_line(line.index, 0, line.width()),
                    "Key-value pair is malformed. Ensure the format is 'Key=Value'.".to_string(),
                ),
            }
        }

        tracker.finalize(&mut emitter);

        for meter in MeterType::ALL {
            let keys = MeterKeySet::for_meter(*meter, &self.config.meters);
            meters::check_meter_keys(&lines, &keys, &mut emitter);
        }

        emitter.into_sorted()
    }
}

/// Validate `text` against the real filesystem.
pub fn validate_document(text: &str, document_path: &Path, config: &Config) -> Vec<Diagnostic> {
    Validator::new(config).validate(text, document_path)
}

/// Collects diagnostics, applying configured severity overrides.
pub(crate) struct Emitter<'a> {
    settings: &'a ValidateSettings,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Emitter<'a> {
    fn new(settings: &'a ValidateSettings) -> Self {
        Emitter {
            settings,
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn emit(&mut self, rule: Rule, range: Range, message: String) {
        let Some(severity) = Severity::from_level(self.settings.severity_for(rule)) else {
            return;
        };
        self.diagnostics.push(Diagnostic {
            rule,
            severity,
            range,
            message,
        });
    }

    fn into_sorted(mut self) -> Vec<Diagnostic> {
        self.diagnostics.sort_by_key(|diagnostic| diagnostic.range.start);
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rainlint_config::SeverityLevel;

    struct NothingExists;

    impl PathLookup for NothingExists {
        fn exists(&self, _path: &Path) -> bool {
            false
        }
    }

    fn run(config: &Config, text: &str) -> Vec<Diagnostic> {
        Validator::with_lookup(config, &NothingExists)
            .validate(text, Path::new("/skins/Suite/Main.ini"))
    }

    #[test]
    fn malformed_line_and_missing_sections() {
        let diagnostics = run(&Config::default(), "keywithoutequals\n");
        let rules: Vec<_> = diagnostics.iter().map(|d| d.rule).collect();
        assert_eq!(rules.len(), 3);
        assert!(rules.contains(&Rule::MalformedKeyValue));
        assert!(rules.contains(&Rule::MissingRainmeter));
        assert!(rules.contains(&Rule::MissingVariables));

        let malformed = diagnostics
            .iter()
            .find(|d| d.rule == Rule::MalformedKeyValue)
            .expect("malformed diagnostic");
        assert_eq!(malformed.range, Range::on_line(0, 0, 16));
        assert_eq!(malformed.severity, Severity::Error);
    }

    #[test]
    fn leading_byte_order_mark_is_ignored() {
        let diagnostics = run(
            &Config::default(),
            "\u{feff}[Rainmeter]\nUpdate=1000\n[Variables]\nX=1\n",
        );
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn ignore_override_drops_rule() {
        let mut config = Config::default();
        config
            .validate
            .severity
            .insert(Rule::MissingVariables, SeverityLevel::Ignore);
        config
            .validate
            .severity
            .insert(Rule::MissingRainmeter, SeverityLevel::Hint);

        let diagnostics = run(&config, "");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].rule, Rule::MissingRainmeter);
        assert_eq!(diagnostics[0].severity, Severity::Hint);
    }

    #[test]
    fn output_is_sorted_by_position() {
        let diagnostics = run(
            &Config::default(),
            "[Variables]\nA=1\nA=2\n[Broken\n[Rainmeter]\nbad line\n",
        );
        let lines: Vec<_> = diagnostics.iter().map(|d| d.range.start.line).collect();
        let mut sorted = lines.clone();
        sorted.sort();
        assert_eq!(lines, sorted);
        assert_eq!(
            diagnostics
                .iter()
                .map(|d| d.rule)
                .collect::<Vec<_>>(),
            vec![
                Rule::DuplicateKey,
                Rule::UnterminatedSection,
                Rule::MalformedKeyValue
            ]
        );
    }
}
