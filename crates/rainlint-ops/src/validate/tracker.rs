use std::collections::HashSet;

use rainlint_config::{Rule, ValidateSettings};
use rainlint_format::Range;
use rainlint_parser::{char_len, Line};

use super::Emitter;

/// Running symbol table of section names and the keys of the open section.
///
/// Names and keys are compared case-insensitively, the way the skin engine
/// reads them, unless `case_sensitive_names` is set.
pub struct SectionTracker<'s> {
    settings: &'s ValidateSettings,
    sections: HashSet<String>,
    current: Option<String>,
    keys: HashSet<String>,
    has_rainmeter: bool,
    has_variables: bool,
}

impl<'s> SectionTracker<'s> {
    pub fn new(settings: &'s ValidateSettings) -> Self {
        SectionTracker {
            settings,
            sections: HashSet::new(),
            current: None,
            keys: HashSet::new(),
            has_rainmeter: false,
            has_variables: false,
        }
    }

    /// Handle a `[name]` header; `raw_name` is the text between the brackets.
    pub(crate) fn open_section(&mut self, line: &Line<'_>, raw_name: &str, emitter: &mut Emitter<'_>) {
        self.keys.clear();

        let name = raw_name.trim();
        let start = line.indent + 1 + char_len(raw_name) - char_len(raw_name.trim_start());
        let name_range = Range::on_line(line.index, start, start + char_len(name));

        if name.is_empty() {
            emitter.emit(
                Rule::EmptySectionName,
                Range::on_line(line.index, line.indent, line.indent + char_len(line.trimmed())),
                "Section name cannot be empty.".to_string(),
            );
            self.current = Some(String::new());
            return;
        }

        let limit = self.settings.max_section_name_length;
        if char_len(name) > limit {
            emitter.emit(
                Rule::SectionNameLength,
                name_range,
                format!("Section name is too long. Maximum allowed length is {limit} characters."),
            );
        }

        if self.settings.strict_section_names && !has_permitted_chars(name) {
            emitter.emit(
                Rule::SectionNameChars,
                name_range,
                "Section header contains invalid characters. Only alphanumeric, underscores, and hyphens are allowed."
                    .to_string(),
            );
        }

        if name.eq_ignore_ascii_case("rainmeter") {
            self.has_rainmeter = true;
        } else if name.eq_ignore_ascii_case("variables") {
            self.has_variables = true;
        }
        let identity = self.identity(name);
        if !self.sections.insert(identity) {
            emitter.emit(
                Rule::DuplicateSection,
                name_range,
                format!("Duplicate section header: [{name}]."),
            );
        }

        self.current = Some(name.to_string());
    }

    /// Record a non-include key of the open section.
    pub(crate) fn record_key(&mut self, line: &Line<'_>, key: &str, emitter: &mut Emitter<'_>) {
        let identity = self.identity(key);
        if self.keys.insert(identity) {
            return;
        }
        let message = match &self.current {
            Some(section) => format!("Duplicate key '{key}' found in section [{section}]."),
            None => format!("Duplicate key '{key}' found before any section."),
        };
        emitter.emit(
            Rule::DuplicateKey,
            Range::on_line(line.index, line.indent, line.indent + char_len(key)),
            message,
        );
    }

    fn identity(&self, name: &str) -> String {
        if self.settings.case_sensitive_names {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    }

    /// Report missing required and recommended sections.
    pub(crate) fn finalize(self, emitter: &mut Emitter<'_>) {
        if !self.has_rainmeter {
            emitter.emit(
                Rule::MissingRainmeter,
                Range::document_start(),
                "Missing required section: [Rainmeter].".to_string(),
            );
        }
        if !self.has_variables {
            emitter.emit(
                Rule::MissingVariables,
                Range::document_start(),
                "Missing recommended section: [Variables].".to_string(),
            );
        }
    }
}

fn has_permitted_chars(name: &str) -> bool {
    name.chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}
