use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rainlint_config::Rule;
use rainlint_format::Range;
use rainlint_parser::{char_len, Line};

use super::{Emitter, MacroTable, PathLookup};
use crate::paths::normalize_path;

/// Checks include targets for existence and repeated inclusion.
///
/// Only the current document is considered: a file included twice here is
/// reported, but included files are never opened, so `A -> B -> A` cycles
/// across files go unnoticed.
pub struct IncludeGuard<'a> {
    file_dir: &'a Path,
    table: &'a MacroTable,
    lookup: &'a dyn PathLookup,
    included: HashSet<PathBuf>,
}

impl<'a> IncludeGuard<'a> {
    pub fn new(file_dir: &'a Path, table: &'a MacroTable, lookup: &'a dyn PathLookup) -> Self {
        IncludeGuard {
            file_dir,
            table,
            lookup,
            included: HashSet::new(),
        }
    }

    /// Check one `@Include` line whose trimmed value is `value`.
    pub(crate) fn check(&mut self, line: &Line<'_>, value: &str, emitter: &mut Emitter<'_>) {
        let raw = value.replace('"', "");
        let raw = raw.trim();
        let resolution = self.table.resolve(raw);
        let value_range = Range::on_line(line.index, value_start(line), line.width());

        if resolution.has_unsupported {
            emitter.emit(
                Rule::UnsupportedMacro,
                value_range,
                format!("Path contains unsupported macros: {raw}. Macros remain unresolved."),
            );
            return;
        }

        let candidate = Path::new(&resolution.path);
        let absolute = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.file_dir.join(candidate)
        };
        let target = normalize_path(&absolute);

        if raw.is_empty() || !self.lookup.exists(&target) {
            emitter.emit(
                Rule::IncludeNotFound,
                value_range,
                format!(
                    "Included file not found: {raw} (Resolved: {}). Ensure the macro resolves to a valid file path.",
                    target.display()
                ),
            );
        } else if self.included.contains(&target) {
            emitter.emit(
                Rule::CircularInclude,
                Range::on_line(line.index, 0, line.width()),
                format!(
                    "Circular include detected for file: {raw} (Resolved: {}).",
                    target.display()
                ),
            );
        } else {
            self.included.insert(target);
        }
    }
}

/// Column just past the first `=` of the line.
fn value_start(line: &Line<'_>) -> usize {
    line.text
        .find('=')
        .map(|idx| char_len(&line.text[..idx]) + 1)
        .unwrap_or(line.indent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rainlint_config::ValidateSettings;
    use rainlint_format::Diagnostic;
    use rainlint_parser::{classify_document, LineKind};

    struct Existing(Vec<PathBuf>);

    impl PathLookup for Existing {
        fn exists(&self, path: &Path) -> bool {
            self.0.iter().any(|known| known == path)
        }
    }

    fn guard_run(text: &str, existing: &[&str]) -> Vec<Diagnostic> {
        let settings = ValidateSettings::default();
        let lookup = Existing(existing.iter().map(PathBuf::from).collect());
        let document = Path::new("/skins/Suite/Clock/Clock.ini");
        let table = MacroTable::build(document, &settings, &lookup);
        let file_dir = Path::new("/skins/Suite/Clock");
        let mut guard = IncludeGuard::new(file_dir, &table, &lookup);
        let mut emitter = Emitter::new(&settings);

        for line in &classify_document(text) {
            if let LineKind::Include { value, .. } = line.kind {
                guard.check(line, value, &mut emitter);
            }
        }
        emitter.into_sorted()
    }

    #[test]
    fn missing_target_mentions_raw_and_resolved() {
        let diagnostics = guard_run(
            "@Include=\"#@#Missing.inc\"\n",
            &["/skins/Suite/@Resources"],
        );
        assert_eq!(diagnostics.len(), 1);
        let message = &diagnostics[0].message;
        assert_eq!(diagnostics[0].rule, Rule::IncludeNotFound);
        assert!(message.contains("#@#Missing.inc"));
        assert!(message.contains("/skins/Suite/@Resources/Missing.inc"));
        assert_eq!(diagnostics[0].range, Range::on_line(0, 9, 25));
    }

    #[test]
    fn second_identical_include_is_circular() {
        let diagnostics = guard_run(
            "@Include=#@#Styles.inc\n@Include2=#ROOTCONFIGPATH#@Resources/Styles.inc\n",
            &["/skins/Suite/@Resources", "/skins/Suite/@Resources/Styles.inc"],
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].rule, Rule::CircularInclude);
        assert_eq!(diagnostics[0].range.start.line, 1);
        assert_eq!(diagnostics[0].range.start.character, 0);
    }

    #[test]
    fn unsupported_macros_skip_existence_check() {
        let diagnostics = guard_run("@Include=#Theme#\\Colors.inc\n", &[]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].rule, Rule::UnsupportedMacro);
        assert!(diagnostics[0]
            .message
            .contains("Path contains unsupported macros: #Theme#\\Colors.inc."));
    }

    #[test]
    fn relative_paths_resolve_against_document_dir() {
        let diagnostics = guard_run(
            "@Include=Parts/Body.inc\n",
            &["/skins/Suite/Clock/Parts/Body.inc"],
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn empty_include_path_is_not_found() {
        let diagnostics = guard_run("@Include=\"\"\n", &["/skins/Suite/Clock"]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].rule, Rule::IncludeNotFound);
    }
}
