//! Canonical layout for skin files.

use rainlint_parser::{classify, split_lines, LineKind};

/// Reformat a skin file.
///
/// Lines are trimmed and blank lines dropped, `key = value` becomes
/// `key=value`, and every section header after the first output line is
/// preceded by exactly one blank line. The result ends with a single newline.
pub fn format_document(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();

    for raw in split_lines(text) {
        let line = raw.trim();
        match classify(line) {
            LineKind::Blank => continue,
            LineKind::SectionHeader { .. } => {
                if !out.is_empty() {
                    out.push(String::new());
                }
                out.push(line.to_string());
            }
            LineKind::KeyValue { key, value } | LineKind::Include { key, value } => {
                out.push(format!("{key}={value}"));
            }
            LineKind::Comment | LineKind::UnterminatedHeader | LineKind::Malformed => {
                out.push(line.to_string());
            }
        }
    }

    let mut formatted = out.join("\n");
    formatted.push('\n');
    formatted
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalizes_spacing_and_section_breaks() {
        let input = "\n\n  [Rainmeter]  \nUpdate = 1000\n\n\n[Variables]\n; colours\n  Color = 255, 0, 0 \n[Meter]\nMeter=String\n";
        let expected = "[Rainmeter]\nUpdate=1000\n\n[Variables]\n; colours\nColor=255, 0, 0\n\n[Meter]\nMeter=String\n";
        assert_eq!(format_document(input), expected);
    }

    #[test]
    fn comments_with_equals_are_left_alone() {
        assert_eq!(format_document("; a = b\n"), "; a = b\n");
    }

    #[test]
    fn formatting_is_idempotent() {
        let input = "[A]\r\nx = 1\r\n\r\n\r\n[B]\r\n@Include = #@#x.inc\r\nbroken line\r\n";
        let once = format_document(input);
        assert_eq!(format_document(&once), once);
        assert_eq!(once, "[A]\nx=1\n\n[B]\n@Include=#@#x.inc\nbroken line\n");
    }
}
