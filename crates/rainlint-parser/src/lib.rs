//! Line classification for skin configuration files.
//!
//! A skin file is read one line at a time. Every line is classified exactly
//! once by an ordered table of matchers; the first matcher that accepts the
//! trimmed text decides the kind. Nothing here looks beyond the current line,
//! so the classifier can be exercised on single lines in isolation.

/// Key prefix that marks an include directive (`@Include`, `@Include2`, ...).
pub const INCLUDE_PREFIX: &str = "@include";

/// Syntactic category of a single line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind<'a> {
    Blank,
    /// Line starting with `;`.
    Comment,
    /// `[Name]`; `name` is the untrimmed text between the brackets.
    SectionHeader { name: &'a str },
    /// Starts with `[` but lacks the closing `]`.
    UnterminatedHeader,
    /// `@Include...=path`; `value` is trimmed.
    Include { key: &'a str, value: &'a str },
    /// `key=value`; both sides trimmed, value may be empty.
    KeyValue { key: &'a str, value: &'a str },
    /// Anything else, most commonly a line without `=`.
    Malformed,
}

/// A classified line with enough positional data to anchor diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Line<'a> {
    /// Zero-based line number in the source text.
    pub index: usize,
    /// Raw line text without its line terminator.
    pub text: &'a str,
    /// Column (in characters) of the first non-whitespace character.
    pub indent: usize,
    pub kind: LineKind<'a>,
}

impl<'a> Line<'a> {
    /// Line length in characters.
    pub fn width(&self) -> usize {
        char_len(self.text)
    }

    /// The line with surrounding whitespace removed.
    pub fn trimmed(&self) -> &'a str {
        self.text.trim()
    }
}

type Matcher = for<'a> fn(&'a str) -> Option<LineKind<'a>>;

/// Matchers in evaluation order. The include matcher must run before the
/// generic key/value matcher.
const MATCHERS: &[Matcher] = &[
    match_blank,
    match_comment,
    match_section,
    match_include,
    match_key_value,
];

/// Classify a single line of text.
pub fn classify(text: &str) -> LineKind<'_> {
    let trimmed = text.trim();
    MATCHERS
        .iter()
        .find_map(|matcher| matcher(trimmed))
        .unwrap_or(LineKind::Malformed)
}

/// Split `text` into lines and classify each of them, preserving indices.
pub fn classify_document(text: &str) -> Vec<Line<'_>> {
    split_lines(text)
        .into_iter()
        .enumerate()
        .map(|(index, text)| Line {
            index,
            text,
            indent: char_len(text) - char_len(text.trim_start()),
            kind: classify(text),
        })
        .collect()
}

/// Split on `\n`, dropping a trailing `\r` from every line.
///
/// A trailing newline produces a final empty line, mirroring how editors
/// number lines.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Length of `text` in characters, the unit used for every column.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Case-insensitive check for the include key prefix.
pub fn is_include_key(key: &str) -> bool {
    key.len() >= INCLUDE_PREFIX.len()
        && key.is_char_boundary(INCLUDE_PREFIX.len())
        && key[..INCLUDE_PREFIX.len()].eq_ignore_ascii_case(INCLUDE_PREFIX)
}

fn match_blank(trimmed: &str) -> Option<LineKind<'_>> {
    trimmed.is_empty().then_some(LineKind::Blank)
}

fn match_comment(trimmed: &str) -> Option<LineKind<'_>> {
    trimmed.starts_with(';').then_some(LineKind::Comment)
}

fn match_section(trimmed: &str) -> Option<LineKind<'_>> {
    let rest = trimmed.strip_prefix('[')?;
    match rest.strip_suffix(']') {
        Some(name) => Some(LineKind::SectionHeader { name }),
        None => Some(LineKind::UnterminatedHeader),
    }
}

fn match_include(trimmed: &str) -> Option<LineKind<'_>> {
    let (key, value) = split_pair(trimmed)?;
    is_include_key(key).then_some(LineKind::Include { key, value })
}

fn match_key_value(trimmed: &str) -> Option<LineKind<'_>> {
    let (key, value) = split_pair(trimmed)?;
    Some(LineKind::KeyValue { key, value })
}

fn split_pair(trimmed: &str) -> Option<(&str, &str)> {
    let (key, value) = trimmed.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}
