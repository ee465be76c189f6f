//! Folding ranges for sections and `;#region` blocks.

use std::sync::LazyLock;

use rainlint_parser::split_lines;
use regex::Regex;
use serde::Serialize;

static SECTION_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[[^\]]+\]\s*(?:;.*)?$").expect("valid regex"));
static REGION_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*;\s*#region\b").expect("valid regex"));
static REGION_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*;\s*#endregion\b").expect("valid regex"));

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FoldKind {
    Section,
    Region,
}

impl FoldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FoldKind::Section => "section",
            FoldKind::Region => "region",
        }
    }
}

/// Inclusive, zero-based line span that can be collapsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FoldingRange {
    pub start_line: usize,
    pub end_line: usize,
    pub kind: FoldKind,
}

/// Compute section folds followed by region folds.
pub fn folding_ranges(text: &str) -> Vec<FoldingRange> {
    let lines = split_lines(text);
    let mut ranges = section_ranges(&lines);
    ranges.extend(region_ranges(&lines));
    ranges
}

fn section_ranges(lines: &[&str]) -> Vec<FoldingRange> {
    let headers: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| SECTION_HEADER.is_match(line.trim()))
        .map(|(index, _)| index)
        .collect();

    headers
        .iter()
        .enumerate()
        .filter_map(|(position, &start)| {
            let next = headers.get(position + 1).copied().unwrap_or(lines.len());
            let end = (start + 1..next)
                .rev()
                .find(|&index| !lines[index].trim().is_empty())?;
            Some(FoldingRange {
                start_line: start,
                end_line: end,
                kind: FoldKind::Section,
            })
        })
        .collect()
}

fn region_ranges(lines: &[&str]) -> Vec<FoldingRange> {
    let mut open = Vec::new();
    let mut ranges = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        let line = line.trim();
        if REGION_START.is_match(line) {
            open.push(index);
        } else if REGION_END.is_match(line) {
            if let Some(start) = open.pop() {
                ranges.push(FoldingRange {
                    start_line: start,
                    end_line: index,
                    kind: FoldKind::Region,
                });
            }
        }
    }
    ranges
}
