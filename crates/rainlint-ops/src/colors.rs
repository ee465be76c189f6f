//! Color literals embedded in skin values.

use std::sync::LazyLock;

use rainlint_format::Range;
use rainlint_parser::{char_len, split_lines};
use regex::Regex;
use serde::Serialize;

static COLOR_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,3}),[ \t]*(\d{1,3}),[ \t]*(\d{1,3})\b|\b([0-9a-fA-F]{6})\b")
        .expect("valid regex")
});

/// How a color was written, and how it should be written back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorNotation {
    /// `R,G,B` decimal triplet.
    Rgb,
    /// `RRGGBB` hex triplet.
    Hex,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Rgba {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ColorInfo {
    pub range: Range,
    pub color: Rgba,
    pub notation: ColorNotation,
}

/// Locate every color literal. Matches never span lines.
pub fn document_colors(text: &str) -> Vec<ColorInfo> {
    let mut colors = Vec::new();
    for (index, line) in split_lines(text).into_iter().enumerate() {
        for captures in COLOR_LITERAL.captures_iter(line) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            let start = char_len(&line[..whole.start()]);
            let range = Range::on_line(index, start, start + char_len(whole.as_str()));

            let parsed = match captures.get(4) {
                Some(hex) => parse_hex(hex.as_str()).map(|color| (color, ColorNotation::Hex)),
                None => parse_rgb(&captures).map(|color| (color, ColorNotation::Rgb)),
            };
            if let Some((color, notation)) = parsed {
                colors.push(ColorInfo {
                    range,
                    color,
                    notation,
                });
            }
        }
    }
    colors
}

/// Render `color` in `notation`: `r,g,b` or lower-case `rrggbb`.
pub fn color_presentation(color: Rgba, notation: ColorNotation) -> String {
    match notation {
        ColorNotation::Rgb => format!("{},{},{}", color.red, color.green, color.blue),
        ColorNotation::Hex => format!("{:02x}{:02x}{:02x}", color.red, color.green, color.blue),
    }
}

fn parse_rgb(captures: &regex::Captures<'_>) -> Option<Rgba> {
    let component = |group: usize| -> Option<u8> {
        let value: u16 = captures.get(group)?.as_str().parse().ok()?;
        Some(value.min(255) as u8)
    };
    Some(Rgba {
        red: component(1)?,
        green: component(2)?,
        blue: component(3)?,
        alpha: 255,
    })
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    let channel = |offset: usize| u8::from_str_radix(hex.get(offset..offset + 2)?, 16).ok();
    Some(Rgba {
        red: channel(0)?,
        green: channel(2)?,
        blue: channel(4)?,
        alpha: 255,
    })
}
