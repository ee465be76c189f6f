//! Allow-list checks for the key blocks of typed meters.

use rainlint_config::{MeterSettings, MeterType, Rule};
use rainlint_format::Range;
use rainlint_parser::{char_len, Line, LineKind};
use strsim::normalized_levenshtein;

use super::Emitter;

const STRING_KEYS: &[&str] = &[
    "Text",
    "FontSize",
    "FontColor",
    "FontFace",
    "FontWeight",
    "FontEffectColor",
    "StringStyle",
    "StringAlign",
    "StringCase",
    "StringEffect",
    "Padding",
    "AntiAlias",
    "ClipString",
    "ClipStringW",
    "ClipStringH",
    "Angle",
    "Prefix",
    "Postfix",
    "Percentual",
    "AutoScale",
    "NumOfDecimals",
    "TransformationMatrix",
];

const IMAGE_KEYS: &[&str] = &[
    "ImageName",
    "ImagePath",
    "ImageTint",
    "ImageAlpha",
    "ImageRotate",
    "ImageFlip",
    "ImageCrop",
    "ImageDivide",
    "PreserveAspectRatio",
    "ScaleMargins",
    "Tile",
    "GreyScale",
    "MaskImageName",
    "UseExifOrientation",
];

/// General meter options accepted in every meter block.
const SHARED_KEYS: &[&str] = &[
    "Meter",
    "MeterStyle",
    "DynamicVariables",
    "SolidColor",
    "SolidColor2",
    "GradientAngle",
    "BevelType",
    "X",
    "Y",
    "W",
    "H",
    "Hidden",
    "UpdateDivider",
    "OnUpdateAction",
    "Group",
    "Container",
    "ToolTipText",
    "ToolTipTitle",
    "ToolTipIcon",
    "ToolTipType",
    "ToolTipWidth",
    "ToolTipHidden",
    "LeftMouseUpAction",
    "LeftMouseDownAction",
    "LeftMouseDoubleClickAction",
    "RightMouseUpAction",
    "RightMouseDownAction",
    "RightMouseDoubleClickAction",
    "MiddleMouseUpAction",
    "MiddleMouseDownAction",
    "MiddleMouseDoubleClickAction",
    "MouseOverAction",
    "MouseLeaveAction",
    "MouseScrollUpAction",
    "MouseScrollDownAction",
    "MouseActionCursor",
    "MouseActionCursorName",
];

/// A key family made of a literal prefix and an optional decimal suffix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NumberedKey {
    pub prefix: &'static str,
}

impl NumberedKey {
    pub const fn new(prefix: &'static str) -> Self {
        NumberedKey { prefix }
    }

    /// `MeasureName`, `measurename2` and `MeasureName10` all match `MeasureName`.
    pub fn matches(&self, key: &str) -> bool {
        let len = self.prefix.len();
        key.len() >= len
            && key.is_char_boundary(len)
            && key[..len].eq_ignore_ascii_case(self.prefix)
            && key[len..].bytes().all(|byte| byte.is_ascii_digit())
    }
}

/// Numbered key families recognised in every meter block.
pub const NUMBERED_KEYS: &[NumberedKey] = &[
    NumberedKey::new("MeasureName"),
    NumberedKey::new("InlineSetting"),
    NumberedKey::new("InlinePattern"),
    NumberedKey::new("LineColor"),
    NumberedKey::new("Scale"),
    NumberedKey::new("Shape"),
];

/// Keys permitted for one meter type.
#[derive(Clone, Debug)]
pub struct MeterKeySet {
    pub meter: MeterType,
    pub keys: Vec<String>,
    pub shared: &'static [&'static str],
}

impl MeterKeySet {
    /// Built-in keys for `meter` plus any configured extensions.
    pub fn for_meter(meter: MeterType, settings: &MeterSettings) -> Self {
        let builtin = match meter {
            MeterType::String => STRING_KEYS,
            MeterType::Image => IMAGE_KEYS,
        };
        let mut keys: Vec<String> = builtin.iter().map(|key| key.to_string()).collect();
        for extra in settings.extra_keys_for(meter) {
            if !keys.iter().any(|key| key.eq_ignore_ascii_case(extra)) {
                keys.push(extra.clone());
            }
        }
        MeterKeySet {
            meter,
            keys,
            shared: SHARED_KEYS,
        }
    }

    pub fn allows(&self, key: &str) -> bool {
        self.keys.iter().any(|allowed| allowed.eq_ignore_ascii_case(key))
            || self.shared.iter().any(|allowed| allowed.eq_ignore_ascii_case(key))
    }

    fn suggestion(&self, key: &str) -> Option<&str> {
        let lowered = key.to_lowercase();
        self.keys
            .iter()
            .map(String::as_str)
            .chain(self.shared.iter().copied())
            .map(|candidate| {
                (
                    candidate,
                    normalized_levenshtein(&lowered, &candidate.to_lowercase()),
                )
            })
            .filter(|(_, score)| *score >= 0.7)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(candidate, _)| candidate)
    }
}

#[derive(Clone, Copy)]
enum BlockState<'a> {
    OutsideSection,
    InSection { name: &'a str },
    InMeterBlock { name: &'a str },
}

/// Check every key block declared as `Meter=<keys.meter>`.
pub(crate) fn check_meter_keys(lines: &[Line<'_>], keys: &MeterKeySet, emitter: &mut Emitter<'_>) {
    let meter_name = keys.meter.display_name();
    let mut state = BlockState::OutsideSection;

    for line in lines {
        match line.kind {
            LineKind::SectionHeader { name } => {
                state = BlockState::InSection { name: name.trim() };
            }
            LineKind::KeyValue { key, value } => {
                let section = match state {
                    BlockState::OutsideSection => continue,
                    BlockState::InSection { name } | BlockState::InMeterBlock { name } => name,
                };
                if declares_meter(line.trimmed(), meter_name) {
                    state = BlockState::InMeterBlock { name: section };
                    continue;
                }
                if let BlockState::InMeterBlock { .. } = state {
                    check_key(line, key, value, section, keys, emitter);
                }
            }
            _ => {}
        }
    }
}

/// Whole trimmed line equals `meter=<type>`, ignoring ASCII case. Spaced
/// forms such as `Meter = String` do not open a block.
fn declares_meter(trimmed: &str, meter_name: &str) -> bool {
    const PREFIX: &str = "meter=";
    trimmed
        .get(..PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(PREFIX))
        && trimmed[PREFIX.len()..].eq_ignore_ascii_case(meter_name)
}

fn check_key(
    line: &Line<'_>,
    key: &str,
    value: &str,
    section: &str,
    keys: &MeterKeySet,
    emitter: &mut Emitter<'_>,
) {
    let range = Range::on_line(line.index, line.indent, line.indent + char_len(key));

    if NUMBERED_KEYS.iter().any(|family| family.matches(key)) {
        if value.is_empty() {
            emitter.emit(
                Rule::EmptyNumberedKey,
                range,
                format!("Key '{key}' in [{section}] must have a value."),
            );
        }
        return;
    }

    if keys.allows(key) {
        return;
    }

    let mut message = format!(
        "Invalid key '{key}' in [{section}]. Valid keys for {} are: {} (shared keys: {}).",
        keys.meter,
        keys.keys.join(", "),
        keys.shared.join(", ")
    );
    if let Some(candidate) = keys.suggestion(key) {
        message.push_str(&format!(" Did you mean '{candidate}'?"));
    }
    emitter.emit(Rule::InvalidMeterKey, range, message);
}
