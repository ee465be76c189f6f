//! Value completion for well-known skin options.

use serde::Serialize;

/// A suggested value for the option on the current line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CompletionItem {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

impl CompletionItem {
    fn plain(label: impl Into<String>) -> Self {
        CompletionItem {
            label: label.into(),
            documentation: None,
        }
    }

    fn documented(label: &str, documentation: &str) -> Self {
        CompletionItem {
            label: label.to_string(),
            documentation: Some(documentation.to_string()),
        }
    }
}

enum Values {
    Plain(&'static [&'static str]),
    Documented(&'static [(&'static str, &'static str)]),
    Numeric { start: i32, end: i32, step: i32 },
}

struct CompletionRule {
    keys: &'static [&'static str],
    values: Values,
}

const METER_TYPES: &[&str] = &[
    "Shape", "Image", "String", "Bar", "Bitmap", "Button", "Histogram", "Line", "Rotator",
    "Roundline",
];

const MEASURE_TYPES: &[&str] = &[
    "Calc",
    "Plugin",
    "Time",
    "CPU",
    "FreeDiskSpace",
    "Loop",
    "MediaKey",
    "Memory",
    "Net",
    "NowPlaying",
    "Process",
    "RecycleManager",
    "Registry",
    "Script",
    "String",
    "SysInfo",
    "UpTime",
    "WebParser",
    "WifiStatus",
];

const PLUGIN_TYPES: &[&str] = &[
    "ActionTimer",
    "AdvancedCPU",
    "AudioLevel",
    "CoreTemp",
    "FileView",
    "FolderInfo",
    "InputText",
    "iTunesPlugin",
    "MediaKey",
    "NowPlaying",
    "PerfMon",
    "PingPlugin",
    "PowerPlugin",
    "QuotePlugin",
    "RecycleManager",
    "ResMon",
    "RunCommand",
    "SpeedFanPlugin",
    "SysInfo",
    "UsageMonitor",
    "WebParser",
    "WiFiStatus",
    "Win7AudioPlugin",
    "WindowMessagePlugin",
];

const STRING_ALIGNMENTS: &[&str] = &[
    "Left",
    "Center",
    "Right",
    "LeftTop",
    "CenterTop",
    "RightTop",
    "LeftCenter",
    "CenterCenter",
    "RightCenter",
    "LeftBottom",
    "CenterBottom",
    "RightBottom",
];

const BINARY_KEYS: &[&str] = &[
    "DynamicVariables",
    "AlwaysOnTop",
    "AutoSelectScreen",
    "MouseActionCursor",
    "PreserveAspectRatio",
    "Hidden",
    "AntiAlias",
    "GreyScale",
    "AutoScale",
    "UseExifOrientation",
    "Tile",
    "HorizontalLines",
    "Solid",
    "Percentual",
    "Draggable",
    "SnapEdges",
    "StartHidden",
    "KeepOnScreen",
    "DynamicWindowSize",
    "AccurateText",
    "ToolTipHidden",
    "Blur",
    "RegExpSubstitute",
    "DefaultClickThrough",
    "DefaultKeepOnScreen",
    "DefaultAutoSelectScreen",
    "DefaultSavePosition",
    "DefaultDraggable",
    "DefaultSnapEdges",
    "DefaultStartHidden",
];

const COLOR_KEYS: &[&str] = &[
    "FontColor",
    "FontEffectColor",
    "SolidColor",
    "SolidColor2",
    "ImageTint",
    "PrimaryImageTint",
    "SecondaryImageTint",
    "BothImageTint",
    "PrimaryColor",
    "SecondaryColor",
    "BothColor",
    "LineColor",
    "HorizontalLineColor",
    "SelectedColor",
];

const COLOR_PRESETS: &[(&str, &str)] = &[
    ("255,255,255,255", "White color with full opacity."),
    ("0,0,0,255", "Black color with full opacity."),
    ("255,0,0,255", "Red color with full opacity."),
    ("0,255,0,255", "Green color with full opacity."),
    ("0,0,255,255", "Blue color with full opacity."),
    ("128,128,128,255", "Gray color with full opacity."),
    ("255,255,0,255", "Yellow color with full opacity."),
];

const IMAGE_CROP: &[(&str, &str)] = &[(
    "TopLeft,TopRight,BottomRight,BottomLeft,Center",
    "Crop origins. Example: ImageCrop=-50,-30,100,60,5",
)];

const TRANSFORM_STROKE: &[(&str, &str)] = &[
    (
        "Normal",
        "The line width is affected by scale or skew transforms from TransformationMatrix.",
    ),
    (
        "Fixed",
        "The line width stays at LineWidth regardless of TransformationMatrix.",
    ),
];

const HOVER_ACTIONS: &[(&str, &str)] = &[
    ("0", "Do nothing (default). No action is taken."),
    (
        "1",
        "Hide. The skin fades between AlphaValue and hidden, or between fully visible and hidden when no AlphaValue is set.",
    ),
    ("2", "Fade in. The skin fades between AlphaValue and fully visible."),
    ("3", "Fade out. The skin fades between AlphaValue and hidden."),
];

const RULES: &[CompletionRule] = &[
    CompletionRule {
        keys: &["Meter"],
        values: Values::Plain(METER_TYPES),
    },
    CompletionRule {
        keys: &["Measure"],
        values: Values::Plain(MEASURE_TYPES),
    },
    CompletionRule {
        keys: &["Plugin"],
        values: Values::Plain(PLUGIN_TYPES),
    },
    CompletionRule {
        keys: &["StringAlign"],
        values: Values::Plain(STRING_ALIGNMENTS),
    },
    CompletionRule {
        keys: &["BitmapAlign"],
        values: Values::Plain(&["Center", "Left", "Right"]),
    },
    CompletionRule {
        keys: &["GraphStart"],
        values: Values::Plain(&["Left", "Right"]),
    },
    CompletionRule {
        keys: &["ImageCrop", "PrimaryImageCrop", "SecondaryImageCrop", "BothImageCrop"],
        values: Values::Documented(IMAGE_CROP),
    },
    CompletionRule {
        keys: BINARY_KEYS,
        values: Values::Plain(&["0", "1"]),
    },
    CompletionRule {
        keys: &["BarOrientation", "GraphOrientation"],
        values: Values::Plain(&["Horizontal", "Vertical"]),
    },
    CompletionRule {
        keys: &["ImageFlip", "PrimaryImageFlip", "SecondaryImageFlip", "BothImageFlip"],
        values: Values::Plain(&["None", "Horizontal", "Vertical", "Both"]),
    },
    CompletionRule {
        keys: COLOR_KEYS,
        values: Values::Documented(COLOR_PRESETS),
    },
    CompletionRule {
        keys: &["OnHover", "DefaultOnHover"],
        values: Values::Documented(HOVER_ACTIONS),
    },
    CompletionRule {
        keys: &["StringCase"],
        values: Values::Plain(&["None", "Upper", "Lower", "Proper"]),
    },
    CompletionRule {
        keys: &["StringStyle"],
        values: Values::Plain(&["Normal", "Bold", "Italic", "BoldItalic"]),
    },
    CompletionRule {
        keys: &["StringEffect"],
        values: Values::Plain(&["None", "Shadow", "Border"]),
    },
    CompletionRule {
        keys: &["FontFace"],
        values: Values::Plain(&[
            "Arial",
            "Calibri",
            "Consolas",
            "Georgia",
            "Helvetica",
            "Impact",
            "Roboto",
            "Segoe UI",
            "Tahoma",
            "Verdana",
        ]),
    },
    CompletionRule {
        keys: &["MouseActionCursorName"],
        values: Values::Plain(&[
            "HAND", "TEXT", "HELP", "BUSY", "CROSS", "PEN", "NO", "SIZE_ALL", "SIZE_NESW",
            "SIZE_NS", "SIZE_NWSE", "SIZE_WE", "UPARROW", "WAIT",
        ]),
    },
    CompletionRule {
        keys: &["TransformStroke"],
        values: Values::Documented(TRANSFORM_STROKE),
    },
    CompletionRule {
        keys: &["FontWeight"],
        values: Values::Numeric {
            start: 100,
            end: 900,
            step: 100,
        },
    },
    CompletionRule {
        keys: &["Update", "UpdateDivider", "DefaultUpdateDivider"],
        values: Values::Numeric {
            start: 0,
            end: 1000,
            step: 50,
        },
    },
    CompletionRule {
        keys: &[
            "ImageAlpha",
            "PrimaryImageAlpha",
            "SecondaryImageAlpha",
            "BothImageAlpha",
            "AlphaValue",
            "DefaultAlphaValue",
        ],
        values: Values::Numeric {
            start: 0,
            end: 250,
            step: 50,
        },
    },
    CompletionRule {
        keys: &["FadeDuration", "DefaultFadeDuration"],
        values: Values::Numeric {
            start: 250,
            end: 2500,
            step: 50,
        },
    },
    CompletionRule {
        keys: &["BitmapSeparation"],
        values: Values::Numeric {
            start: -2,
            end: 2,
            step: 1,
        },
    },
    CompletionRule {
        keys: &["BitmapFrames"],
        values: Values::Numeric {
            start: 0,
            end: 10,
            step: 1,
        },
    },
    CompletionRule {
        keys: &["ClipString"],
        values: Values::Numeric {
            start: 0,
            end: 2,
            step: 1,
        },
    },
    CompletionRule {
        keys: &["NumOfDecimals", "Scale"],
        values: Values::Numeric {
            start: 1,
            end: 3,
            step: 1,
        },
    },
    CompletionRule {
        keys: &["LoadOrder"],
        values: Values::Numeric {
            start: -1,
            end: 2,
            step: 1,
        },
    },
    CompletionRule {
        keys: &["DefaultAlwaysOnTop"],
        values: Values::Numeric {
            start: -2,
            end: 2,
            step: 1,
        },
    },
    CompletionRule {
        keys: &["GradientAngle"],
        values: Values::Numeric {
            start: 0,
            end: 360,
            step: 90,
        },
    },
];

/// Suggestions for `line_text`, offered only while the value is still empty.
pub fn complete(line_text: &str) -> Vec<CompletionItem> {
    let Some((key, value)) = line_text.trim().split_once('=') else {
        return Vec::new();
    };
    if !value.trim().is_empty() {
        return Vec::new();
    }
    let key = key.trim();

    RULES
        .iter()
        .find(|rule| rule.keys.iter().any(|known| known.eq_ignore_ascii_case(key)))
        .map(|rule| expand(&rule.values))
        .unwrap_or_default()
}

fn expand(values: &Values) -> Vec<CompletionItem> {
    match values {
        Values::Plain(labels) => labels.iter().map(|label| CompletionItem::plain(*label)).collect(),
        Values::Documented(entries) => entries
            .iter()
            .map(|(label, doc)| CompletionItem::documented(label, doc))
            .collect(),
        Values::Numeric { start, end, step } => (*start..=*end)
            .step_by(*step as usize)
            .map(|value| CompletionItem::plain(value.to_string()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[CompletionItem]) -> Vec<&str> {
        items.iter().map(|item| item.label.as_str()).collect()
    }

    #[test]
    fn meter_types_offered_for_empty_value() {
        let items = complete("  meter = ");
        assert_eq!(labels(&items).len(), 10);
        assert_eq!(items[0].label, "Shape");
    }

    #[test]
    fn nothing_once_a_value_is_typed() {
        assert!(complete("Meter=Str").is_empty());
        assert!(complete("Meter").is_empty());
    }

    #[test]
    fn numeric_ranges_include_both_ends() {
        let weights = complete("FontWeight=");
        assert_eq!(labels(&weights).first(), Some(&"100"));
        assert_eq!(labels(&weights).last(), Some(&"900"));
        assert_eq!(weights.len(), 9);

        let update = complete("Update=");
        assert_eq!(update.len(), 21);
        assert_eq!(update.last().map(|item| item.label.as_str()), Some("1000"));

        assert_eq!(labels(&complete("BitmapSeparation=")), vec!["-2", "-1", "0", "1", "2"]);
    }

    #[test]
    fn hover_actions_are_documented() {
        for line in ["OnHover=", "defaultonhover="] {
            let items = complete(line);
            assert_eq!(labels(&items), vec!["0", "1", "2", "3"]);
            assert!(items[2]
                .documentation
                .as_deref()
                .is_some_and(|doc| doc.starts_with("Fade in.")));
        }
    }

    #[test]
    fn colour_presets_carry_documentation() {
        let items = complete("FontColor=");
        assert_eq!(items[0].label, "255,255,255,255");
        assert_eq!(
            items[0].documentation.as_deref(),
            Some("White color with full opacity.")
        );
    }

    #[test]
    fn binary_options_offer_zero_and_one() {
        assert_eq!(labels(&complete("DynamicVariables=")), vec!["0", "1"]);
        assert!(complete("UnknownOption=").is_empty());
    }
}
