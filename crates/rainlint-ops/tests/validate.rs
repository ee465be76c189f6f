use std::path::Path;

use rainlint_config::{Config, Rule, SkinsRootPolicy};
use rainlint_format::{Diagnostic, Position, Severity};
use rainlint_ops::validate::MacroTable;
use rainlint_ops::validate_document;
use rainlint_test_support::SkinTree;

const HEADER: &str = "[Rainmeter]\nUpdate=1000\n[Variables]\nX=1\n";

fn rules(diagnostics: &[Diagnostic]) -> Vec<Rule> {
    diagnostics.iter().map(|diagnostic| diagnostic.rule).collect()
}

fn validate(tree: &SkinTree, relative: &str, text: &str) -> Vec<Diagnostic> {
    let path = tree.write(relative, text);
    validate_document(text, &path, &tree.config())
}

#[test]
fn bogus_key_in_string_meter_is_the_only_error() {
    let text = "[Rainmeter]\nUpdate=1000\n[Variables]\nX=1\n[Meter]\nmeter=String\nText=Hi\nBogusKey=1\n";
    let diagnostics = validate_document(text, Path::new("/skins/Suite/Main/Main.ini"), &Config::default());

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].rule, Rule::InvalidMeterKey);
    assert_eq!(diagnostics[0].severity, Severity::Error);
    assert_eq!(diagnostics[0].range.start, Position::new(7, 0));
    assert!(diagnostics[0].message.contains("'BogusKey'"));
    assert!(diagnostics[0].message.contains("Valid keys for String"));
}

#[test]
fn key_without_equals_is_malformed() {
    let diagnostics = validate_document("keywithoutequals\n", Path::new("/tmp/a.ini"), &Config::default());

    assert_eq!(
        rules(&diagnostics),
        vec![
            Rule::MalformedKeyValue,
            Rule::MissingRainmeter,
            Rule::MissingVariables
        ]
    );
    let malformed = &diagnostics[0];
    assert_eq!(malformed.severity, Severity::Error);
    assert_eq!(malformed.range.start.line, 0);
    assert!(malformed.message.contains("malformed"));
}

#[test]
fn empty_numbered_key_warns_without_invalid_key_error() {
    let text = format!("{HEADER}[Meter]\nMeter=String\nMeasureName2=\n");
    let diagnostics = validate_document(&text, Path::new("/tmp/a.ini"), &Config::default());

    assert_eq!(rules(&diagnostics), vec![Rule::EmptyNumberedKey]);
    assert_eq!(diagnostics[0].severity, Severity::Warning);
    assert!(diagnostics[0].message.contains("must have a value"));
}

#[test]
fn present_sections_suppress_missing_section_diagnostics() {
    let diagnostics = validate_document(HEADER, Path::new("/tmp/a.ini"), &Config::default());
    assert!(diagnostics.is_empty());

    let lowercase = "[rainmeter]\n[VARIABLES]\n";
    assert!(validate_document(lowercase, Path::new("/tmp/a.ini"), &Config::default()).is_empty());
}

#[test]
fn duplicates_are_anchored_at_the_later_occurrence() {
    let text = format!("{HEADER}[Meter]\nA=1\nA=2\n[Meter]\nB=1\n");
    let diagnostics = validate_document(&text, Path::new("/tmp/a.ini"), &Config::default());

    assert_eq!(rules(&diagnostics), vec![Rule::DuplicateKey, Rule::DuplicateSection]);
    assert_eq!(diagnostics[0].range.start.line, 6);
    assert_eq!(diagnostics[1].range.start.line, 7);
    assert!(diagnostics.iter().all(|d| d.severity == Severity::Warning));
}

#[test]
fn missing_include_reports_raw_and_resolved_path() {
    let tree = SkinTree::with_suite("Suite");
    let text = format!("{HEADER}@Include=#@#Variables.inc\n");
    let diagnostics = validate(&tree, "Suite/Main/Main.ini", &text);

    assert_eq!(rules(&diagnostics), vec![Rule::IncludeNotFound]);
    let message = &diagnostics[0].message;
    assert!(message.contains("#@#Variables.inc"));
    let resolved = tree.skins().join("Suite").join("@Resources").join("Variables.inc");
    assert!(message.contains(&resolved.display().to_string()), "{message}");
}

#[test]
fn second_include_of_same_file_is_circular() {
    let tree = SkinTree::with_suite("Suite");
    tree.write("Suite/@Resources/Variables.inc", "[Variables]\n");
    let text = format!(
        "{HEADER}@Include=#@#Variables.inc\n@Include2=\"#ROOTCONFIGPATH#@Resources/Variables.inc\"\n"
    );
    let diagnostics = validate(&tree, "Suite/Main/Main.ini", &text);

    assert_eq!(rules(&diagnostics), vec![Rule::CircularInclude]);
    assert_eq!(diagnostics[0].range.start.line, 5);
}

#[test]
fn relative_includes_resolve_next_to_the_document() {
    let tree = SkinTree::with_suite("Suite");
    tree.write("Suite/Main/Shared.inc", "");
    let text = format!("{HEADER}@Include=Shared.inc\n@IncludeMore=#CURRENTPATH#Shared.inc\n");
    let diagnostics = validate(&tree, "Suite/Main/Main.ini", &text);

    assert_eq!(rules(&diagnostics), vec![Rule::CircularInclude]);
}

#[test]
fn unknown_macros_are_hints_not_missing_files() {
    let tree = SkinTree::with_suite("Suite");
    let text = format!("{HEADER}@Include=#MyFolder#Variables.inc\n");
    let diagnostics = validate(&tree, "Suite/Main/Main.ini", &text);

    assert_eq!(rules(&diagnostics), vec![Rule::UnsupportedMacro]);
    assert_eq!(diagnostics[0].severity, Severity::Hint);
}

#[test]
fn supported_macros_leave_no_tokens_behind() {
    let tree = SkinTree::with_suite("Suite");
    let document = tree.write("Suite/Main/Main.ini", HEADER);
    let config = tree.config();
    let table = MacroTable::build(&document, &config.validate, &rainlint_ops::validate::DiskLookup);

    let raw = "#@##SKINSPATH##CURRENTPATH##CURRENTFILE##ROOTCONFIGPATH##ROOTCONFIG##CURRENTCONFIG#";
    let resolution = table.resolve(raw);
    assert!(!resolution.has_unsupported);
    assert!(!resolution.path.contains('#'));
    assert_eq!(table.current_file, "Main.ini");
    assert_eq!(table.root_config, "Suite");
    assert_eq!(table.current_config, "Suite/Main");

    let plain = table.resolve("C:/Skins/plain.inc");
    assert_eq!(plain.path, "C:/Skins/plain.inc");
    assert!(!plain.has_unsupported);
}

#[test]
fn skins_folder_policy_finds_named_ancestor() {
    let tree = SkinTree::with_suite("Suite");
    let document = tree.write("Suite/Deep/Nested/Main.ini", HEADER);
    let mut config = tree.config();
    config.validate.skins_root = SkinsRootPolicy::SkinsFolder;
    let table = MacroTable::build(&document, &config.validate, &rainlint_ops::validate::DiskLookup);

    assert_eq!(table.current_config, "Suite/Deep/Nested");
    assert!(table.resources.contains("@Resources"));
}
