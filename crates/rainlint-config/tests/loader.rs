use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use rainlint_config::{
    Config, ConfigError, ConfigSourceKind, LoadOptions, MeterType, Pattern, RefreshMode, Rule,
    SeverityLevel, SkinsRootPolicy,
};
use tempfile::TempDir;

fn write_file(path: impl AsRef<Path>, contents: &str) {
    let mut file = fs::File::create(path).expect("create config");
    file.write_all(contents.as_bytes()).expect("write config");
}

fn canonical(path: impl AsRef<Path>) -> PathBuf {
    fs::canonicalize(path).expect("canonicalize path")
}

fn pattern_strings<'a, I>(patterns: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Pattern>,
{
    patterns
        .into_iter()
        .map(|p| p.original().to_string())
        .collect()
}

fn expect_validation_message(working_dir: &Path, needle: &str) {
    let err = Config::load(LoadOptions::default().with_working_dir(working_dir))
        .expect_err("expected validation failure");

    match err {
        ConfigError::Validation(errors) => {
            let joined = errors.to_string();
            assert!(joined.contains(needle), "unexpected error output: {joined}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn loads_defaults_when_no_files_present() {
    let temp = TempDir::new().expect("tempdir");
    let working_dir = canonical(temp.path());

    let config = Config::load(LoadOptions::default().with_working_dir(working_dir.clone()))
        .expect("load defaults");

    assert_eq!(config.project.root, working_dir);
    assert_eq!(
        pattern_strings(config.project.include.iter()),
        vec![
            "**/*.ini".to_string(),
            "**/*.inc".to_string(),
            "**/*.nek".to_string()
        ]
    );
    assert!(config.project.exclude.is_empty());
    assert!(!config.validate.strict_section_names);
    assert_eq!(config.validate.max_section_name_length, 255);
    assert_eq!(config.validate.resource_folder, "@Resources");
    assert_eq!(config.validate.skins_root, SkinsRootPolicy::ResourcesAnchored);
    assert!(config.validate.trailing_separator);
    assert!(!config.validate.case_sensitive_names);
    assert!(config.validate.severity.is_empty());
    assert!(config.meters.extra_keys.is_empty());
    assert!(config.refresh.auto_refresh_on_save);
    assert_eq!(config.refresh.mode, RefreshMode::All);
    assert!(config.log.path.is_none());

    assert_eq!(config.sources.layers.len(), 1);
    assert_eq!(config.sources.layers[0].kind, ConfigSourceKind::Default);
}

#[test]
fn applies_precedence_and_merges_fields() {
    let temp = TempDir::new().expect("tempdir");
    let git_root = canonical(temp.path());
    fs::create_dir(git_root.join(".git")).expect("create .git");

    write_file(
        git_root.join(".rainlint.toml"),
        r#"
        [project]
        exclude = ["**/Backup/**"]

        [validate]
        strict_section_names = true
        skins_root = "skins-folder"
        case_sensitive_names = true

        [validate.severity]
        duplicate-key = "hint"

        [meters.string]
        extra_keys = ["InlineSetting", "InlinePattern"]
        "#,
    );

    let workspace = git_root.join("workspace");
    fs::create_dir(&workspace).expect("create workspace");

    write_file(
        workspace.join(".rainlint.toml"),
        r#"
        [validate.severity]
        missing-variables = "ignore"

        [refresh]
        mode = "specific"

        [log]
        path = "logs/Rainmeter.log"
        "#,
    );

    let override_path = workspace.join("override.toml");
    write_file(
        &override_path,
        r#"
        [refresh]
        auto_refresh_on_save = false

        [validate.severity]
        duplicate-key = "error"
        "#,
    );

    let config = Config::load(
        LoadOptions::default()
            .with_working_dir(&workspace)
            .with_override_path(&override_path),
    )
    .expect("load config with precedence");

    assert_eq!(config.project.root, canonical(&workspace));
    assert_eq!(
        pattern_strings(config.project.exclude.iter()),
        vec!["**/Backup/**".to_string()]
    );
    assert!(config.validate.strict_section_names);
    assert_eq!(config.validate.skins_root, SkinsRootPolicy::SkinsFolder);
    assert!(config.validate.case_sensitive_names);
    assert_eq!(
        config.validate.severity_for(Rule::DuplicateKey),
        SeverityLevel::Error
    );
    assert_eq!(
        config.validate.severity_for(Rule::MissingVariables),
        SeverityLevel::Ignore
    );
    assert_eq!(
        config.validate.severity_for(Rule::DuplicateSection),
        SeverityLevel::Warning
    );
    assert_eq!(
        config.meters.extra_keys_for(MeterType::String),
        ["InlineSetting".to_string(), "InlinePattern".to_string()]
    );
    assert!(config.meters.extra_keys_for(MeterType::Image).is_empty());
    assert_eq!(config.refresh.mode, RefreshMode::Specific);
    assert!(!config.refresh.auto_refresh_on_save);
    assert_eq!(
        config.log.path.as_deref(),
        Some(canonical(&workspace).join("logs/Rainmeter.log").as_path())
    );

    let kinds: Vec<_> = config
        .sources
        .layers
        .iter()
        .map(|layer| layer.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            ConfigSourceKind::Default,
            ConfigSourceKind::GitRoot,
            ConfigSourceKind::Local,
            ConfigSourceKind::Override
        ]
    );
}

#[test]
fn unknown_rule_in_severity_map_is_rejected() {
    let temp = TempDir::new().expect("tempdir");
    let working_dir = canonical(temp.path());
    write_file(
        working_dir.join(".rainlint.toml"),
        r#"
        [validate.severity]
        duplicate-key = "warning"
        no-such-rule = "error"
        "#,
    );

    expect_validation_message(&working_dir, "unknown rule 'no-such-rule'");
}

#[test]
fn invalid_severity_value_is_rejected() {
    let temp = TempDir::new().expect("tempdir");
    let working_dir = canonical(temp.path());
    write_file(
        working_dir.join(".rainlint.toml"),
        r#"
        [validate.severity]
        duplicate-key = "fatal"
        "#,
    );

    expect_validation_message(&working_dir, "invalid severity 'fatal' for rule 'duplicate-key'");
}

#[test]
fn invalid_glob_pattern_is_rejected() {
    let temp = TempDir::new().expect("tempdir");
    let working_dir = canonical(temp.path());
    write_file(
        working_dir.join(".rainlint.toml"),
        r#"
        [project]
        exclude = ["[["]
        "#,
    );

    expect_validation_message(&working_dir, "invalid glob pattern '[['");
}

#[test]
fn every_problem_is_reported_at_once() {
    let temp = TempDir::new().expect("tempdir");
    let working_dir = canonical(temp.path());
    write_file(
        working_dir.join(".rainlint.toml"),
        r#"
        [validate]
        skins_root = "nearest"
        max_section_name_length = 0

        [meters.bar]
        extra_keys = ["BarColor"]

        [refresh]
        mode = "sometimes"
        executable = ""
        "#,
    );

    let err = Config::load(LoadOptions::default().with_working_dir(&working_dir))
        .expect_err("expected validation failure");
    let ConfigError::Validation(errors) = err else {
        panic!("expected validation error");
    };

    assert_eq!(errors.iter().count(), 5);
    let joined = errors.to_string();
    assert!(joined.contains("unknown skins root policy 'nearest'"));
    assert!(joined.contains("max_section_name_length must be greater than 0"));
    assert!(joined.contains("unknown meter type 'bar'"));
    assert!(joined.contains("unknown refresh mode 'sometimes'"));
    assert!(joined.contains("executable path cannot be empty"));
    assert!(joined.contains("local config at"));
}

#[test]
fn missing_override_is_reported() {
    let temp = TempDir::new().expect("tempdir");
    let working_dir = canonical(temp.path());

    let err = Config::load(
        LoadOptions::default()
            .with_working_dir(&working_dir)
            .with_override_path("missing.toml"),
    )
    .expect_err("override must exist");

    assert!(matches!(err, ConfigError::OverrideNotFound { .. }));
}
