//! Configuration primitives and loader for the rainlint toolkit.
//!
//! The loader resolves configuration using a fixed precedence stack:
//! override flag → working directory → git root → built-in defaults.
//! Parsed settings are normalised into typed structures so downstream crates
//! never touch raw TOML.

use std::collections::{HashMap, HashSet};
use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use serde::Deserialize;
use thiserror::Error;

mod settings;

pub use settings::{apply_setting, settings_path, SettingUpdate};

const CONFIG_FILE_NAME: &str = ".rainlint.toml";

const DEFAULT_EXECUTABLE: &str = "C:\\Program Files\\Rainmeter\\Rainmeter.exe";
const DEFAULT_RESOURCE_FOLDER: &str = "@Resources";
const DEFAULT_SKINS_FOLDER: &str = "Skins";
const DEFAULT_MAX_SECTION_NAME: usize = 255;

/// Complete configuration resolved from defaults and on-disk overrides.
#[derive(Clone, Debug)]
pub struct Config {
    pub project: ProjectSettings,
    pub validate: ValidateSettings,
    pub meters: MeterSettings,
    pub refresh: RefreshSettings,
    pub log: LogSettings,
    pub sources: ConfigSources,
}

/// Project-level settings that declare which files are skin sources.
#[derive(Clone, Debug)]
pub struct ProjectSettings {
    pub root: PathBuf,
    pub include: PatternList,
    pub exclude: PatternList,
}

impl ProjectSettings {
    /// Whether `relative` (relative to the project root) is a checkable source.
    pub fn is_in_scope(&self, relative: &Path) -> bool {
        if self.exclude.matches(relative) {
            return false;
        }
        self.include.is_empty() || self.include.matches(relative)
    }
}

/// Settings covering the validator.
#[derive(Clone, Debug)]
pub struct ValidateSettings {
    pub strict_section_names: bool,
    pub max_section_name_length: usize,
    pub resource_folder: String,
    pub skins_root: SkinsRootPolicy,
    pub skins_folder_name: String,
    pub trailing_separator: bool,
    /// Compare section names and keys case-sensitively when detecting duplicates.
    pub case_sensitive_names: bool,
    pub severity: HashMap<Rule, SeverityLevel>,
}

impl ValidateSettings {
    /// Returns the effective severity for `rule`, falling back to the rule default.
    pub fn severity_for(&self, rule: Rule) -> SeverityLevel {
        self.severity
            .get(&rule)
            .copied()
            .unwrap_or_else(|| rule.default_severity())
    }
}

impl Default for ValidateSettings {
    fn default() -> Self {
        ValidateSettings {
            strict_section_names: false,
            max_section_name_length: DEFAULT_MAX_SECTION_NAME,
            resource_folder: DEFAULT_RESOURCE_FOLDER.to_string(),
            skins_root: SkinsRootPolicy::ResourcesAnchored,
            skins_folder_name: DEFAULT_SKINS_FOLDER.to_string(),
            trailing_separator: true,
            case_sensitive_names: false,
            severity: HashMap::new(),
        }
    }
}

/// How the skins root is located when resolving path macros.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SkinsRootPolicy {
    /// Two directory levels above the document's folder.
    ResourcesAnchored,
    /// Nearest ancestor folder named like `skins_folder_name`.
    SkinsFolder,
}

impl SkinsRootPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            SkinsRootPolicy::ResourcesAnchored => "resources",
            SkinsRootPolicy::SkinsFolder => "skins-folder",
        }
    }
}

impl fmt::Display for SkinsRootPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SkinsRootPolicy {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "resources" => Ok(SkinsRootPolicy::ResourcesAnchored),
            "skins-folder" => Ok(SkinsRootPolicy::SkinsFolder),
            _ => Err(()),
        }
    }
}

/// Meter types whose key blocks are checked against an allow-list.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MeterType {
    String,
    Image,
}

impl MeterType {
    pub const ALL: &'static [MeterType] = &[MeterType::String, MeterType::Image];

    pub fn as_str(self) -> &'static str {
        match self {
            MeterType::String => "string",
            MeterType::Image => "image",
        }
    }

    /// Name as written in skins (`Meter=String`).
    pub fn display_name(self) -> &'static str {
        match self {
            MeterType::String => "String",
            MeterType::Image => "Image",
        }
    }
}

impl fmt::Display for MeterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl std::str::FromStr for MeterType {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "string" => Ok(MeterType::String),
            "image" => Ok(MeterType::Image),
            _ => Err(()),
        }
    }
}

/// User extensions to the built-in meter key tables.
#[derive(Clone, Debug, Default)]
pub struct MeterSettings {
    pub extra_keys: HashMap<MeterType, Vec<String>>,
}

impl MeterSettings {
    pub fn extra_keys_for(&self, meter: MeterType) -> &[String] {
        self.extra_keys
            .get(&meter)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Settings used by the auto-refresh adapter.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RefreshSettings {
    pub executable: PathBuf,
    pub auto_refresh_on_save: bool,
    pub mode: RefreshMode,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        RefreshSettings {
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
            auto_refresh_on_save: true,
            mode: RefreshMode::All,
        }
    }
}

/// Scope of a refresh triggered by saving a file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RefreshMode {
    All,
    Specific,
}

impl RefreshMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RefreshMode::All => "all",
            RefreshMode::Specific => "specific",
        }
    }
}

impl fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RefreshMode {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "all" => Ok(RefreshMode::All),
            "specific" => Ok(RefreshMode::Specific),
            _ => Err(()),
        }
    }
}

/// Location of the skin engine's log file.
#[derive(Clone, Debug, Default)]
pub struct LogSettings {
    pub path: Option<PathBuf>,
}

impl LogSettings {
    /// Configured path, or `%APPDATA%/Rainmeter/Rainmeter.log`.
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => path.clone(),
            None => {
                let appdata = env::var_os("APPDATA").map(PathBuf::from).unwrap_or_default();
                appdata.join("Rainmeter").join("Rainmeter.log")
            }
        }
    }
}

/// Pattern plus compiled matcher helper.
#[derive(Clone, Debug)]
pub struct Pattern {
    original: String,
    matcher: GlobMatcher,
}

impl Pattern {
    fn new(source: ConfigSource, value: String) -> Result<Self, ConfigValidationError> {
        match Glob::new(&value) {
            Ok(glob) => Ok(Pattern {
                original: value,
                matcher: glob.compile_matcher(),
            }),
            Err(err) => Err(ConfigValidationError::new(
                Some(source),
                format!("invalid glob pattern '{value}': {err}"),
            )),
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn is_match(&self, path: &Path) -> bool {
        self.matcher.is_match(path)
    }
}

/// Ordered list of glob patterns.
#[derive(Clone, Debug, Default)]
pub struct PatternList {
    patterns: Vec<Pattern>,
}

impl PatternList {
    fn new(patterns: Vec<Pattern>) -> Self {
        PatternList { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(path))
    }
}

/// Diagnostic rules produced by the validator. Keep in sync with `Rule::ALL`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub enum Rule {
    MalformedKeyValue,
    UnterminatedSection,
    EmptySectionName,
    SectionNameLength,
    SectionNameChars,
    DuplicateSection,
    DuplicateKey,
    MissingRainmeter,
    MissingVariables,
    UnsupportedMacro,
    IncludeNotFound,
    CircularInclude,
    InvalidMeterKey,
    EmptyNumberedKey,
}

impl Rule {
    pub const ALL: &'static [Rule] = &[
        Rule::MalformedKeyValue,
        Rule::UnterminatedSection,
        Rule::EmptySectionName,
        Rule::SectionNameLength,
        Rule::SectionNameChars,
        Rule::DuplicateSection,
        Rule::DuplicateKey,
        Rule::MissingRainmeter,
        Rule::MissingVariables,
        Rule::UnsupportedMacro,
        Rule::IncludeNotFound,
        Rule::CircularInclude,
        Rule::InvalidMeterKey,
        Rule::EmptyNumberedKey,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Rule::MalformedKeyValue => "malformed-key-value",
            Rule::UnterminatedSection => "unterminated-section",
            Rule::EmptySectionName => "empty-section-name",
            Rule::SectionNameLength => "section-name-length",
            Rule::SectionNameChars => "section-name-chars",
            Rule::DuplicateSection => "duplicate-section",
            Rule::DuplicateKey => "duplicate-key",
            Rule::MissingRainmeter => "missing-rainmeter",
            Rule::MissingVariables => "missing-variables",
            Rule::UnsupportedMacro => "unsupported-macro",
            Rule::IncludeNotFound => "include-not-found",
            Rule::CircularInclude => "circular-include",
            Rule::InvalidMeterKey => "invalid-meter-key",
            Rule::EmptyNumberedKey => "empty-numbered-key",
        }
    }

    /// Severity used when no override is configured.
    pub fn default_severity(self) -> SeverityLevel {
        match self {
            Rule::DuplicateSection
            | Rule::DuplicateKey
            | Rule::MissingVariables
            | Rule::EmptyNumberedKey => SeverityLevel::Warning,
            Rule::UnsupportedMacro => SeverityLevel::Hint,
            _ => SeverityLevel::Error,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Rule {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Rule::ALL
            .iter()
            .copied()
            .find(|rule| rule.as_str() == value)
            .ok_or(())
    }
}

/// Severity attached to a diagnostic. `Ignore` suppresses the rule entirely.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SeverityLevel {
    Error,
    Warning,
    Hint,
    Ignore,
}

impl SeverityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            SeverityLevel::Error => "error",
            SeverityLevel::Warning => "warning",
            SeverityLevel::Hint => "hint",
            SeverityLevel::Ignore => "ignore",
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SeverityLevel {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "error" => Ok(SeverityLevel::Error),
            "warning" => Ok(SeverityLevel::Warning),
            "hint" => Ok(SeverityLevel::Hint),
            "ignore" => Ok(SeverityLevel::Ignore),
            _ => Err(()),
        }
    }
}

/// Provenance information for resolved configuration.
#[derive(Clone, Debug)]
pub struct ConfigSources {
    pub working_directory: PathBuf,
    pub layers: Vec<ConfigSource>,
}

/// Specific layer of configuration (default/git/local/override).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigSource {
    pub kind: ConfigSourceKind,
    pub path: Option<PathBuf>,
    pub base_dir: PathBuf,
}

impl ConfigSource {
    fn default(base_dir: PathBuf) -> Self {
        ConfigSource {
            kind: ConfigSourceKind::Default,
            path: None,
            base_dir,
        }
    }

    fn for_file(kind: ConfigSourceKind, path: PathBuf) -> Self {
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        ConfigSource {
            kind,
            path: Some(path),
            base_dir,
        }
    }

    fn describe(&self) -> String {
        match (&self.kind, &self.path) {
            (ConfigSourceKind::Default, _) => "built-in defaults".to_owned(),
            (kind, Some(path)) => format!("{} at {}", kind, path.display()),
            (kind, None) => kind.to_string(),
        }
    }
}

/// Kinds of configuration sources, ordered from lowest to highest precedence.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigSourceKind {
    Default,
    GitRoot,
    Local,
    Override,
}

impl fmt::Display for ConfigSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfigSourceKind::Default => "defaults",
            ConfigSourceKind::GitRoot => "git-root config",
            ConfigSourceKind::Local => "local config",
            ConfigSourceKind::Override => "override config",
        };
        f.write_str(label)
    }
}

/// Loader options, typically supplied by the CLI layer.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub override_path: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
}

impl LoadOptions {
    pub fn with_override_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }
}

/// Errors surfaced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to resolve working directory {attempted}: {source}")]
    WorkingDirectory {
        attempted: PathBuf,
        source: io::Error,
    },
    #[error("override config {path} not found")]
    OverrideNotFound { path: PathBuf },
    #[error("failed to read config {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to edit config {path}: {source}")]
    Edit {
        path: PathBuf,
        source: toml_edit::TomlError,
    },
    #[error("config {path}: `{table}` is not a table")]
    NotATable { path: PathBuf, table: &'static str },
    #[error("configuration validation failed:\n{0}")]
    Validation(ConfigValidationErrors),
}

impl Config {
    /// Loads configuration using the precedence rules and returns typed settings.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let working_dir = resolve_working_dir(options.working_dir)?;
        let override_path = options
            .override_path
            .map(|path| make_absolute(&path, &working_dir));

        if let Some(path) = &override_path {
            if !path.exists() {
                return Err(ConfigError::OverrideNotFound { path: path.clone() });
            }
        }

        let default_source = ConfigSource::default(working_dir.clone());
        let mut merged = PartialConfig::default();
        merged.merge(defaults_layer(default_source.clone()));

        let mut source_layers = vec![default_source];

        let git_root = find_git_root(&working_dir);
        let git_config_path = git_root.as_ref().map(|root| root.join(CONFIG_FILE_NAME));
        let local_config_path = working_dir.join(CONFIG_FILE_NAME);

        if let Some(path) = git_config_path.as_ref() {
            if path.exists() && Some(path) != override_path.as_ref() && path != &local_config_path {
                let source = ConfigSource::for_file(ConfigSourceKind::GitRoot, path.clone());
                merged.merge(load_layer(path, source.clone())?);
                source_layers.push(source);
            }
        }

        if local_config_path.exists() && Some(&local_config_path) != override_path.as_ref() {
            let source = ConfigSource::for_file(ConfigSourceKind::Local, local_config_path.clone());
            merged.merge(load_layer(&local_config_path, source.clone())?);
            source_layers.push(source);
        }

        if let Some(path) = override_path {
            let source = ConfigSource::for_file(ConfigSourceKind::Override, path.clone());
            merged.merge(load_layer(&path, source.clone())?);
            source_layers.push(source);
        }

        let resolved = merged.finalize().map_err(ConfigError::Validation)?;
        Ok(resolved.into_config(ConfigSources {
            working_directory: working_dir,
            layers: source_layers,
        }))
    }

    /// Built-in defaults rooted at `root`, without reading any file.
    pub fn defaults(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let source = ConfigSource::default(root.clone());
        let resolved = defaults_layer(source.clone())
            .finalize()
            .unwrap_or_else(|err| panic!("built-in rainlint defaults are invalid: {err}"));
        resolved.into_config(ConfigSources {
            working_directory: root,
            layers: vec![source],
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::defaults(".")
    }
}

fn resolve_working_dir(override_dir: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    match override_dir {
        Some(path) => fs::canonicalize(&path).map_err(|source| ConfigError::WorkingDirectory {
            attempted: path,
            source,
        }),
        None => env::current_dir().map_err(|source| ConfigError::WorkingDirectory {
            attempted: PathBuf::from("."),
            source,
        }),
    }
}

fn make_absolute(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn load_layer(path: &Path, source: ConfigSource) -> Result<PartialConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.into(),
        source,
    })?;
    let raw: RawConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.into(),
        source,
    })?;
    Ok(raw.into_partial(source))
}

fn defaults_layer(source: ConfigSource) -> PartialConfig {
    let defaults = ValidateSettings::default();
    let refresh = RefreshSettings::default();

    PartialConfig {
        project: ProjectPartial {
            root: Some(Located::new(PathBuf::from("."), source.clone())),
            include: Some(Located::new(
                vec!["**/*.ini".into(), "**/*.inc".into(), "**/*.nek".into()],
                source.clone(),
            )),
            exclude: Some(Located::new(Vec::new(), source.clone())),
        },
        validate: ValidatePartial {
            strict_section_names: Some(Located::new(defaults.strict_section_names, source.clone())),
            max_section_name_length: Some(Located::new(
                defaults.max_section_name_length,
                source.clone(),
            )),
            resource_folder: Some(Located::new(defaults.resource_folder, source.clone())),
            skins_root: Some(Located::new(
                defaults.skins_root.as_str().to_string(),
                source.clone(),
            )),
            skins_folder_name: Some(Located::new(defaults.skins_folder_name, source.clone())),
            trailing_separator: Some(Located::new(defaults.trailing_separator, source.clone())),
            case_sensitive_names: Some(Located::new(defaults.case_sensitive_names, source.clone())),
            severity: HashMap::new(),
        },
        meters: HashMap::new(),
        refresh: RefreshPartial {
            executable: Some(Located::new(refresh.executable, source.clone())),
            auto_refresh_on_save: Some(Located::new(refresh.auto_refresh_on_save, source.clone())),
            mode: Some(Located::new(refresh.mode.as_str().to_string(), source)),
        },
        log: LogPartial::default(),
    }
}

fn find_git_root(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir.join(".git").exists() {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

#[derive(Clone, Debug, Default)]
struct PartialConfig {
    project: ProjectPartial,
    validate: ValidatePartial,
    meters: HashMap<String, Located<Vec<String>>>,
    refresh: RefreshPartial,
    log: LogPartial,
}

impl PartialConfig {
    fn merge(&mut self, other: PartialConfig) {
        self.project.merge(other.project);
        self.validate.merge(other.validate);
        for (name, keys) in other.meters {
            self.meters.insert(name, keys);
        }
        self.refresh.merge(other.refresh);
        self.log.merge(other.log);
    }

    fn finalize(self) -> Result<ResolvedConfig, ConfigValidationErrors> {
        let mut errors = Vec::new();
        let fallback = || ConfigSource::default(PathBuf::from("."));

        let root_loc = self
            .project
            .root
            .unwrap_or_else(|| Located::new(PathBuf::from("."), fallback()));
        let root = resolve_path(&root_loc);
        let include = compile_patterns(
            self.project.include.unwrap_or_default(),
            "project.include",
            &mut errors,
        );
        let exclude = compile_patterns(
            self.project.exclude.unwrap_or_default(),
            "project.exclude",
            &mut errors,
        );

        let validate = finalize_validate(self.validate, &mut errors);
        let meters = finalize_meters(self.meters, &mut errors);
        let refresh = finalize_refresh(self.refresh, &mut errors);
        let log = LogSettings {
            path: self.log.path.as_ref().map(resolve_path),
        };

        if !errors.is_empty() {
            return Err(ConfigValidationErrors(errors));
        }

        Ok(ResolvedConfig {
            project: ProjectSettings {
                root,
                include: PatternList::new(include),
                exclude: PatternList::new(exclude),
            },
            validate,
            meters,
            refresh,
            log,
        })
    }
}

#[derive(Clone, Debug, Default)]
struct ProjectPartial {
    root: Option<Located<PathBuf>>,
    include: Option<Located<Vec<String>>>,
    exclude: Option<Located<Vec<String>>>,
}

impl ProjectPartial {
    fn merge(&mut self, other: ProjectPartial) {
        if other.root.is_some() {
            self.root = other.root;
        }
        if other.include.is_some() {
            self.include = other.include;
        }
        if other.exclude.is_some() {
            self.exclude = other.exclude;
        }
    }
}

#[derive(Clone, Debug, Default)]
struct ValidatePartial {
    strict_section_names: Option<Located<bool>>,
    max_section_name_length: Option<Located<usize>>,
    resource_folder: Option<Located<String>>,
    skins_root: Option<Located<String>>,
    skins_folder_name: Option<Located<String>>,
    trailing_separator: Option<Located<bool>>,
    case_sensitive_names: Option<Located<bool>>,
    severity: HashMap<String, Located<String>>,
}

impl ValidatePartial {
    fn merge(&mut self, other: ValidatePartial) {
        if other.strict_section_names.is_some() {
            self.strict_section_names = other.strict_section_names;
        }
        if other.max_section_name_length.is_some() {
            self.max_section_name_length = other.max_section_name_length;
        }
        if other.resource_folder.is_some() {
            self.resource_folder = other.resource_folder;
        }
        if other.skins_root.is_some() {
            self.skins_root = other.skins_root;
        }
        if other.skins_folder_name.is_some() {
            self.skins_folder_name = other.skins_folder_name;
        }
        if other.trailing_separator.is_some() {
            self.trailing_separator = other.trailing_separator;
        }
        if other.case_sensitive_names.is_some() {
            self.case_sensitive_names = other.case_sensitive_names;
        }
        for (key, value) in other.severity {
            self.severity.insert(key, value);
        }
    }
}

#[derive(Clone, Debug, Default)]
struct RefreshPartial {
    executable: Option<Located<PathBuf>>,
    auto_refresh_on_save: Option<Located<bool>>,
    mode: Option<Located<String>>,
}

impl RefreshPartial {
    fn merge(&mut self, other: RefreshPartial) {
        if other.executable.is_some() {
            self.executable = other.executable;
        }
        if other.auto_refresh_on_save.is_some() {
            self.auto_refresh_on_save = other.auto_refresh_on_save;
        }
        if other.mode.is_some() {
            self.mode = other.mode;
        }
    }
}

#[derive(Clone, Debug, Default)]
struct LogPartial {
    path: Option<Located<PathBuf>>,
}

impl LogPartial {
    fn merge(&mut self, other: LogPartial) {
        if other.path.is_some() {
            self.path = other.path;
        }
    }
}

#[derive(Clone, Debug)]
struct Located<T> {
    value: T,
    source: ConfigSource,
}

impl<T> Located<T> {
    fn new(value: T, source: ConfigSource) -> Self {
        Located { value, source }
    }
}

impl Default for Located<Vec<String>> {
    fn default() -> Self {
        Located::new(Vec::new(), ConfigSource::default(PathBuf::from(".")))
    }
}

fn resolve_path(located: &Located<PathBuf>) -> PathBuf {
    let path = &located.value;
    if path.is_absolute() {
        path.clone()
    } else {
        located.source.base_dir.join(path)
    }
}

fn compile_patterns(
    located: Located<Vec<String>>,
    context: &str,
    errors: &mut Vec<ConfigValidationError>,
) -> Vec<Pattern> {
    let mut patterns = Vec::new();
    for pattern in located.value {
        match Pattern::new(located.source.clone(), pattern) {
            Ok(compiled) => patterns.push(compiled),
            Err(err) => errors.push(err.with_context(context)),
        }
    }
    patterns
}

fn finalize_validate(
    partial: ValidatePartial,
    errors: &mut Vec<ConfigValidationError>,
) -> ValidateSettings {
    let defaults = ValidateSettings::default();

    let max_section_name_length = match partial.max_section_name_length {
        Some(located) if located.value == 0 => {
            errors.push(
                ConfigValidationError::new(
                    Some(located.source),
                    "max_section_name_length must be greater than 0".into(),
                )
                .with_context("validate.max_section_name_length"),
            );
            defaults.max_section_name_length
        }
        Some(located) => located.value,
        None => defaults.max_section_name_length,
    };

    let resource_folder = non_empty(
        partial.resource_folder,
        defaults.resource_folder,
        "validate.resource_folder",
        errors,
    );
    let skins_folder_name = non_empty(
        partial.skins_folder_name,
        defaults.skins_folder_name,
        "validate.skins_folder_name",
        errors,
    );

    let skins_root = match partial.skins_root {
        Some(located) => match located.value.parse::<SkinsRootPolicy>() {
            Ok(policy) => policy,
            Err(_) => {
                errors.push(
                    ConfigValidationError::new(
                        Some(located.source),
                        format!(
                            "unknown skins root policy '{}' (expected 'resources' or 'skins-folder')",
                            located.value
                        ),
                    )
                    .with_context("validate.skins_root"),
                );
                defaults.skins_root
            }
        },
        None => defaults.skins_root,
    };

    ValidateSettings {
        strict_section_names: partial
            .strict_section_names
            .map(|located| located.value)
            .unwrap_or(defaults.strict_section_names),
        max_section_name_length,
        resource_folder,
        skins_root,
        skins_folder_name,
        trailing_separator: partial
            .trailing_separator
            .map(|located| located.value)
            .unwrap_or(defaults.trailing_separator),
        case_sensitive_names: partial
            .case_sensitive_names
            .map(|located| located.value)
            .unwrap_or(defaults.case_sensitive_names),
        severity: parse_severity_map(partial.severity, errors),
    }
}

fn non_empty(
    located: Option<Located<String>>,
    fallback: String,
    context: &str,
    errors: &mut Vec<ConfigValidationError>,
) -> String {
    match located {
        Some(located) if located.value.trim().is_empty() => {
            errors.push(
                ConfigValidationError::new(Some(located.source), "value cannot be empty".into())
                    .with_context(context),
            );
            fallback
        }
        Some(located) => located.value,
        None => fallback,
    }
}

fn parse_severity_map(
    raw: HashMap<String, Located<String>>,
    errors: &mut Vec<ConfigValidationError>,
) -> HashMap<Rule, SeverityLevel> {
    let mut result = HashMap::new();
    for (rule_name, located_value) in raw {
        match rule_name.parse::<Rule>() {
            Ok(rule) => match located_value.value.parse::<SeverityLevel>() {
                Ok(level) => {
                    result.insert(rule, level);
                }
                Err(_) => errors.push(
                    ConfigValidationError::new(
                        Some(located_value.source.clone()),
                        format!(
                            "invalid severity '{}' for rule '{}'",
                            located_value.value, rule
                        ),
                    )
                    .with_context("validate.severity"),
                ),
            },
            Err(_) => errors.push(
                ConfigValidationError::new(
                    Some(located_value.source.clone()),
                    format!("unknown rule '{}' in validate.severity", rule_name),
                )
                .with_context("validate.severity"),
            ),
        }
    }
    result
}

fn finalize_meters(
    raw: HashMap<String, Located<Vec<String>>>,
    errors: &mut Vec<ConfigValidationError>,
) -> MeterSettings {
    let mut extra_keys = HashMap::new();
    for (name, located) in raw {
        let Ok(meter) = name.parse::<MeterType>() else {
            errors.push(
                ConfigValidationError::new(
                    Some(located.source),
                    format!("unknown meter type '{name}'"),
                )
                .with_context("meters"),
            );
            continue;
        };

        let mut seen = HashSet::new();
        let keys = located
            .value
            .into_iter()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty() && seen.insert(key.to_ascii_lowercase()))
            .collect();
        extra_keys.insert(meter, keys);
    }
    MeterSettings { extra_keys }
}

fn finalize_refresh(
    partial: RefreshPartial,
    errors: &mut Vec<ConfigValidationError>,
) -> RefreshSettings {
    let defaults = RefreshSettings::default();

    let executable = match partial.executable {
        Some(located) if located.value.as_os_str().is_empty() => {
            errors.push(
                ConfigValidationError::new(
                    Some(located.source),
                    "executable path cannot be empty".into(),
                )
                .with_context("refresh.executable"),
            );
            defaults.executable
        }
        Some(located) => located.value,
        None => defaults.executable,
    };

    let mode = match partial.mode {
        Some(located) => match located.value.parse::<RefreshMode>() {
            Ok(mode) => mode,
            Err(_) => {
                errors.push(
                    ConfigValidationError::new(
                        Some(located.source),
                        format!(
                            "unknown refresh mode '{}' (expected 'all' or 'specific')",
                            located.value
                        ),
                    )
                    .with_context("refresh.mode"),
                );
                defaults.mode
            }
        },
        None => defaults.mode,
    };

    RefreshSettings {
        executable,
        auto_refresh_on_save: partial
            .auto_refresh_on_save
            .map(|located| located.value)
            .unwrap_or(defaults.auto_refresh_on_save),
        mode,
    }
}

#[derive(Clone, Debug)]
struct ResolvedConfig {
    project: ProjectSettings,
    validate: ValidateSettings,
    meters: MeterSettings,
    refresh: RefreshSettings,
    log: LogSettings,
}

impl ResolvedConfig {
    fn into_config(self, sources: ConfigSources) -> Config {
        Config {
            project: self.project,
            validate: self.validate,
            meters: self.meters,
            refresh: self.refresh,
            log: self.log,
            sources,
        }
    }
}

/// Container for validation failures, formatted as a bullet list.
#[derive(Debug)]
pub struct ConfigValidationErrors(pub Vec<ConfigValidationError>);

impl fmt::Display for ConfigValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, err) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "- {err}")?;
        }
        Ok(())
    }
}

impl ConfigValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ConfigValidationError> {
        self.0.iter()
    }
}

/// Validation failure with optional provenance.
#[derive(Clone, Debug)]
pub struct ConfigValidationError {
    pub source: Option<ConfigSource>,
    pub message: String,
    pub context: Option<String>,
}

impl ConfigValidationError {
    fn new(source: Option<ConfigSource>, message: String) -> Self {
        ConfigValidationError {
            source,
            message,
            context: None,
        }
    }

    fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "{}: {}", context, self.message)?;
        } else {
            write!(f, "{}", self.message)?;
        }
        if let Some(source) = &self.source {
            write!(f, " ({})", source.describe())?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    project: Option<RawProject>,
    #[serde(default)]
    validate: Option<RawValidate>,
    #[serde(default)]
    meters: HashMap<String, RawMeter>,
    #[serde(default)]
    refresh: Option<RawRefresh>,
    #[serde(default)]
    log: Option<RawLog>,
}

impl RawConfig {
    fn into_partial(self, source: ConfigSource) -> PartialConfig {
        let project = self
            .project
            .map(|project| ProjectPartial {
                root: project.root.map(|value| Located::new(value, source.clone())),
                include: project.include.map(|value| Located::new(value, source.clone())),
                exclude: project.exclude.map(|value| Located::new(value, source.clone())),
            })
            .unwrap_or_default();

        let validate = self
            .validate
            .map(|validate| ValidatePartial {
                strict_section_names: validate
                    .strict_section_names
                    .map(|value| Located::new(value, source.clone())),
                max_section_name_length: validate
                    .max_section_name_length
                    .map(|value| Located::new(value, source.clone())),
                resource_folder: validate
                    .resource_folder
                    .map(|value| Located::new(value, source.clone())),
                skins_root: validate
                    .skins_root
                    .map(|value| Located::new(value, source.clone())),
                skins_folder_name: validate
                    .skins_folder_name
                    .map(|value| Located::new(value, source.clone())),
                trailing_separator: validate
                    .trailing_separator
                    .map(|value| Located::new(value, source.clone())),
                case_sensitive_names: validate
                    .case_sensitive_names
                    .map(|value| Located::new(value, source.clone())),
                severity: validate
                    .severity
                    .into_iter()
                    .map(|(key, value)| (key, Located::new(value, source.clone())))
                    .collect(),
            })
            .unwrap_or_default();

        let meters = self
            .meters
            .into_iter()
            .map(|(name, meter)| (name, Located::new(meter.extra_keys, source.clone())))
            .collect();

        let refresh = self
            .refresh
            .map(|refresh| RefreshPartial {
                executable: refresh
                    .executable
                    .map(|value| Located::new(value, source.clone())),
                auto_refresh_on_save: refresh
                    .auto_refresh_on_save
                    .map(|value| Located::new(value, source.clone())),
                mode: refresh.mode.map(|value| Located::new(value, source.clone())),
            })
            .unwrap_or_default();

        let log = self
            .log
            .map(|log| LogPartial {
                path: log.path.map(|value| Located::new(value, source.clone())),
            })
            .unwrap_or_default();

        PartialConfig {
            project,
            validate,
            meters,
            refresh,
            log,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawProject {
    #[serde(default)]
    root: Option<PathBuf>,
    #[serde(default)]
    include: Option<Vec<String>>,
    #[serde(default)]
    exclude: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawValidate {
    #[serde(default)]
    strict_section_names: Option<bool>,
    #[serde(default)]
    max_section_name_length: Option<usize>,
    #[serde(default)]
    resource_folder: Option<String>,
    #[serde(default)]
    skins_root: Option<String>,
    #[serde(default)]
    skins_folder_name: Option<String>,
    #[serde(default)]
    trailing_separator: Option<bool>,
    #[serde(default)]
    case_sensitive_names: Option<bool>,
    #[serde(default)]
    severity: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RawMeter {
    #[serde(default)]
    extra_keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawRefresh {
    #[serde(default)]
    executable: Option<PathBuf>,
    #[serde(default)]
    auto_refresh_on_save: Option<bool>,
    #[serde(default)]
    mode: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLog {
    #[serde(default)]
    path: Option<PathBuf>,
}
