//! Editing persisted refresh and log settings.
//!
//! Updates go through `toml_edit` so comments and unrelated keys in an
//! existing `.rainlint.toml` survive a `rainlint settings` call.

use std::path::{Path, PathBuf};

use toml_edit::{DocumentMut, Item, Table};

use super::{
    make_absolute, resolve_working_dir, ConfigError, ConfigValidationError,
    ConfigValidationErrors, LoadOptions, RefreshMode, CONFIG_FILE_NAME,
};

/// A single persisted setting change.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SettingUpdate {
    Executable(PathBuf),
    AutoRefreshOnSave(bool),
    RefreshMode(RefreshMode),
    LogPath(PathBuf),
}

impl SettingUpdate {
    /// Table and key the update is stored under.
    pub fn key(&self) -> (&'static str, &'static str) {
        match self {
            SettingUpdate::Executable(_) => ("refresh", "executable"),
            SettingUpdate::AutoRefreshOnSave(_) => ("refresh", "auto_refresh_on_save"),
            SettingUpdate::RefreshMode(_) => ("refresh", "mode"),
            SettingUpdate::LogPath(_) => ("log", "path"),
        }
    }

    /// Confirmation line shown after the update is saved.
    pub fn describe(&self) -> String {
        match self {
            SettingUpdate::Executable(path) => {
                format!("Rainmeter path set to: {}", path.display())
            }
            SettingUpdate::AutoRefreshOnSave(true) => "Auto Refresh is now enabled".to_string(),
            SettingUpdate::AutoRefreshOnSave(false) => "Auto Refresh is now disabled".to_string(),
            SettingUpdate::RefreshMode(RefreshMode::All) => {
                "Rainmeter refresh mode set to: Refresh All Skins".to_string()
            }
            SettingUpdate::RefreshMode(RefreshMode::Specific) => {
                "Rainmeter refresh mode set to: Refresh Specific Skin".to_string()
            }
            SettingUpdate::LogPath(path) => {
                format!("Custom Rainmeter.log path saved: {}", path.display())
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigValidationError> {
        match self {
            SettingUpdate::Executable(path) | SettingUpdate::LogPath(path)
                if path.as_os_str().to_string_lossy().trim().is_empty() =>
            {
                let (table, key) = self.key();
                Err(
                    ConfigValidationError::new(None, "Path cannot be empty!".to_string())
                        .with_context(format!("{table}.{key}")),
                )
            }
            _ => Ok(()),
        }
    }

    fn value(&self) -> Item {
        match self {
            SettingUpdate::Executable(path) | SettingUpdate::LogPath(path) => {
                toml_edit::value(path.to_string_lossy().into_owned())
            }
            SettingUpdate::AutoRefreshOnSave(enabled) => toml_edit::value(*enabled),
            SettingUpdate::RefreshMode(mode) => toml_edit::value(mode.as_str()),
        }
    }
}

/// File that persisted settings are written to: the override file when one
/// is given, otherwise `.rainlint.toml` in the working directory.
pub fn settings_path(options: &LoadOptions) -> Result<PathBuf, ConfigError> {
    let working_dir = resolve_working_dir(options.working_dir.clone())?;
    Ok(match &options.override_path {
        Some(path) => make_absolute(path, &working_dir),
        None => working_dir.join(CONFIG_FILE_NAME),
    })
}

/// Apply `update` to the TOML `contents` of the file at `path`, returning the
/// new document text. Other keys and comments are left untouched.
pub fn apply_setting(
    contents: &str,
    path: &Path,
    update: &SettingUpdate,
) -> Result<String, ConfigError> {
    update
        .validate()
        .map_err(|err| ConfigError::Validation(ConfigValidationErrors(vec![err])))?;

    let mut doc = contents
        .parse::<DocumentMut>()
        .map_err(|source| ConfigError::Edit {
            path: path.to_path_buf(),
            source,
        })?;

    let (table, key) = update.key();
    let section = doc
        .entry(table)
        .or_insert_with(|| Item::Table(Table::new()))
        .as_table_like_mut()
        .ok_or_else(|| ConfigError::NotATable {
            path: path.to_path_buf(),
            table,
        })?;
    section.insert(key, update.value());

    Ok(doc.to_string())
}
