//! Signalling the skin engine to reload skins.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use rainlint_config::{RefreshMode, RefreshSettings};
use thiserror::Error;
use tracing::{debug, info, warn};

const SKINS_MARKER: &str = "\\skins\\";
const REFRESHABLE_EXTENSIONS: &[&str] = &["ini", "inc", "nek"];

/// Failures reported back to the user as warnings.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("Rainmeter path is not configured.")]
    NotConfigured,

    #[error("File is not located within the Rainmeter 'Skins' folder.")]
    OutsideSkins { path: PathBuf },

    #[error("failed to launch {}: {source}", executable.display())]
    Spawn {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to refresh Rainmeter. Make sure Rainmeter is installed.")]
    RefreshAllFailed { detail: String },

    #[error("Failed to refresh Rainmeter skin \"{config}\". Ensure the skin exists.")]
    RefreshTargetFailed { config: String, detail: String },
}

/// Capability used to drive the external skin engine.
pub trait SkinEngine {
    fn is_running(&self) -> bool;
    fn refresh_all(&self) -> Result<(), RefreshError>;
    /// Refresh one skin config, e.g. `Clock\Digital`.
    fn refresh_target(&self, config: &str) -> Result<(), RefreshError>;
}

/// Engine driven by invoking its executable with bang commands.
#[derive(Clone, Debug)]
pub struct ProcessEngine {
    executable: PathBuf,
}

impl ProcessEngine {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        ProcessEngine {
            executable: executable.into(),
        }
    }

    pub fn from_settings(settings: &RefreshSettings) -> Self {
        Self::new(settings.executable.clone())
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn ensure_configured(&self) -> Result<(), RefreshError> {
        if self.executable.as_os_str().is_empty() {
            return Err(RefreshError::NotConfigured);
        }
        Ok(())
    }

    fn run(&self, args: &[&str]) -> Result<Output, RefreshError> {
        info!(executable = %self.executable.display(), ?args, "invoking skin engine");
        Command::new(&self.executable)
            .args(args)
            .output()
            .map_err(|source| {
                warn!(executable = %self.executable.display(), error = %source, "skin engine launch failed");
                RefreshError::Spawn {
                    executable: self.executable.clone(),
                    source,
                }
            })
    }

    fn image_name(&self) -> Option<String> {
        self.executable
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}

impl SkinEngine for ProcessEngine {
    fn is_running(&self) -> bool {
        let Some(image) = self.image_name() else {
            return false;
        };
        let output = if cfg!(windows) {
            Command::new("tasklist")
                .args(["/FI", &format!("IMAGENAME eq {image}"), "/NH"])
                .output()
        } else {
            Command::new("pgrep").args(["-x", &image]).output()
        };
        match output {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let running = if cfg!(windows) {
                    stdout.to_ascii_lowercase().contains(&image.to_ascii_lowercase())
                } else {
                    !stdout.trim().is_empty()
                };
                debug!(image = %image, running, "process check");
                running
            }
            Ok(_) => false,
            Err(err) => {
                debug!(error = %err, "process check unavailable");
                false
            }
        }
    }

    fn refresh_all(&self) -> Result<(), RefreshError> {
        self.ensure_configured()?;
        let output = self.run(&["!RefreshApp"])?;
        if !output.status.success() {
            let detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(status = %output.status, %detail, "refresh of all skins failed");
            return Err(RefreshError::RefreshAllFailed { detail });
        }
        Ok(())
    }

    fn refresh_target(&self, config: &str) -> Result<(), RefreshError> {
        self.ensure_configured()?;
        let output = self.run(&["!Refresh", config])?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() || !stderr.is_empty() {
            warn!(status = %output.status, config, detail = %stderr, "skin refresh failed");
            return Err(RefreshError::RefreshTargetFailed {
                config: config.to_string(),
                detail: stderr,
            });
        }
        Ok(())
    }
}

/// What a save-triggered refresh did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    Skipped,
    RefreshedAll,
    RefreshedTarget(String),
}

/// Skin config name for a file below a `Skins` folder.
///
/// `C:\Users\me\Documents\Rainmeter\Skins\Clock\Digital\Digital.ini` yields
/// `Clock\Digital`. Characters other than word characters, whitespace,
/// hyphens and backslashes are dropped.
pub fn skin_config_for(path: &Path) -> Result<String, RefreshError> {
    let raw = path.to_string_lossy().replace('/', "\\");
    let lowered = raw.to_ascii_lowercase();
    let Some(index) = lowered.find(SKINS_MARKER) else {
        return Err(RefreshError::OutsideSkins {
            path: path.to_path_buf(),
        });
    };

    let relative = &raw[index + SKINS_MARKER.len()..];
    let folder = match relative.rfind('\\') {
        Some(end) => &relative[..end],
        None => "",
    };
    Ok(folder
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '\\') || c.is_whitespace())
        .collect())
}

/// Refresh after `path` was saved, according to `settings`.
pub fn on_save(
    path: &Path,
    settings: &RefreshSettings,
    engine: &dyn SkinEngine,
) -> Result<RefreshOutcome, RefreshError> {
    if !settings.auto_refresh_on_save {
        return Ok(RefreshOutcome::Skipped);
    }
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match settings.mode {
        RefreshMode::Specific if extension == "ini" => {
            if settings.executable.as_os_str().is_empty() {
                return Err(RefreshError::NotConfigured);
            }
            let config = skin_config_for(path)?;
            engine.refresh_target(&config)?;
            info!(config = %config, "skin refreshed");
            Ok(RefreshOutcome::RefreshedTarget(config))
        }
        RefreshMode::All if REFRESHABLE_EXTENSIONS.contains(&extension.as_str()) => {
            if settings.executable.as_os_str().is_empty() {
                return Err(RefreshError::NotConfigured);
            }
            engine.refresh_all()?;
            info!("all skins refreshed");
            Ok(RefreshOutcome::RefreshedAll)
        }
        _ => {
            debug!(path = %path.display(), mode = %settings.mode, "no refresh for this file");
            Ok(RefreshOutcome::Skipped)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingEngine {
        calls: RefCell<Vec<String>>,
        fail: bool,
    }

    impl SkinEngine for RecordingEngine {
        fn is_running(&self) -> bool {
            true
        }

        fn refresh_all(&self) -> Result<(), RefreshError> {
            self.calls.borrow_mut().push("!RefreshApp".to_string());
            if self.fail {
                return Err(RefreshError::RefreshAllFailed {
                    detail: "exit 1".to_string(),
                });
            }
            Ok(())
        }

        fn refresh_target(&self, config: &str) -> Result<(), RefreshError> {
            self.calls.borrow_mut().push(format!("!Refresh {config}"));
            Ok(())
        }
    }

    fn settings(mode: RefreshMode) -> RefreshSettings {
        RefreshSettings {
            mode,
            ..RefreshSettings::default()
        }
    }

    #[test]
    fn config_name_is_folder_below_skins() {
        let path = Path::new(r"C:\Users\me\Documents\Rainmeter\Skins\Clock\Digital\Digital.ini");
        assert_eq!(skin_config_for(path).expect("config"), r"Clock\Digital");
    }

    #[test]
    fn config_name_drops_unsafe_characters() {
        let path = Path::new(r"D:\skins\My.Skin (v2)\main.ini");
        assert_eq!(skin_config_for(path).expect("config"), "MySkin v2");
    }

    #[test]
    fn files_outside_skins_are_rejected() {
        let err = skin_config_for(Path::new(r"C:\Temp\main.ini")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "File is not located within the Rainmeter 'Skins' folder."
        );
    }

    #[test]
    fn disabled_refresh_is_skipped() {
        let engine = RecordingEngine::default();
        let mut settings = settings(RefreshMode::All);
        settings.auto_refresh_on_save = false;
        let outcome = on_save(Path::new("a.ini"), &settings, &engine).expect("on save");
        assert_eq!(outcome, RefreshOutcome::Skipped);
        assert!(engine.calls.borrow().is_empty());
    }

    #[test]
    fn all_mode_refreshes_for_skin_sources_only() {
        let engine = RecordingEngine::default();
        let settings = settings(RefreshMode::All);
        for name in ["a.ini", "b.inc", "c.nek"] {
            let outcome = on_save(Path::new(name), &settings, &engine).expect("on save");
            assert_eq!(outcome, RefreshOutcome::RefreshedAll);
        }
        let outcome = on_save(Path::new("notes.txt"), &settings, &engine).expect("on save");
        assert_eq!(outcome, RefreshOutcome::Skipped);
        assert_eq!(engine.calls.borrow().len(), 3);
    }

    #[test]
    fn specific_mode_targets_ini_files() {
        let engine = RecordingEngine::default();
        let settings = settings(RefreshMode::Specific);
        let outcome = on_save(
            Path::new(r"C:\Rainmeter\Skins\Clock\Clock.ini"),
            &settings,
            &engine,
        )
        .expect("on save");
        assert_eq!(outcome, RefreshOutcome::RefreshedTarget("Clock".to_string()));

        let outcome = on_save(Path::new(r"C:\Rainmeter\Skins\Clock\vars.inc"), &settings, &engine)
            .expect("on save");
        assert_eq!(outcome, RefreshOutcome::Skipped);
        assert_eq!(*engine.calls.borrow(), vec!["!Refresh Clock".to_string()]);
    }

    #[test]
    fn failures_are_returned_not_raised() {
        let engine = RecordingEngine {
            fail: true,
            ..RecordingEngine::default()
        };
        let err = on_save(Path::new("a.ini"), &settings(RefreshMode::All), &engine).unwrap_err();
        assert!(matches!(err, RefreshError::RefreshAllFailed { .. }));

        let mut unconfigured = settings(RefreshMode::All);
        unconfigured.executable = PathBuf::new();
        let err = on_save(Path::new("a.ini"), &unconfigured, &engine).unwrap_err();
        assert!(matches!(err, RefreshError::NotConfigured));
    }

    #[test]
    fn missing_executable_cannot_spawn() {
        let engine = ProcessEngine::new("/nonexistent/rainlint/Rainmeter.exe");
        assert!(matches!(engine.refresh_all(), Err(RefreshError::Spawn { .. })));
        assert!(!engine.is_running());
    }
}
