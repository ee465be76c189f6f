//! Path macro expansion for include directives.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use rainlint_config::{SkinsRootPolicy, ValidateSettings};
use regex::Regex;

use super::PathLookup;
use crate::paths::{dir_string, forward_slashes};

static UNSUPPORTED_MACRO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/?#\w+#|\[#.*?\]").expect("valid regex"));

/// Outcome of expanding the macros in one raw include path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub path: String,
    /// A `#TOKEN#` or `[#...]` fragment survived substitution.
    pub has_unsupported: bool,
}

/// Values substituted for each supported macro, computed once per document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MacroTable {
    pub resources: String,
    pub skins: String,
    pub current_path: String,
    pub current_file: String,
    pub root_config_path: String,
    pub root_config: String,
    pub current_config: String,
}

impl MacroTable {
    /// Build the table for a document at `document_path`.
    pub fn build(document_path: &Path, settings: &ValidateSettings, lookup: &dyn PathLookup) -> Self {
        let file_dir = document_path.parent().unwrap_or_else(|| Path::new(""));
        let trailing = settings.trailing_separator;

        let skins_root = skins_root(file_dir, settings);
        let (base, found) = find_base_skin_dir(file_dir, &skins_root, &settings.resource_folder, lookup);

        let resources = if found {
            dir_string(&base.join(&settings.resource_folder), trailing)
        } else {
            String::new()
        };

        let current_config = file_dir
            .strip_prefix(&skins_root)
            .map(forward_slashes)
            .unwrap_or_default();

        MacroTable {
            resources,
            skins: dir_string(&skins_root, trailing),
            current_path: dir_string(file_dir, trailing),
            current_file: file_name(document_path),
            root_config_path: dir_string(&base, trailing),
            root_config: file_name(&base),
            current_config: current_config.trim_end_matches('/').to_string(),
        }
    }

    /// Macro tokens paired with their substitutions.
    pub fn entries(&self) -> [(&'static str, &str); 7] {
        [
            ("#@#", &self.resources),
            ("#SKINSPATH#", &self.skins),
            ("#CURRENTPATH#", &self.current_path),
            ("#CURRENTFILE#", &self.current_file),
            ("#ROOTCONFIGPATH#", &self.root_config_path),
            ("#ROOTCONFIG#", &self.root_config),
            ("#CURRENTCONFIG#", &self.current_config),
        ]
    }

    /// Substitute every supported macro in `raw` and flag leftovers.
    pub fn resolve(&self, raw: &str) -> Resolution {
        let path = self
            .entries()
            .into_iter()
            .fold(raw.to_string(), |acc, (token, value)| {
                if acc.contains(token) {
                    acc.replace(token, value)
                } else {
                    acc
                }
            });
        let has_unsupported = UNSUPPORTED_MACRO.is_match(&path);
        Resolution {
            path,
            has_unsupported,
        }
    }
}

fn skins_root(file_dir: &Path, settings: &ValidateSettings) -> PathBuf {
    let two_up = || {
        file_dir
            .ancestors()
            .take(3)
            .last()
            .unwrap_or(file_dir)
            .to_path_buf()
    };
    match settings.skins_root {
        SkinsRootPolicy::ResourcesAnchored => two_up(),
        SkinsRootPolicy::SkinsFolder => file_dir
            .ancestors()
            .find(|dir| {
                dir.file_name()
                    .map(|name| {
                        name.to_string_lossy()
                            .eq_ignore_ascii_case(&settings.skins_folder_name)
                    })
                    .unwrap_or(false)
            })
            .map(Path::to_path_buf)
            .unwrap_or_else(two_up),
    }
}

/// Walk upward from `file_dir` looking for the resource sentinel. The walk
/// stops at `skins_root` (inclusive) or the filesystem root.
fn find_base_skin_dir(
    file_dir: &Path,
    skins_root: &Path,
    sentinel: &str,
    lookup: &dyn PathLookup,
) -> (PathBuf, bool) {
    let mut last = file_dir;
    for dir in file_dir.ancestors() {
        last = dir;
        if lookup.exists(&dir.join(sentinel)) {
            return (dir.to_path_buf(), true);
        }
        if dir == skins_root {
            break;
        }
    }
    (last.to_path_buf(), false)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
