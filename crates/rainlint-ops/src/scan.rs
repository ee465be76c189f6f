use std::path::{Path, PathBuf};

use rainlint_config::ProjectSettings;
use tracing::debug;
use walkdir::WalkDir;

use crate::paths::normalize_path;
use crate::OperationError;

/// Which files an operation should touch.
#[derive(Clone, Debug, Default)]
pub struct ScanOptions {
    /// Files or directories, relative to the project root unless absolute.
    /// Empty means the whole project root.
    pub paths: Vec<PathBuf>,
}

/// A skin source selected for processing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanTarget {
    pub absolute: PathBuf,
    /// Path shown in reports.
    pub display: PathBuf,
}

/// Expand `options` into a sorted, de-duplicated list of files.
///
/// Directories are walked and filtered by the project include/exclude
/// patterns. Files named explicitly are always kept.
pub(crate) fn collect_targets(
    project: &ProjectSettings,
    options: &ScanOptions,
) -> Result<Vec<ScanTarget>, OperationError> {
    let roots: Vec<PathBuf> = if options.paths.is_empty() {
        vec![clean(&project.root)]
    } else {
        options
            .paths
            .iter()
            .map(|path| {
                if path.is_absolute() {
                    clean(path)
                } else {
                    clean(&project.root.join(path))
                }
            })
            .collect()
    };

    let mut targets = Vec::new();
    for root in roots {
        if root.is_file() {
            targets.push(target_for(project, root));
            continue;
        }
        if !root.is_dir() {
            return Err(OperationError::InvalidInput(format!(
                "path not found: {}",
                root.display()
            )));
        }
        for entry in WalkDir::new(&root).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|err| OperationError::Walk {
                path: root.clone(),
                message: err.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let target = target_for(project, entry.into_path());
            if project.is_in_scope(&target.display) {
                targets.push(target);
            } else {
                debug!(path = %target.display.display(), "out of scope");
            }
        }
    }

    targets.sort_by(|a, b| a.display.cmp(&b.display));
    targets.dedup_by(|a, b| a.absolute == b.absolute);
    Ok(targets)
}

fn target_for(project: &ProjectSettings, absolute: PathBuf) -> ScanTarget {
    let display = relative_to_root(&clean(&project.root), &absolute);
    ScanTarget { absolute, display }
}

fn relative_to_root(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

fn clean(path: &Path) -> PathBuf {
    let normalized = normalize_path(path);
    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}
