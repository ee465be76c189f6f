use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

/// Collapse `.` and `..` segments without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Directory path as a string, with a trailing separator when requested.
pub fn dir_string(path: &Path, trailing_separator: bool) -> String {
    let mut text = path.to_string_lossy().into_owned();
    if trailing_separator && !text.ends_with(MAIN_SEPARATOR) && !text.ends_with('/') {
        text.push(MAIN_SEPARATOR);
    }
    text
}

/// Path rendered with forward slashes regardless of platform.
pub fn forward_slashes(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
