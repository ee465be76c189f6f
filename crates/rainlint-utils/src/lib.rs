//! Shared utilities for rainlint crates.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tempfile::Builder;

/// Map `func` over `items` in parallel, preserving input order in the output.
pub fn parallel_map<T, F, R>(items: T, func: F) -> Vec<R>
where
    T: IntoParallelIterator,
    F: Fn(T::Item) -> R + Send + Sync,
    R: Send,
{
    items.into_par_iter().map(func).collect()
}

/// Atomically replace `path` with `contents`.
///
/// The bytes go to a temporary file in the same directory which is then
/// renamed over the target, so readers never observe a partial skin file.
/// Existing permissions are carried over on unix.
pub fn atomic_write(path: &Path, contents: impl AsRef<[u8]>) -> io::Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| Path::new(".").to_path_buf());
    fs::create_dir_all(&parent)?;

    let mut tmp = Builder::new().prefix(".rainlint").tempfile_in(&parent)?;

    tmp.as_file_mut().write_all(contents.as_ref())?;
    tmp.as_file_mut().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = fs::metadata(path) {
            let perm = metadata.permissions().mode();
            let _ = fs::set_permissions(tmp.path(), fs::Permissions::from_mode(perm));
        }
    }

    tmp.persist(path).map(|_| ()).map_err(|err| err.error)
}
