//! Executable discovery.

use std::fs;
use std::path::Path;

/// Returns true if `path` is a regular file the platform considers executable.
///
/// On Unix any of the owner/group/other execute bits counts; elsewhere the
/// file name must end in `.exe`. Symlinks are followed. Missing or
/// unreadable paths are not executable.
pub fn is_executable(path: &Path) -> bool {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(_) => return false,
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        path.extension()
            .map(|ext| ext.eq_ignore_ascii_case("exe"))
            .unwrap_or(false)
    }
}

/// Lists the names of executable files directly inside `dir`, sorted.
///
/// Non-recursive. An unreadable or vanished directory yields an empty list,
/// and entries that disappear mid-iteration are skipped.
pub fn list_executables(dir: &Path) -> Vec<String> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut names: Vec<String> = entries
        .flatten()
        .filter(|entry| is_executable(&entry.path()))
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
