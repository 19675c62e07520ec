use std::collections::HashSet;
use std::path::{Path, PathBuf};
use sysinfo::{ProcessRefreshKind, RefreshKind, System, UpdateKind};
use tracing::debug;

/// Snapshot of the executable paths of all running processes.
///
/// Processes we can't inspect are simply absent. The snapshot is never
/// refreshed; a process that exits afterwards stays in it.
pub async fn running_executables() -> HashSet<PathBuf> {
    match tokio::task::spawn_blocking(snapshot).await {
        Ok(paths) => paths,
        Err(e) => {
            debug!("Process snapshot failed: {}", e);
            HashSet::new()
        }
    }
}

fn snapshot() -> HashSet<PathBuf> {
    let system = System::new_with_specifics(
        RefreshKind::new().with_processes(ProcessRefreshKind::new().with_exe(UpdateKind::Always)),
    );

    let paths: HashSet<PathBuf> = system
        .processes()
        .values()
        .filter_map(|process| process.exe())
        .filter(|exe| !exe.as_os_str().is_empty())
        .map(strip_deleted_suffix)
        .collect();

    debug!("Process snapshot: {} executables", paths.len());
    paths
}

/// Linux reports replaced binaries as `/path/to/exe (deleted)`.
fn strip_deleted_suffix(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    match text.strip_suffix(" (deleted)") {
        Some(stripped) => PathBuf::from(stripped),
        None => path.to_path_buf(),
    }
}
