use crate::model::Platform;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::info;

/// The mechanism [`SystemSearch`](super::SystemSearch) uses for pattern searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Everything command-line interface (`es.exe`), Windows only.
    Everything { program: PathBuf },
    /// `fd`, or `fdfind` as packaged on Debian and Ubuntu.
    Fd { program: PathBuf },
    /// In-process bounded directory walk.
    Walk,
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Everything { .. } => "everything",
            Backend::Fd { .. } => "fd",
            Backend::Walk => "walk",
        }
    }

    pub fn program(&self) -> Option<&Path> {
        match self {
            Backend::Everything { program } | Backend::Fd { program } => Some(program),
            Backend::Walk => None,
        }
    }
}

/// Search tools available on this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tools {
    pub backend: Backend,
    /// `locate` database client, used for literal patterns.
    pub locate: Option<PathBuf>,
}

impl Tools {
    /// Probes `PATH` (and the directory of the running executable for `es.exe`).
    pub fn detect() -> Self {
        let backend = match Platform::current() {
            Platform::Windows => everything_program()
                .map(|program| Backend::Everything { program })
                .unwrap_or(Backend::Walk),
            _ => find_program("fd")
                .or_else(|| find_program("fdfind"))
                .map(|program| Backend::Fd { program })
                .unwrap_or(Backend::Walk),
        };

        let locate = match Platform::current() {
            Platform::Windows => None,
            _ => find_program("locate").or_else(|| find_program("plocate")),
        };

        if backend == Backend::Walk {
            info!("Using search backend: walk (install fd or Everything for faster searches)");
        } else {
            info!("Using search backend: {}", backend.name());
        }

        Self { backend, locate }
    }
}

/// Tools detected on first use, cached for the lifetime of the process.
pub fn detected_tools() -> &'static Tools {
    static TOOLS: OnceLock<Tools> = OnceLock::new();
    TOOLS.get_or_init(Tools::detect)
}

fn everything_program() -> Option<PathBuf> {
    let bundled = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("es.exe")))
        .filter(|path| path.is_file());

    bundled.or_else(|| find_program("es"))
}

/// Looks `name` up on `PATH`, appending the platform executable suffix.
pub(crate) fn find_program(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    let file_name = format!("{}{}", name, crate::platform::exe_suffix());

    std::env::split_paths(&path_var)
        .map(|dir| dir.join(&file_name))
        .find(|candidate| crate::detector::probe::is_executable(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_names() {
        assert_eq!(Backend::Walk.name(), "walk");
        assert_eq!(Backend::Walk.program(), None);

        let fd = Backend::Fd {
            program: PathBuf::from("/usr/bin/fdfind"),
        };
        assert_eq!(fd.name(), "fd");
        assert_eq!(fd.program(), Some(Path::new("/usr/bin/fdfind")));
    }

    #[test]
    fn test_detected_tools_is_cached() {
        let first = detected_tools() as *const Tools;
        let second = detected_tools() as *const Tools;
        assert_eq!(first, second);
    }

    #[test]
    fn test_find_program_missing() {
        assert!(find_program("cefdetect-definitely-not-installed").is_none());
    }
}
