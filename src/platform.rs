//! Cross-platform names, roots and search patterns.
//!
//! This module collects everything that differs between operating systems so
//! the resolution and orchestration code stays portable: well-known browser
//! binary names, the executable suffix, the application roots the bounded
//! walk covers, and the per-pass search patterns.

use crate::model::Platform;
use crate::search::Pattern;
use std::path::PathBuf;

/// Returns the file name of the Edge browser binary.
///
/// - Windows: `msedge.exe`
/// - Elsewhere: `microsoft-edge`
pub fn edge_binary_name() -> &'static str {
    match Platform::current() {
        Platform::Windows => "msedge.exe",
        _ => "microsoft-edge",
    }
}

/// Returns the file name of Chrome's PWA launcher companion binary.
pub fn chrome_pwa_launcher_name() -> &'static str {
    match Platform::current() {
        Platform::Windows => "chrome_pwa_launcher.exe",
        _ => "chrome_pwa_launcher",
    }
}

/// Returns the file name of the Chrome binary that sits one directory above
/// the PWA launcher.
pub fn chrome_binary_name() -> &'static str {
    match Platform::current() {
        Platform::Windows => "chrome.exe",
        _ => "chrome",
    }
}

/// Returns the executable suffix (`.exe` on Windows, empty elsewhere).
pub fn exe_suffix() -> &'static str {
    match Platform::current() {
        Platform::Windows => ".exe",
        _ => "",
    }
}

/// A directory the bounded walk (and `fd`) searches, with an optional depth cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRoot {
    pub path: PathBuf,
    pub max_depth: Option<usize>,
}

impl SearchRoot {
    pub fn new(path: impl Into<PathBuf>, max_depth: Option<usize>) -> Self {
        Self {
            path: path.into(),
            max_depth,
        }
    }
}

/// Returns the well-known application roots for the current platform.
///
/// Platform-specific locations:
/// - Linux: `/usr/lib`, `/usr/local`, `/opt`, `/snap`, then the home directory
/// - macOS: `/Applications`, `~/Applications`, `/usr/local`, `/opt`, then home
/// - Windows: `%ProgramFiles%`, `%ProgramFiles(x86)%`, local and roaming app data
///
/// The home directory is limited to `home_max_depth`; every other root to
/// `root_max_depth`. Roots that don't exist are left out.
pub fn default_search_roots(root_max_depth: usize, home_max_depth: usize) -> Vec<SearchRoot> {
    let mut roots = Vec::new();
    let root_depth = Some(root_max_depth);

    match Platform::current() {
        Platform::Linux => {
            for dir in ["/usr/lib", "/usr/local", "/opt", "/snap"] {
                roots.push(SearchRoot::new(dir, root_depth));
            }
            if let Some(home) = dirs::home_dir() {
                roots.push(SearchRoot::new(home, Some(home_max_depth)));
            }
        }
        Platform::MacOS => {
            roots.push(SearchRoot::new("/Applications", root_depth));
            if let Some(home) = dirs::home_dir() {
                roots.push(SearchRoot::new(home.join("Applications"), root_depth));
            }
            for dir in ["/usr/local", "/opt"] {
                roots.push(SearchRoot::new(dir, root_depth));
            }
            if let Some(home) = dirs::home_dir() {
                roots.push(SearchRoot::new(home, Some(home_max_depth)));
            }
        }
        Platform::Windows => {
            for var in ["ProgramFiles", "ProgramFiles(x86)"] {
                if let Some(dir) = std::env::var_os(var) {
                    roots.push(SearchRoot::new(dir, root_depth));
                }
            }
            if let Some(local) = dirs::data_local_dir() {
                roots.push(SearchRoot::new(local, root_depth));
            }
            if let Some(roaming) = dirs::data_dir() {
                roots.push(SearchRoot::new(roaming, root_depth));
            }
        }
    }

    let mut unique: Vec<SearchRoot> = Vec::with_capacity(roots.len());
    for root in roots {
        if root.path.is_dir() && !unique.iter().any(|r| r.path == root.path) {
            unique.push(root);
        }
    }
    unique
}

/// Pattern matching Chromium locale/resource packs (e.g. `chrome_100_percent.pak`).
pub fn resource_pattern() -> Pattern {
    Pattern::regex(r"_100_(.+?)\.pak$")
}

/// Patterns matching the CEF shared library, including versioned suffixes.
///
/// Outside Windows the `.dll` form is searched too, for Wine installs.
pub fn library_patterns() -> Vec<Pattern> {
    match Platform::current() {
        Platform::Windows => vec![Pattern::literal("libcef")],
        _ => vec![
            Pattern::regex(r"libcef.*\.so"),
            Pattern::regex(r"libcef.*\.dll"),
        ],
    }
}

/// Pattern matching native Node-addon style libraries.
pub fn node_module_pattern() -> Pattern {
    match Platform::current() {
        Platform::Windows => Pattern::regex(r"node.*\.dll"),
        _ => Pattern::regex(r"node.*\.(so|dll)"),
    }
}

/// Message shown when a scan detects nothing, suggesting how to improve coverage.
pub fn nothing_found_hint() -> &'static str {
    match Platform::current() {
        Platform::Windows => {
            "No Chromium-based applications found (is Everything installed and es.exe available?)"
        }
        _ => {
            "No Chromium-based applications found (try installing fd and running `sudo updatedb` to improve search coverage)"
        }
    }
}

/// Returns the configuration directory for cefdetect.
///
/// Platform-specific locations:
/// - Linux: `~/.config/cefdetect/`
/// - macOS: `~/Library/Application Support/cefdetect/`
/// - Windows: `%APPDATA%\cefdetect\`
///
/// Falls back to the current directory if no config directory can be determined.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cefdetect")
}
