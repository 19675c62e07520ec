//! Resolution strategies: from a directory to its application executable.
//!
//! Strategies run in order and stop at the first one that identifies an
//! executable:
//!
//! 1. Edge: `<dir>/msedge.exe` (or `microsoft-edge`) exists.
//! 2. Chrome PWA: `<dir>/chrome_pwa_launcher` exists and so does `<dir>/../chrome`.
//! 3. Binary scan: the first executable in the directory whose content carries
//!    a runtime marker. The first executable that isn't an uninstaller, setup
//!    or crash reporter is remembered as a fallback.
//!
//! The fallback is not checked against the executable that later classifies,
//! so a directory holding several unrelated programs may report the wrong one
//! when nothing classifies.

use super::probe;
use super::signature::Classifier;
use crate::model::Category;
use crate::platform;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Result of running the strategies against one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Identified { path: PathBuf, category: Category },
    Unresolved { fallback: Option<PathBuf> },
}

impl Resolution {
    fn unresolved() -> Self {
        Resolution::Unresolved { fallback: None }
    }
}

type Strategy = fn(&Path) -> Resolution;

const STRATEGIES: &[(&str, Strategy)] = &[
    ("edge", edge_binary),
    ("chrome-pwa", chrome_pwa_launcher),
    ("binary-scan", binary_scan),
];

/// Name fragments of executables never used as a fallback.
const IGNORED_FALLBACK_FRAGMENTS: &[&str] = &["unins", "setup", "report"];

/// Runs every strategy against `dir` in order.
pub fn resolve_directory(dir: &Path) -> Resolution {
    let mut fallback = None;

    for (name, strategy) in STRATEGIES {
        match strategy(dir) {
            Resolution::Identified { path, category } => {
                debug!("{} resolved {} as {}", name, path.display(), category);
                return Resolution::Identified { path, category };
            }
            Resolution::Unresolved { fallback: Some(path) } if fallback.is_none() => {
                fallback = Some(path);
            }
            Resolution::Unresolved { .. } => {}
        }
    }

    Resolution::Unresolved { fallback }
}

fn edge_binary(dir: &Path) -> Resolution {
    let path = dir.join(platform::edge_binary_name());
    if path.is_file() {
        Resolution::Identified {
            path,
            category: Category::Edge,
        }
    } else {
        Resolution::unresolved()
    }
}

fn chrome_pwa_launcher(dir: &Path) -> Resolution {
    if !dir.join(platform::chrome_pwa_launcher_name()).is_file() {
        return Resolution::unresolved();
    }
    let chrome = match dir.parent() {
        Some(parent) => parent.join(platform::chrome_binary_name()),
        None => return Resolution::unresolved(),
    };
    if chrome.is_file() {
        Resolution::Identified {
            path: chrome,
            category: Category::Chrome,
        }
    } else {
        Resolution::unresolved()
    }
}

fn binary_scan(dir: &Path) -> Resolution {
    let classifier = Classifier::runtime();
    let mut fallback = None;

    for name in probe::list_executables(dir) {
        let path = dir.join(&name);
        if let Some(category) = classifier.classify_file(&path) {
            return Resolution::Identified { path, category };
        }
        if fallback.is_none() && !is_ignored_fallback(&name) {
            fallback = Some(path);
        }
    }

    Resolution::Unresolved { fallback }
}

/// Returns true for uninstaller, setup and crash-report executables.
pub fn is_ignored_fallback(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    IGNORED_FALLBACK_FRAGMENTS
        .iter()
        .any(|fragment| lower.contains(fragment))
}

/// Scans the executables in `dir` for the embedded-runtime markers only.
///
/// Returns the first executable that matches.
pub fn scan_embedded(dir: &Path) -> Option<(PathBuf, Category)> {
    let classifier = Classifier::embedded();
    probe::list_executables(dir).into_iter().find_map(|name| {
        let path = dir.join(name);
        classifier.classify_file(&path).map(|category| (path, category))
    })
}
