use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The Chromium-derived runtime an application was recognised as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Edge,
    Chrome,
    Electron,
    #[serde(rename = "nwjs")]
    NwJs,
    #[serde(rename = "cefsharp")]
    CefSharp,
    Cef,
    MiniElectron,
    MiniBlink,
    Unknown,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Edge => "edge",
            Category::Chrome => "chrome",
            Category::Electron => "electron",
            Category::NwJs => "nwjs",
            Category::CefSharp => "cefsharp",
            Category::Cef => "cef",
            Category::MiniElectron => "mini-electron",
            Category::MiniBlink => "mini-blink",
            Category::Unknown => "unknown",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Edge => "Edge",
            Category::Chrome => "Chrome",
            Category::Electron => "Electron",
            Category::NwJs => "NWJS",
            Category::CefSharp => "CefSharp",
            Category::Cef => "CEF",
            Category::MiniElectron => "Mini Electron",
            Category::MiniBlink => "Mini Blink",
            Category::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    MacOS,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        #[cfg(target_os = "windows")]
        return Platform::Windows;
        #[cfg(target_os = "macos")]
        return Platform::MacOS;
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        return Platform::Linux;
    }
}

/// One detected application.
///
/// `path` is the representative executable, or the whole directory when no
/// executable could be pinned down (`is_directory` is then `true`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedApp {
    pub path: PathBuf,
    pub category: Category,
    pub is_directory: bool,
    pub size_bytes: u64,
    #[serde(default)]
    pub running: bool,
}

impl DetectedApp {
    pub fn file(path: impl Into<PathBuf>, category: Category) -> Self {
        Self {
            path: path.into(),
            category,
            is_directory: false,
            size_bytes: 0,
            running: false,
        }
    }

    pub fn directory(path: impl Into<PathBuf>, category: Category) -> Self {
        Self {
            path: path.into(),
            category,
            is_directory: true,
            size_bytes: 0,
            running: false,
        }
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    pub fn with_running(mut self, running: bool) -> Self {
        self.running = running;
        self
    }

    /// File or directory name shown to the user.
    pub fn name(&self) -> String {
        display_name(&self.path)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Full result of a scan that detected at least one application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_time: DateTime<Utc>,
    /// Detections in the order they were emitted.
    pub apps: Vec<DetectedApp>,
    pub total_size: u64,
    #[serde(default)]
    pub cancelled: bool,
}

impl ScanReport {
    pub fn new(apps: Vec<DetectedApp>, total_size: u64) -> Self {
        Self {
            scan_time: Utc::now(),
            apps,
            total_size,
            cancelled: false,
        }
    }

    pub fn with_cancelled(mut self, cancelled: bool) -> Self {
        self.cancelled = cancelled;
        self
    }

    /// Detections ordered by attributed size, largest first.
    pub fn sorted_by_size(&self) -> Vec<&DetectedApp> {
        let mut apps: Vec<&DetectedApp> = self.apps.iter().collect();
        apps.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));
        apps
    }
}

/// Terminal result of a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScanOutcome {
    Detected(ScanReport),
    /// No application was found on any pass. This is not an error.
    NothingFound {
        scan_time: DateTime<Utc>,
        hint: String,
        cancelled: bool,
    },
}

impl ScanOutcome {
    pub fn apps(&self) -> &[DetectedApp] {
        match self {
            ScanOutcome::Detected(report) => &report.apps,
            ScanOutcome::NothingFound { .. } => &[],
        }
    }

    pub fn total_size(&self) -> u64 {
        match self {
            ScanOutcome::Detected(report) => report.total_size,
            ScanOutcome::NothingFound { .. } => 0,
        }
    }

    pub fn is_nothing_found(&self) -> bool {
        matches!(self, ScanOutcome::NothingFound { .. })
    }
}
