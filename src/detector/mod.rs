//! Detection of installed Chromium-based applications.
//!
//! The [`Detector`] drives a scan through a fixed sequence of passes:
//!
//! | State | Searches for | Per hit |
//! |-------|--------------|---------|
//! | [`ScanState::RunningResourcePass`] | locale resource packs (`*_100_percent.pak`) | resolve directory, default `Unknown` |
//! | [`ScanState::RunningLibraryPass`] | CEF shared libraries (`libcef*`) | resolve directory, default `CEF` |
//! | [`ScanState::RunningNodeModulePass`] | native Node modules (`node*.dll`, `node*.so`) | embedded-runtime markers only |
//!
//! Each detection is emitted as a [`ScanEvent`] as soon as it is found, and
//! the scan always ends with a [`ScanOutcome`]; nothing in here fails.
//!
//! # Example
//!
//! ```no_run
//! use cefdetect::detector::Detector;
//! use cefdetect::platform::default_search_roots;
//! use cefdetect::search::SystemSearch;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let search = SystemSearch::new(default_search_roots(16, 6), Duration::from_secs(30));
//!     let outcome = Detector::new(Arc::new(search)).run().await;
//!     for app in outcome.apps() {
//!         println!("{:<14} {}", app.category, app.path.display());
//!     }
//! }
//! ```

pub mod probe;
pub mod resolve;
pub mod signature;
pub mod size;

use crate::config::IgnoreConfig;
use crate::model::{Category, DetectedApp, ScanOutcome, ScanReport};
use crate::platform;
use crate::search::{Pattern, SearchProvider};
use chrono::Utc;
use resolve::Resolution;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

/// Path fragments of locations that only hold copies or leftovers.
const NOISE_FRAGMENTS: &[&str] = &["$RECYCLE.BIN", "OneDrive", "/.Trash", "/.cache"];

/// Where a scan currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    RunningResourcePass,
    RunningLibraryPass,
    RunningNodeModulePass,
    Done,
}

impl ScanState {
    pub fn description(&self) -> &'static str {
        match self {
            ScanState::Idle => "Starting",
            ScanState::RunningResourcePass => "Searching resource packs",
            ScanState::RunningLibraryPass => "Searching CEF libraries",
            ScanState::RunningNodeModulePass => "Searching native Node modules",
            ScanState::Done => "Done",
        }
    }
}

/// Progress notifications sent while a scan runs.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    StateChanged(ScanState),
    Detected {
        app: DetectedApp,
        /// Icon bytes from the [`IconProvider`], for file detections.
        icon: Option<Vec<u8>>,
    },
}

/// Supplies an icon for a detected executable.
pub trait IconProvider: Send + Sync {
    fn icon(&self, executable: &Path) -> Option<Vec<u8>>;
}

/// Icon provider that never has an icon.
pub struct NoIcons;

impl IconProvider for NoIcons {
    fn icon(&self, _executable: &Path) -> Option<Vec<u8>> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct DetectorOptions {
    /// Recursion cap for size accounting.
    pub size_max_depth: usize,
    /// Candidate paths to skip on top of the built-in noise list.
    pub ignore: IgnoreConfig,
    /// Message carried by [`ScanOutcome::NothingFound`].
    pub empty_hint: String,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            size_max_depth: size::DEFAULT_MAX_DEPTH,
            ignore: IgnoreConfig::default(),
            empty_hint: platform::nothing_found_hint().to_string(),
        }
    }
}

enum PassKind {
    /// Resolve each hit's directory; unresolved ones are reported under `default`.
    Resolve { default: Category },
    /// Look for embedded-runtime markers next to each hit.
    Embedded,
}

struct Pass {
    state: ScanState,
    patterns: Vec<Pattern>,
    kind: PassKind,
}

fn passes() -> Vec<Pass> {
    vec![
        Pass {
            state: ScanState::RunningResourcePass,
            patterns: vec![platform::resource_pattern()],
            kind: PassKind::Resolve {
                default: Category::Unknown,
            },
        },
        Pass {
            state: ScanState::RunningLibraryPass,
            patterns: platform::library_patterns(),
            kind: PassKind::Resolve {
                default: Category::Cef,
            },
        },
        Pass {
            state: ScanState::RunningNodeModulePass,
            patterns: vec![platform::node_module_pattern()],
            kind: PassKind::Embedded,
        },
    ]
}

/// Runs scans against a [`SearchProvider`].
///
/// A detector holds no scan state: every [`run`](Detector::run) starts from
/// fresh dedup sets, so one detector can scan repeatedly.
pub struct Detector {
    provider: Arc<dyn SearchProvider>,
    options: DetectorOptions,
    icons: Arc<dyn IconProvider>,
    events: Option<UnboundedSender<ScanEvent>>,
    cancel: Arc<AtomicBool>,
}

impl Detector {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            provider,
            options: DetectorOptions::default(),
            icons: Arc::new(NoIcons),
            events: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_options(mut self, options: DetectorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_icons(mut self, icons: Arc<dyn IconProvider>) -> Self {
        self.icons = icons;
        self
    }

    /// Sends progress and detections to `events` while scanning.
    pub fn with_events(mut self, events: UnboundedSender<ScanEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Uses `flag` for cancellation; setting it stops the scan at the next candidate.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Runs a full scan.
    pub async fn run(&self) -> ScanOutcome {
        let mut scan = Scan::new(self);
        scan.enter(ScanState::Idle);
        scan.running = self.provider.running_executables().await;

        for pass in passes() {
            if self.is_cancelled() {
                break;
            }
            scan.enter(pass.state);

            // directory dedup is per pass
            let mut seen_dirs: HashSet<PathBuf> = HashSet::new();

            for pattern in &pass.patterns {
                if self.is_cancelled() {
                    break;
                }
                let candidates = self.provider.search(pattern).await;
                info!(
                    "{} candidates for {} via {}",
                    candidates.len(),
                    pattern,
                    self.provider.name()
                );

                for candidate in candidates {
                    if self.is_cancelled() {
                        info!("Scan cancelled");
                        break;
                    }
                    match pass.kind {
                        PassKind::Resolve { default } => {
                            scan.resolve_candidate(&candidate, default, &mut seen_dirs)
                        }
                        PassKind::Embedded => scan.embedded_candidate(&candidate, &mut seen_dirs),
                    }
                }
            }
        }

        scan.enter(ScanState::Done);
        scan.finish()
    }
}

/// State of one scan: the detection dedup set, the results and the total.
struct Scan<'a> {
    detector: &'a Detector,
    state: ScanState,
    running: HashSet<PathBuf>,
    seen_apps: HashSet<PathBuf>,
    apps: Vec<DetectedApp>,
    total_size: u64,
}

impl<'a> Scan<'a> {
    fn new(detector: &'a Detector) -> Self {
        Self {
            detector,
            state: ScanState::Idle,
            running: HashSet::new(),
            seen_apps: HashSet::new(),
            apps: Vec::new(),
            total_size: 0,
        }
    }

    fn enter(&mut self, state: ScanState) {
        debug!("Scan state {:?} -> {:?}", self.state, state);
        self.state = state;
        self.emit(ScanEvent::StateChanged(state));
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(events) = &self.detector.events {
            // a dropped receiver just means nobody is watching
            let _ = events.send(event);
        }
    }

    fn should_skip(&self, candidate: &Path, skip_logs: bool) -> bool {
        if is_noise(candidate, skip_logs) {
            debug!("Skipping noise location {}", candidate.display());
            return true;
        }
        if self
            .detector
            .options
            .ignore
            .should_ignore_path(&candidate.to_string_lossy())
        {
            debug!("Skipping ignored path {}", candidate.display());
            return true;
        }
        false
    }

    fn resolve_candidate(
        &mut self,
        candidate: &Path,
        default: Category,
        seen_dirs: &mut HashSet<PathBuf>,
    ) {
        if self.should_skip(candidate, true) {
            return;
        }
        let dir = match candidate.parent() {
            Some(dir) => dir.to_path_buf(),
            None => return,
        };
        if !seen_dirs.insert(dir.clone()) {
            return;
        }
        if !is_existing_file(candidate) {
            return;
        }

        match resolve::resolve_directory(&dir) {
            Resolution::Identified { path, category } => self.add(path, category, false),
            Resolution::Unresolved {
                fallback: Some(path),
            } => self.add(path, default, false),
            Resolution::Unresolved { fallback: None } => {
                let parent = dir.parent().map(resolve::resolve_directory);
                match parent {
                    Some(Resolution::Identified { path, category }) => {
                        self.add(path, category, false)
                    }
                    Some(Resolution::Unresolved {
                        fallback: Some(path),
                    }) => self.add(path, default, false),
                    _ => self.add(dir, default, true),
                }
            }
        }
    }

    fn embedded_candidate(&mut self, candidate: &Path, seen_dirs: &mut HashSet<PathBuf>) {
        if self.should_skip(candidate, false) {
            return;
        }
        if !is_existing_file(candidate) {
            return;
        }
        let dir = match candidate.parent() {
            Some(dir) => dir.to_path_buf(),
            None => return,
        };
        if !seen_dirs.insert(dir.clone()) {
            return;
        }
        if let Some((path, category)) = resolve::scan_embedded(&dir) {
            self.add(path, category, false);
        }
    }

    fn add(&mut self, path: PathBuf, category: Category, is_directory: bool) {
        if !self.seen_apps.insert(path.clone()) {
            debug!("Already reported {}", path.display());
            return;
        }

        let before = self.total_size;
        self.total_size += size::accumulate(&path, self.detector.options.size_max_depth);
        let size_bytes = self.total_size - before;

        let app = if is_directory {
            DetectedApp::directory(path, category).with_size(size_bytes)
        } else {
            let running = self.running.contains(&path);
            DetectedApp::file(path, category)
                .with_size(size_bytes)
                .with_running(running)
        };
        info!("Found {} application at {}", app.category, app.path.display());

        let icon = if is_directory {
            None
        } else {
            self.detector.icons.icon(&app.path)
        };
        self.emit(ScanEvent::Detected {
            app: app.clone(),
            icon,
        });
        self.apps.push(app);
    }

    fn finish(self) -> ScanOutcome {
        let cancelled = self.detector.is_cancelled();
        if self.apps.is_empty() {
            return ScanOutcome::NothingFound {
                scan_time: Utc::now(),
                hint: self.detector.options.empty_hint.clone(),
                cancelled,
            };
        }
        ScanOutcome::Detected(ScanReport::new(self.apps, self.total_size).with_cancelled(cancelled))
    }
}

/// True for paths inside recycle bins, trash, sync folders and caches, and
/// (when `skip_logs`) for log files.
fn is_noise(path: &Path, skip_logs: bool) -> bool {
    let text = path.to_string_lossy().replace('\\', "/");
    if NOISE_FRAGMENTS.iter().any(|fragment| text.contains(fragment)) {
        return true;
    }
    skip_logs
        && path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("log"))
            .unwrap_or(false)
}

/// The candidate itself must still be there and must not be a directory.
fn is_existing_file(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(metadata) => !metadata.is_dir(),
        Err(_) => false,
    }
}
