use async_trait::async_trait;
use cefdetect::detector::{Detector, DetectorOptions, IconProvider, ScanEvent, ScanState};
use cefdetect::platform::{self, SearchRoot};
use cefdetect::search::{Backend, Pattern, SearchProvider, SystemSearch, Tools, WalkSearch};
use cefdetect::{Category, DetectedApp, ScanOutcome};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn write_exe(dir: &Path, stem: &str, content: &[u8]) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(format!("{}{}", stem, platform::exe_suffix()));
    fs::write(&path, content).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }
    path
}

fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn walk(root: &Path) -> Arc<dyn SearchProvider> {
    Arc::new(WalkSearch::new(vec![SearchRoot::new(root, None)]))
}

fn detected(outcome: &ScanOutcome) -> Vec<DetectedApp> {
    match outcome {
        ScanOutcome::Detected(report) => report.apps.clone(),
        ScanOutcome::NothingFound { .. } => panic!("expected detections, got {:?}", outcome),
    }
}

/// Walk provider with a fixed process snapshot.
struct FixedProcesses {
    inner: WalkSearch,
    running: HashSet<PathBuf>,
}

#[async_trait]
impl SearchProvider for FixedProcesses {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn search(&self, pattern: &Pattern) -> Vec<PathBuf> {
        self.inner.search(pattern).await
    }

    async fn running_executables(&self) -> HashSet<PathBuf> {
        self.running.clone()
    }
}

struct StaticIcon;

impl IconProvider for StaticIcon {
    fn icon(&self, _executable: &Path) -> Option<Vec<u8>> {
        Some(vec![0x89, b'P', b'N', b'G'])
    }
}

#[tokio::test]
async fn test_edge_next_to_resource_pack() {
    let root = tempfile::tempdir().unwrap();
    let app = root.path().join("app");
    let edge = write_file(&app, platform::edge_binary_name(), &[0u8; 500]);
    write_file(&app, "msedge_100_percent.pak", b"pak");

    let outcome = Detector::new(walk(root.path())).run().await;
    let apps = detected(&outcome);

    assert_eq!(
        apps,
        vec![DetectedApp {
            path: edge,
            category: Category::Edge,
            is_directory: false,
            size_bytes: 500,
            running: false,
        }]
    );
    assert_eq!(outcome.total_size(), 500);
}

#[tokio::test]
async fn test_same_app_from_two_passes_reported_once() {
    let root = tempfile::tempdir().unwrap();
    let app = root.path().join("Slack");
    write_file(&app, "chrome_100_percent.pak", b"pak");
    write_file(&app, "libcef.dll", b"dll");
    let exe = write_exe(&app, "slack", b"\0third_party/electron_node\0");

    let outcome = Detector::new(walk(root.path())).run().await;
    let apps = detected(&outcome);

    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].path, exe);
    assert_eq!(apps[0].category, Category::Electron);
}

#[tokio::test]
async fn test_setup_and_report_are_not_the_app() {
    let root = tempfile::tempdir().unwrap();
    let app = root.path().join("game");
    write_exe(&app, "setup", b"plain");
    write_exe(&app, "report", b"plain");
    let launcher = write_exe(&app, "launcher", b"..url-nwjs..");
    write_file(&app, "nw_100_percent.pak", b"pak");

    let apps = detected(&Detector::new(walk(root.path())).run().await);

    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].path, launcher);
    assert_eq!(apps[0].category, Category::NwJs);
}

#[tokio::test]
async fn test_empty_environment_is_nothing_found() {
    let root = tempfile::tempdir().unwrap();
    let options = DetectorOptions {
        empty_hint: "install fd".to_string(),
        ..DetectorOptions::default()
    };

    let outcome = Detector::new(walk(root.path()))
        .with_options(options)
        .run()
        .await;

    match outcome {
        ScanOutcome::NothingFound { hint, cancelled, .. } => {
            assert_eq!(hint, "install fd");
            assert!(!cancelled);
        }
        other => panic!("expected nothing found, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unresolved_directory_reported_whole() {
    let root = tempfile::tempdir().unwrap();
    let data = root.path().join("vendor").join("ui");
    write_file(&data, "chrome_100_percent.pak", &[0u8; 64]);

    let apps = detected(&Detector::new(walk(root.path())).run().await);

    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].path, data);
    assert!(apps[0].is_directory);
    assert_eq!(apps[0].category, Category::Unknown);
    let expected = fs::metadata(&data).unwrap().len() + 64;
    assert_eq!(apps[0].size_bytes, expected);
}

#[tokio::test]
async fn test_parent_directory_fallback() {
    let root = tempfile::tempdir().unwrap();
    let app = root.path().join("tool");
    write_exe(&app, "unins000", b"plain");
    let main = write_exe(&app, "tool", b"plain");
    write_file(&app.join("resources"), "chrome_100_percent.pak", b"pak");

    let apps = detected(&Detector::new(walk(root.path())).run().await);

    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].path, main);
    assert_eq!(apps[0].category, Category::Unknown);
    assert!(!apps[0].is_directory);
}

#[tokio::test]
async fn test_library_pass_defaults_to_cef() {
    let root = tempfile::tempdir().unwrap();
    let app = root.path().join("launcher");
    write_file(&app, "libcef.dll", b"dll");
    let host = write_exe(&app, "host", b"plain");

    let apps = detected(&Detector::new(walk(root.path())).run().await);

    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].path, host);
    assert_eq!(apps[0].category, Category::Cef);
}

#[tokio::test]
async fn test_node_module_pass_finds_mini_blink() {
    let root = tempfile::tempdir().unwrap();
    let app = root.path().join("mini");
    write_file(&app, "node.dll", b"dll");
    write_exe(&app, "a-helper", b"plain");
    let host = write_exe(&app, "b-host", b"...miniblink...");

    let apps = detected(&Detector::new(walk(root.path())).run().await);

    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].path, host);
    assert_eq!(apps[0].category, Category::MiniBlink);
}

#[tokio::test]
async fn test_failing_search_tool_does_not_abort_scan() {
    let root = tempfile::tempdir().unwrap();
    let app = root.path().join("app");
    let edge = write_file(&app, platform::edge_binary_name(), &[0u8; 500]);
    write_file(&app, "msedge_100_percent.pak", b"pak");

    let tools = Tools {
        backend: Backend::Fd {
            program: root.path().join("missing-fd"),
        },
        locate: Some(root.path().join("missing-locate")),
    };
    let search = SystemSearch::with_tools(
        tools,
        vec![SearchRoot::new(root.path(), None)],
        Duration::from_secs(5),
    );

    let apps = detected(&Detector::new(Arc::new(search)).run().await);
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].path, edge);
}

#[tokio::test]
async fn test_events_follow_state_machine() {
    let root = tempfile::tempdir().unwrap();
    let app = root.path().join("app");
    write_file(&app, platform::edge_binary_name(), &[0u8; 10]);
    write_file(&app, "msedge_100_percent.pak", b"pak");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let detector = Detector::new(walk(root.path()))
        .with_icons(Arc::new(StaticIcon))
        .with_events(tx);
    detector.run().await;
    drop(detector);

    let mut states = Vec::new();
    let mut detections = Vec::new();
    while let Some(event) = rx.recv().await {
        match event {
            ScanEvent::StateChanged(state) => states.push(state),
            ScanEvent::Detected { app, icon } => detections.push((app, icon)),
        }
    }

    assert_eq!(
        states,
        vec![
            ScanState::Idle,
            ScanState::RunningResourcePass,
            ScanState::RunningLibraryPass,
            ScanState::RunningNodeModulePass,
            ScanState::Done,
        ]
    );
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].0.category, Category::Edge);
    assert_eq!(detections[0].1.as_deref(), Some(&[0x89, b'P', b'N', b'G'][..]));
}

#[tokio::test]
async fn test_directory_detection_gets_no_icon() {
    let root = tempfile::tempdir().unwrap();
    write_file(&root.path().join("data"), "chrome_100_percent.pak", b"pak");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let detector = Detector::new(walk(root.path()))
        .with_icons(Arc::new(StaticIcon))
        .with_events(tx);
    detector.run().await;
    drop(detector);

    let mut icons = Vec::new();
    while let Some(event) = rx.recv().await {
        if let ScanEvent::Detected { app, icon } = event {
            assert!(app.is_directory);
            icons.push(icon);
        }
    }
    assert_eq!(icons, vec![None]);
}

#[tokio::test]
async fn test_running_annotation_from_snapshot() {
    let root = tempfile::tempdir().unwrap();
    let app = root.path().join("app");
    let edge = write_file(&app, platform::edge_binary_name(), &[0u8; 10]);
    write_file(&app, "msedge_100_percent.pak", b"pak");

    let provider = FixedProcesses {
        inner: WalkSearch::new(vec![SearchRoot::new(root.path(), None)]),
        running: HashSet::from([edge.clone()]),
    };

    let apps = detected(&Detector::new(Arc::new(provider)).run().await);
    assert_eq!(apps.len(), 1);
    assert!(apps[0].running);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let root = tempfile::tempdir().unwrap();
    let app = root.path().join("app");
    write_file(&app, platform::edge_binary_name(), &[0u8; 10]);
    write_file(&app, "msedge_100_percent.pak", b"pak");

    let flag = Arc::new(AtomicBool::new(false));
    let detector = Detector::new(walk(root.path())).with_cancel_flag(flag.clone());
    flag.store(true, Ordering::Relaxed);

    match detector.run().await {
        ScanOutcome::NothingFound { cancelled, .. } => assert!(cancelled),
        other => panic!("expected cancelled empty scan, got {:?}", other),
    }
}

#[tokio::test]
async fn test_noise_and_ignored_locations_skipped() {
    let root = tempfile::tempdir().unwrap();
    write_file(&root.path().join(".cache").join("app"), "chrome_100_percent.pak", b"pak");
    write_file(&root.path().join("old").join("app"), "chrome_100_percent.pak", b"pak");

    let mut options = DetectorOptions::default();
    options.ignore.paths = vec!["*/old/*".to_string()];

    let outcome = Detector::new(walk(root.path()))
        .with_options(options)
        .run()
        .await;
    assert!(outcome.is_nothing_found());
}

#[tokio::test]
async fn test_repeated_scans_start_fresh() {
    let root = tempfile::tempdir().unwrap();
    let app = root.path().join("app");
    write_file(&app, platform::edge_binary_name(), &[0u8; 10]);
    write_file(&app, "msedge_100_percent.pak", b"pak");

    let detector = Detector::new(walk(root.path()));
    let first = detector.run().await;
    let second = detector.run().await;

    assert_eq!(detected(&first), detected(&second));
    assert_eq!(second.total_size(), 10);
}

#[tokio::test]
async fn test_directory_detection_never_running() {
    let root = tempfile::tempdir().unwrap();
    let data = root.path().join("data");
    write_file(&data, "chrome_100_percent.pak", b"pak");

    let provider = FixedProcesses {
        inner: WalkSearch::new(vec![SearchRoot::new(root.path(), None)]),
        running: HashSet::from([data.clone()]),
    };

    let apps = detected(&Detector::new(Arc::new(provider)).run().await);
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].path, data);
    assert!(apps[0].is_directory);
    assert!(!apps[0].running);
}
