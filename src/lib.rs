pub mod config;
pub mod detector;
pub mod model;
pub mod output;
pub mod platform;
pub mod search;

pub use config::Config;
pub use detector::{Detector, ScanEvent, ScanState};
pub use model::{Category, DetectedApp, Platform, ScanOutcome, ScanReport};
pub use search::{SearchProvider, SystemSearch, WalkSearch};
