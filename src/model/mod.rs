//! Core data types for detections and scan results.
//!
//! This module contains the fundamental types used throughout cefdetect:
//!
//! - [`Category`] - The runtime family a detected application is built on
//! - [`Platform`] - Operating system platform
//! - [`DetectedApp`] - One detected application
//! - [`ScanReport`] - Complete scan results
//! - [`ScanOutcome`] - A report, or the distinct "nothing found" result
//!
//! # Example
//!
//! ```
//! use cefdetect::{Category, DetectedApp, ScanReport};
//!
//! let app = DetectedApp::file("/opt/Slack/slack", Category::Electron).with_size(1024);
//! let report = ScanReport::new(vec![app], 1024);
//!
//! println!("Detected {} applications", report.apps.len());
//! ```

mod app;

pub use app::*;
