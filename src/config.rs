//! Configuration file handling.
//!
//! This module provides loading and saving of cefdetect configuration
//! from a TOML file.
//!
//! # Configuration Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/cefdetect/config.toml`
//! - macOS: `~/Library/Application Support/cefdetect/config.toml`
//! - Windows: `%APPDATA%\cefdetect\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! search_timeout_secs = 30
//! size_max_depth = 10
//! home_max_depth = 6
//! root_max_depth = 16
//! extra_roots = ["/data/apps"]
//! default_format = "table"
//!
//! [ignore]
//! paths = ["*/node_modules/*", "/opt/old-builds/*"]
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::detector::DetectorOptions;
use crate::platform::{self, SearchRoot};

/// Application configuration.
///
/// This struct represents all configurable options for cefdetect.
/// It can be loaded from a TOML file or created with default values.
///
/// # Example
///
/// ```no_run
/// use cefdetect::Config;
///
/// // Load from file (or use defaults if file doesn't exist)
/// let config = Config::load().unwrap();
///
/// println!("Search timeout: {}s", config.search_timeout_secs);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upper bound for a single external search invocation, in seconds.
    /// A search that runs longer counts as having found nothing.
    ///
    /// Default: 30
    pub search_timeout_secs: u64,

    /// How many directory levels size accounting descends.
    ///
    /// Default: 10
    pub size_max_depth: usize,

    /// How deep the search descends into the home directory.
    ///
    /// Default: 6
    pub home_max_depth: usize,

    /// How deep the directory walk descends into the other application roots.
    ///
    /// Default: 16
    pub root_max_depth: usize,

    /// Additional directories to search, on top of the platform roots.
    pub extra_roots: Vec<PathBuf>,

    /// Default output format when no `--format` flag is provided.
    ///
    /// Valid values: "table", "json"
    /// Default: "table"
    pub default_format: String,

    /// Replaces the platform hint shown when nothing is found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_hint: Option<String>,

    /// Ignore list configuration for skipping known locations.
    #[serde(default)]
    pub ignore: IgnoreConfig,
}

/// Candidate paths to leave out of a scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Path patterns to skip. Supports `*` as a wildcard
    /// (e.g. "*/node_modules/*", "/opt/legacy/*").
    pub paths: Vec<String>,
}

impl IgnoreConfig {
    /// Check if a candidate path should be ignored.
    ///
    /// Separators compare as `/` on both sides, so `C:\Games\*` also
    /// matches a path reported as `C:/Games/...`.
    pub fn should_ignore_path(&self, path: &str) -> bool {
        let path = with_forward_slashes(path);
        self.paths
            .iter()
            .any(|pattern| glob_match(&with_forward_slashes(pattern), &path))
    }
}

fn with_forward_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

/// Matches `text` against `pattern`, where `*` stands for any run of
/// characters, separators included. Without a `*` the two must be equal.
fn glob_match(pattern: &str, text: &str) -> bool {
    let mut segments = pattern.split('*');
    let head = segments.next().unwrap_or_default();
    let Some(mut rest) = text.strip_prefix(head) else {
        return false;
    };

    let tail: Vec<&str> = segments.collect();
    let Some((last, middle)) = tail.split_last() else {
        return rest.is_empty();
    };

    // leftmost match of each middle segment leaves the most room for the rest
    for segment in middle.iter().filter(|s| !s.is_empty()) {
        match rest.find(segment) {
            Some(pos) => rest = &rest[pos + segment.len()..],
            None => return false,
        }
    }

    rest.ends_with(last)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_timeout_secs: 30,
            size_max_depth: crate::detector::size::DEFAULT_MAX_DEPTH,
            home_max_depth: 6,
            root_max_depth: 16,
            extra_roots: Vec::new(),
            default_format: "table".to_string(),
            empty_hint: None,
            ignore: IgnoreConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the config file.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves the configuration to the config file.
    ///
    /// Creates the parent directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Returns the path to the configuration file.
    ///
    /// # Example
    ///
    /// ```
    /// use cefdetect::Config;
    ///
    /// let path = Config::config_path();
    /// println!("Config file: {}", path.display());
    /// ```
    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    /// Generates a string containing the default configuration.
    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    /// Platform roots followed by `extra_roots` (depth-capped like the platform roots).
    pub fn search_roots(&self) -> Vec<SearchRoot> {
        let mut roots = platform::default_search_roots(self.root_max_depth, self.home_max_depth);
        for extra in &self.extra_roots {
            if !roots.iter().any(|r| &r.path == extra) {
                roots.push(SearchRoot::new(extra.clone(), Some(self.root_max_depth)));
            }
        }
        roots
    }

    pub fn detector_options(&self) -> DetectorOptions {
        DetectorOptions {
            size_max_depth: self.size_max_depth,
            ignore: self.ignore.clone(),
            empty_hint: self
                .empty_hint
                .clone()
                .unwrap_or_else(|| platform::nothing_found_hint().to_string()),
        }
    }
}
