//! File search and process listing.
//!
//! This module provides the [`SearchProvider`] trait and the two providers
//! the detector runs against:
//!
//! | Provider | Mechanism |
//! |----------|-----------|
//! | [`SystemSearch`] | Everything (`es.exe`) on Windows, `fd`/`fdfind` elsewhere, `locate` for literal patterns, bounded walk as fallback |
//! | [`WalkSearch`] | In-process bounded-depth walk over a fixed set of roots |
//!
//! Search is best-effort: tool failures, timeouts and unreadable directories
//! all end up as "no results" and are only visible in debug logs.
//!
//! # Example
//!
//! ```no_run
//! use cefdetect::platform::default_search_roots;
//! use cefdetect::search::{Pattern, SearchProvider, SystemSearch};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let search = SystemSearch::new(default_search_roots(16, 6), Duration::from_secs(30));
//!     for path in search.search(&Pattern::regex(r"libcef.*\.so")).await {
//!         println!("{}", path.display());
//!     }
//! }
//! ```

mod backend;
mod command;
mod process;
mod walk;

pub use backend::{detected_tools, Backend, Tools};
pub use process::running_executables;
pub use walk::WalkSearch;

use crate::platform::SearchRoot;
use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Maximum number of paths taken from a `locate` query.
pub const LOCATE_LIMIT: usize = 1000;

/// Failure of a single search invocation.
///
/// These never leave a [`SearchProvider`]; they are logged and treated as an
/// empty result.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search tool not available: {0}")]
    ToolUnavailable(String),
    #[error("search tool timed out after {0:?}")]
    Timeout(Duration),
    #[error("search tool exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("search I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file name pattern, either a regular expression or a plain substring.
///
/// Matching is smart-case: a pattern without uppercase letters matches
/// case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pattern {
    Regex(String),
    Literal(String),
}

impl Pattern {
    pub fn regex(pattern: impl Into<String>) -> Self {
        Pattern::Regex(pattern.into())
    }

    pub fn literal(pattern: impl Into<String>) -> Self {
        Pattern::Literal(pattern.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Pattern::Regex(p) | Pattern::Literal(p) => p,
        }
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, Pattern::Regex(_))
    }

    /// Returns true if `name` (a bare file name) matches this pattern.
    pub fn matches_name(&self, name: &str) -> bool {
        self.matcher().map(|m| m.is_match(name)).unwrap_or(false)
    }

    /// Compiles the pattern. Returns `None` for an invalid regex.
    pub(crate) fn matcher(&self) -> Option<NameMatcher> {
        let insensitive = !self.as_str().chars().any(char::is_uppercase);
        match self {
            Pattern::Regex(p) => match RegexBuilder::new(p).case_insensitive(insensitive).build() {
                Ok(re) => Some(NameMatcher::Regex(re)),
                Err(e) => {
                    warn!("Invalid search pattern {:?}: {}", p, e);
                    None
                }
            },
            Pattern::Literal(p) => Some(NameMatcher::Literal {
                needle: if insensitive { p.to_lowercase() } else { p.clone() },
                insensitive,
            }),
        }
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pattern::Regex(p) => write!(f, "/{}/", p),
            Pattern::Literal(p) => write!(f, "\"{}\"", p),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum NameMatcher {
    Regex(Regex),
    Literal { needle: String, insensitive: bool },
}

impl NameMatcher {
    pub(crate) fn is_match(&self, name: &str) -> bool {
        match self {
            NameMatcher::Regex(re) => re.is_match(name),
            NameMatcher::Literal { needle, insensitive } => {
                if *insensitive {
                    name.to_lowercase().contains(needle.as_str())
                } else {
                    name.contains(needle.as_str())
                }
            }
        }
    }
}

/// Abstraction over OS-specific file search and process listing.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Returns the human-readable name of this provider.
    fn name(&self) -> &'static str;

    /// Finds files whose name matches `pattern`.
    ///
    /// Never fails: any error is logged and yields an empty list.
    async fn search(&self, pattern: &Pattern) -> Vec<PathBuf>;

    /// Snapshot of the executable paths of currently running processes.
    async fn running_executables(&self) -> HashSet<PathBuf> {
        running_executables().await
    }
}

/// Search through the best tool available on this machine.
///
/// The backend is picked once per process (see [`detected_tools`]). Whatever
/// the backend returns, an empty result is retried with the bounded walk,
/// since a stale index doesn't mean nothing is installed.
pub struct SystemSearch {
    tools: Tools,
    roots: Vec<SearchRoot>,
    timeout: Duration,
    walker: WalkSearch,
}

impl SystemSearch {
    /// Creates a provider using the process-wide detected tools.
    pub fn new(roots: Vec<SearchRoot>, timeout: Duration) -> Self {
        Self::with_tools(detected_tools().clone(), roots, timeout)
    }

    /// Creates a provider with explicit tools.
    pub fn with_tools(tools: Tools, roots: Vec<SearchRoot>, timeout: Duration) -> Self {
        Self {
            tools,
            walker: WalkSearch::new(roots.clone()),
            roots,
            timeout,
        }
    }

    /// Lets `flag` interrupt the directory walk, including the fallback walk.
    pub fn with_cancel_flag(self, flag: Arc<AtomicBool>) -> Self {
        Self {
            walker: self.walker.with_cancel_flag(flag),
            ..self
        }
    }

    async fn locate(&self, pattern: &Pattern) -> Option<Vec<PathBuf>> {
        let program = self.tools.locate.as_ref()?;
        let args = command::locate_args(pattern, LOCATE_LIMIT);
        match command::run_tool(program, &args, self.timeout).await {
            Ok(stdout) => {
                let mut paths = command::parse_paths(&stdout);
                paths.truncate(LOCATE_LIMIT);
                Some(paths)
            }
            Err(e) => {
                debug!("locate {} failed: {}", pattern, e);
                None
            }
        }
    }

    async fn primary(&self, pattern: &Pattern) -> Result<Vec<PathBuf>, SearchError> {
        match &self.tools.backend {
            Backend::Everything { program } => {
                let args = command::everything_args(pattern);
                let stdout = command::run_tool(program, &args, self.timeout).await?;
                Ok(command::parse_paths(&stdout))
            }
            Backend::Fd { program } => {
                let runs = self.roots.iter().map(|root| {
                    let args = command::fd_args(pattern, root);
                    async move { command::run_tool(program, &args, self.timeout).await }
                });
                let mut paths = Vec::new();
                let mut first_error = None;
                for result in futures::future::join_all(runs).await {
                    match result {
                        Ok(stdout) => paths.extend(command::parse_paths(&stdout)),
                        Err(e) => {
                            debug!("fd {} failed: {}", pattern, e);
                            first_error.get_or_insert(e);
                        }
                    }
                }
                match first_error {
                    Some(e) if paths.is_empty() => Err(e),
                    _ => Ok(paths),
                }
            }
            Backend::Walk => Ok(self.walker.search(pattern).await),
        }
    }
}

#[async_trait]
impl SearchProvider for SystemSearch {
    fn name(&self) -> &'static str {
        self.tools.backend.name()
    }

    async fn search(&self, pattern: &Pattern) -> Vec<PathBuf> {
        if !pattern.is_regex() {
            if let Some(paths) = self.locate(pattern).await {
                if !paths.is_empty() {
                    return paths;
                }
            }
        }

        if self.tools.backend == Backend::Walk {
            return self.walker.search(pattern).await;
        }

        match self.primary(pattern).await {
            Ok(paths) if !paths.is_empty() => return paths,
            Ok(_) => debug!(
                "{} returned nothing for {}, falling back to directory walk",
                self.tools.backend.name(),
                pattern
            ),
            Err(e) => debug!(
                "{} failed for {} ({}), falling back to directory walk",
                self.tools.backend.name(),
                pattern,
                e
            ),
        }

        self.walker.search(pattern).await
    }
}
