use super::{NameMatcher, Pattern, SearchProvider};
use crate::platform::SearchRoot;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;
use walkdir::WalkDir;

/// Bounded-depth directory walk over a fixed set of roots.
///
/// Symlinks are not followed. Each root is walked on the blocking pool and
/// the roots run concurrently; result order across roots is not significant.
pub struct WalkSearch {
    roots: Vec<SearchRoot>,
    cancel: Arc<AtomicBool>,
}

impl WalkSearch {
    pub fn new(roots: Vec<SearchRoot>) -> Self {
        Self {
            roots,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stops walking as soon as `flag` is set, returning what was found so far.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }
}

#[async_trait]
impl SearchProvider for WalkSearch {
    fn name(&self) -> &'static str {
        "walk"
    }

    async fn search(&self, pattern: &Pattern) -> Vec<PathBuf> {
        let matcher = match pattern.matcher() {
            Some(m) => m,
            None => return Vec::new(),
        };

        let walks = self.roots.iter().cloned().map(|root| {
            let matcher = matcher.clone();
            let cancel = self.cancel.clone();
            tokio::task::spawn_blocking(move || walk_root(&root, &matcher, &cancel))
        });

        futures::future::join_all(walks)
            .await
            .into_iter()
            .filter_map(|joined| match joined {
                Ok(paths) => Some(paths),
                Err(e) => {
                    debug!("Directory walk task failed: {}", e);
                    None
                }
            })
            .flatten()
            .collect()
    }
}

fn walk_root(root: &SearchRoot, matcher: &NameMatcher, cancel: &AtomicBool) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(&root.path).follow_links(false);
    if let Some(depth) = root.max_depth {
        walker = walker.max_depth(depth);
    }

    walker
        .into_iter()
        .take_while(|_| !cancel.load(Ordering::Relaxed))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| matcher.is_match(&entry.file_name().to_string_lossy()))
        .map(|entry| entry.into_path())
        .collect()
}
