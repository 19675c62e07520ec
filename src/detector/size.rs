//! On-disk size accounting with identity dedup.

use std::collections::{HashSet, VecDeque};
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default recursion cap for [`accumulate`].
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Stable identity of an on-disk object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileIdentity {
    /// Inode + device.
    Inode { device: u64, inode: u64 },
    /// Canonical path, where the platform exposes no stable inode.
    Path(PathBuf),
}

impl FileIdentity {
    #[cfg(unix)]
    fn of(_path: &Path, metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(FileIdentity::Inode {
            device: metadata.dev(),
            inode: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    fn of(path: &Path, _metadata: &Metadata) -> Option<Self> {
        fs::canonicalize(path).ok().map(FileIdentity::Path)
    }
}

/// Measures the size of `path`, counting every on-disk object once.
///
/// A file contributes its length; a directory its own entry size plus its
/// children. Symlinks are followed, and an object already counted in this
/// call (a hardlink, or a symlink back up the tree) is skipped. Entries
/// deeper than `max_depth` below `path` contribute nothing, and so does any
/// entry that can't be read.
///
/// The traversal is breadth-first over an explicit worklist, so every object
/// is first met at its shallowest depth and deep trees don't grow the call
/// stack. A symlink chain reaching a directory from far below can't shadow
/// the directory's own subtree.
pub fn accumulate(path: &Path, max_depth: usize) -> u64 {
    let mut visited: HashSet<FileIdentity> = HashSet::new();
    let mut worklist: VecDeque<(PathBuf, usize)> = VecDeque::from([(path.to_path_buf(), 0)]);
    let mut total: u64 = 0;

    while let Some((current, depth)) = worklist.pop_front() {
        if depth > max_depth {
            continue;
        }

        let metadata = match fs::metadata(&current) {
            Ok(m) => m,
            Err(e) => {
                debug!("Size: skipping {}: {}", current.display(), e);
                continue;
            }
        };

        let identity = match FileIdentity::of(&current, &metadata) {
            Some(id) => id,
            None => continue,
        };
        if !visited.insert(identity) {
            continue;
        }

        total += metadata.len();

        if metadata.is_dir() {
            match fs::read_dir(&current) {
                Ok(entries) => {
                    for entry in entries.flatten() {
                        worklist.push_back((entry.path(), depth + 1));
                    }
                }
                Err(e) => debug!("Size: can't list {}: {}", current.display(), e),
            }
        }
    }

    total
}
