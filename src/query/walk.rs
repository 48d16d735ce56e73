//! Lazy depth-first traversal of a volume.

use std::fs;
use std::path::{Path, PathBuf};

/// A lazy walk over every entry under a root directory.
///
/// Entries are yielded parent-first, children sorted by name for a
/// deterministic order within each directory. Symlinks are yielded but
/// never followed, so the walk visits each path exactly once and always
/// terminates. Unreadable directories are logged and skipped.
#[derive(Debug)]
pub struct VolumeWalk {
    stack: Vec<std::vec::IntoIter<PathBuf>>,
}

impl VolumeWalk {
    pub fn new(root: &Path) -> Self {
        Self {
            stack: vec![read_sorted(root).into_iter()],
        }
    }

    /// Drops all remaining traversal state; the iterator is exhausted.
    pub fn stop(&mut self) {
        self.stack.clear();
    }
}

impl Iterator for VolumeWalk {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            let frame = self.stack.last_mut()?;
            let Some(path) = frame.next() else {
                self.stack.pop();
                continue;
            };
            let is_real_dir = path
                .symlink_metadata()
                .map(|metadata| metadata.is_dir())
                .unwrap_or(false);
            if is_real_dir {
                self.stack.push(read_sorted(&path).into_iter());
            }
            return Some(path);
        }
    }
}

fn read_sorted(dir: &Path) -> Vec<PathBuf> {
    match fs::read_dir(dir) {
        Ok(entries) => {
            let mut children: Vec<PathBuf> =
                entries.filter_map(|entry| entry.ok()).map(|entry| entry.path()).collect();
            children.sort();
            children
        }
        Err(error) => {
            log::warn!("skipping unreadable directory {}: {error}", dir.display());
            Vec::new()
        }
    }
}
