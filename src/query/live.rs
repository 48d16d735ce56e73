//! Live query streams.
//!
//! A live query keeps its OS watch handle open and turns filesystem
//! changes into entry-added / entry-removed notifications against the
//! compiled expression. Watcher callbacks send changed paths through a
//! channel; the consuming caller is the sole reader and applies them to
//! its owned matched-set, so no state is shared under a lock.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use fnv::FnvHashSet;
use notify::{recommended_watcher, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::{Result, StorageError};
use crate::volume::Volume;

use super::evaluate::Matcher;
use super::walk::VolumeWalk;

/// A change notification from a live query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryEvent {
    /// An entry now satisfies the query.
    EntryAdded(PathBuf),
    /// A previously reported entry no longer satisfies it.
    EntryRemoved(PathBuf),
}

/// The event stream of a live query.
///
/// The matches present when the query opened arrive first, as
/// `EntryAdded` events; afterwards the stream reports filesystem
/// changes as they happen. The stream is logically infinite and
/// exclusively owned by its opener; dropping it (or calling
/// [`close`](Self::close)) releases the watch handle on any exit path.
pub struct LiveQuery {
    root: PathBuf,
    matcher: Matcher,
    matched: FnvHashSet<PathBuf>,
    pending: VecDeque<QueryEvent>,
    changes: Receiver<Vec<PathBuf>>,
    // Held only to keep the OS watch alive; dropped on close.
    watcher: Option<RecommendedWatcher>,
}

impl std::fmt::Debug for LiveQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveQuery")
            .field("root", &self.root)
            .field("matched", &self.matched.len())
            .field("pending", &self.pending.len())
            .field("open", &self.watcher.is_some())
            .finish()
    }
}

impl LiveQuery {
    pub(crate) fn open(volume: &Volume, matcher: Matcher) -> Result<Self> {
        let root = volume.root().to_path_buf();

        let (change_tx, changes) = crossbeam_channel::unbounded();
        let watcher = create_watcher(&root, change_tx)?;

        // Snapshot the current matches before events start mattering;
        // anything the watcher reports while we walk is re-checked
        // against the matched-set, so duplicates cannot slip through.
        let mut matched = FnvHashSet::default();
        let mut pending = VecDeque::new();
        for path in VolumeWalk::new(&root) {
            if matcher.matches(&path) {
                matched.insert(path.clone());
                pending.push_back(QueryEvent::EntryAdded(path));
            }
        }

        log::debug!(
            "live query {} on {} opened with {} initial matches",
            matcher.expression(),
            root.display(),
            matched.len()
        );

        Ok(Self {
            root,
            matcher,
            matched,
            pending,
            changes,
            watcher: Some(watcher),
        })
    }

    /// Blocks until the next event, or `None` once the stream is closed.
    pub fn next_event(&mut self) -> Option<QueryEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if self.watcher.is_none() {
                return None;
            }
            match self.changes.recv() {
                Ok(paths) => self.apply_changes(paths),
                Err(_) => return None,
            }
        }
    }

    /// Like [`next_event`](Self::next_event) with a bounded wait;
    /// `None` means no event arrived within `timeout`.
    pub fn next_event_timeout(&mut self, timeout: Duration) -> Option<QueryEvent> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if self.watcher.is_none() {
                return None;
            }
            let remaining = deadline.checked_duration_since(std::time::Instant::now())?;
            match self.changes.recv_timeout(remaining) {
                Ok(paths) => self.apply_changes(paths),
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    /// Stops watching and drains nothing further.
    ///
    /// Events already decoded remain deliverable via `next_event`;
    /// after those the stream reports `None`.
    pub fn close(&mut self) {
        self.watcher = None;
    }

    /// Re-evaluates changed paths against the expression and the
    /// matched-set, queueing added/removed events as needed.
    fn apply_changes(&mut self, paths: Vec<PathBuf>) {
        for path in paths {
            if !path.starts_with(&self.root) {
                continue;
            }
            let exists = path.exists();
            if exists && self.matcher.matches(&path) {
                if self.matched.insert(path.clone()) {
                    self.pending.push_back(QueryEvent::EntryAdded(path));
                }
                continue;
            }
            if self.matched.remove(&path) {
                self.pending.push_back(QueryEvent::EntryRemoved(path.clone()));
            }

            // A removed directory takes its matched descendants with it,
            // even when the kernel only reported the directory itself.
            if !exists {
                let gone: Vec<PathBuf> = self
                    .matched
                    .iter()
                    .filter(|candidate| candidate.starts_with(&path))
                    .cloned()
                    .collect();
                for candidate in gone {
                    self.matched.remove(&candidate);
                    self.pending.push_back(QueryEvent::EntryRemoved(candidate));
                }
            }
        }
    }
}

/// Starts a recursive watch on the volume root, forwarding changed
/// paths through `change_tx`. Watcher errors are logged; the consumer
/// observes a silent stream rather than a poisoned one.
fn create_watcher(root: &Path, change_tx: Sender<Vec<PathBuf>>) -> Result<RecommendedWatcher> {
    let mut watcher =
        recommended_watcher(move |event_result: notify::Result<Event>| match event_result {
            Ok(event) => {
                if !event.paths.is_empty() {
                    let _ = change_tx.send(event.paths);
                }
            }
            Err(error) => {
                log::warn!("live query watcher error: {error}");
            }
        })
        .map_err(|error| {
            StorageError::Unsupported(format!(
                "failed to create filesystem watcher for {}: {error}",
                root.display()
            ))
        })?;

    watcher
        .watch(root, RecursiveMode::Recursive)
        .map_err(|error| {
            StorageError::Unsupported(format!("failed to watch {}: {error}", root.display()))
        })?;

    Ok(watcher)
}
