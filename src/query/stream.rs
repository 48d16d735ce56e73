//! One-shot query result streams.

use std::path::PathBuf;

use crate::volume::Volume;

use super::evaluate::Matcher;
use super::walk::VolumeWalk;

/// The lazy result stream of a one-shot query.
///
/// Produces each matching path exactly once, in walk order, and then
/// exhausts. The stream owns its traversal state exclusively and is not
/// restartable; a new query is required to iterate again. Dropping the
/// stream, or calling [`close`](Self::close), releases the remaining
/// traversal state on any exit path.
#[derive(Debug)]
pub struct QueryResults {
    walk: VolumeWalk,
    matcher: Matcher,
}

impl QueryResults {
    pub(crate) fn open(volume: &Volume, matcher: Matcher) -> Self {
        Self {
            walk: VolumeWalk::new(volume.root()),
            matcher,
        }
    }

    /// Stops iteration early and releases the traversal state.
    ///
    /// Subsequent `next()` calls return `None`. Dropping the stream has
    /// the same effect; `close` exists for callers that keep the stream
    /// alive but are done consuming it.
    pub fn close(&mut self) {
        self.walk.stop();
    }
}

impl Iterator for QueryResults {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        self.walk.by_ref().find(|path| self.matcher.matches(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::QueryParser;
    use std::fs;
    use tempfile::tempdir;

    fn results(volume: &Volume, expression: &str) -> QueryResults {
        let matcher = Matcher::new(QueryParser::parse(expression).expect("valid expression"));
        QueryResults::open(volume, matcher)
    }

    #[test]
    fn yields_exactly_the_matches_once_and_exhausts() {
        let dir = tempdir().expect("create temp dir");
        let volume = Volume::open(dir.path()).unwrap();
        let matching = volume.root().join("keep.txt");
        fs::write(&matching, b"yes").unwrap();
        fs::write(volume.root().join("skip.log"), b"no").unwrap();

        let mut stream = results(&volume, "name==\"*.txt\"");
        assert_eq!(stream.next(), Some(matching));
        assert_eq!(stream.next(), None);
        // Exhausted streams stay exhausted.
        assert_eq!(stream.next(), None);
    }

    #[test]
    fn descends_into_subdirectories() {
        let dir = tempdir().expect("create temp dir");
        let volume = Volume::open(dir.path()).unwrap();
        fs::create_dir_all(volume.root().join("a/b")).unwrap();
        fs::write(volume.root().join("a/b/deep.txt"), b"").unwrap();
        fs::write(volume.root().join("top.txt"), b"").unwrap();

        let found: Vec<PathBuf> = results(&volume, "name==\"*.txt\"").collect();
        assert_eq!(
            found,
            vec![
                volume.root().join("a/b/deep.txt"),
                volume.root().join("top.txt"),
            ]
        );
    }

    #[test]
    fn no_matches_terminates_empty() {
        let dir = tempdir().expect("create temp dir");
        let volume = Volume::open(dir.path()).unwrap();
        fs::write(volume.root().join("only.log"), b"").unwrap();

        assert_eq!(results(&volume, "name==\"*.txt\"").count(), 0);
    }

    #[test]
    fn close_stops_early() {
        let dir = tempdir().expect("create temp dir");
        let volume = Volume::open(dir.path()).unwrap();
        for index in 0..10 {
            fs::write(volume.root().join(format!("file{index}.txt")), b"").unwrap();
        }

        let mut stream = results(&volume, "name==\"*.txt\"");
        assert!(stream.next().is_some());
        stream.close();
        assert_eq!(stream.next(), None);
    }
}
