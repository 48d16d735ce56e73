//! Filesystem queries.
//!
//! A query compiles a predicate expression against a volume and
//! produces either a finite one-shot stream of matching paths or a
//! live stream of added/removed notifications. The expression is
//! compiled up front, so a malformed query fails before any stream
//! exists.

mod evaluate;
mod expression;
mod live;
mod parser;
mod stream;
mod text_match;
mod walk;

use bitflags::bitflags;

use crate::error::{Result, StorageError};
use crate::volume::Volume;

pub use evaluate::Matcher;
pub use expression::{Comparison, ComparisonOp, ComparisonValue, QueryExpression};
pub use live::{LiveQuery, QueryEvent};
pub use parser::QueryParser;
pub use stream::QueryResults;
pub use text_match::wildcard_match;

bitflags! {
    /// Query behavior flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct QueryFlags: u32 {
        /// Keep the query open and report changes as they happen.
        const LIVE = 0x0000_0001;
    }
}

impl QueryFlags {
    /// Marshals a native flag bitmask, rejecting unknown bits.
    pub fn from_native(bits: u32) -> Result<Self> {
        Self::from_bits(bits).ok_or_else(|| {
            StorageError::InvalidArgument(format!("unknown query flag bits 0x{bits:08x}"))
        })
    }
}

/// A running query: either a finite one-shot stream or a live stream.
#[derive(Debug)]
pub enum QueryStream {
    OneShot(QueryResults),
    Live(LiveQuery),
}

/// Compiles and runs a query expression against a volume.
///
/// One-shot by default; `QueryFlags::LIVE` keeps the query open. The
/// returned stream owns the underlying traversal or watch handle
/// exclusively and releases it when dropped.
pub fn query(volume: &Volume, expression: &str, flags: QueryFlags) -> Result<QueryStream> {
    if !volume.is_queryable() {
        return Err(StorageError::VolumeNotQueryable(volume.root().to_path_buf()));
    }

    let parsed = QueryParser::parse(expression)?;
    let matcher = Matcher::new(parsed);

    log::debug!(
        "query on {}: {expression:?} (live: {})",
        volume.root().display(),
        flags.contains(QueryFlags::LIVE)
    );

    if flags.contains(QueryFlags::LIVE) {
        Ok(QueryStream::Live(LiveQuery::open(volume, matcher)?))
    } else {
        Ok(QueryStream::OneShot(QueryResults::open(volume, matcher)))
    }
}
