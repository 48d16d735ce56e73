//! Typed bindings over BeOS/Haiku-style storage primitives.
//!
//! This crate exposes three native storage facilities behind a typed,
//! synchronous interface:
//! - Well-known directory resolution (`find_directory`)
//! - Extended-attribute read/write/removal (`read_attrs`, `write_attr`,
//!   `remove_attr`)
//! - Filesystem queries, one-shot and live (`query`)
//!
//! A shared enum-marshaling convention ties native integer constants to
//! symbolic names: the `directory_which`, `types` and `attr` tables are
//! each defined once, alongside the code that uses them, and exposed as
//! process-wide immutable [`EnumTable`]s.

pub mod attrs;
pub mod directory;
pub mod enums;
pub mod error;
pub mod query;
pub mod types;
pub mod volume;

// Re-export main types and calls
pub use attrs::{read_attr, read_attrs, remove_attr, write_attr, write_attr_value, AttrFlags, ATTR};
pub use directory::{find_directory, find_directory_code, DirectoryWhich, DIRECTORY_WHICH};
pub use enums::EnumTable;
pub use error::{Result, StorageError};
pub use query::{query, LiveQuery, QueryEvent, QueryFlags, QueryResults, QueryStream};
pub use types::{AttrValue, TYPES};
pub use volume::Volume;
