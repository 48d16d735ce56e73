//! Immutable symbolic-name → integer-code tables.
//!
//! The native layer identifies directories, attribute types and flag
//! bits by integer constants. Each constant set is exposed once through
//! an `EnumTable` so callers and the engine share a single definition.
//!
//! Tables are built at first use, validated for duplicate names, and
//! then read-only for the process lifetime; they are safe to share
//! across threads without synchronization.

use fnv::FnvHashMap;

use crate::error::{Result, StorageError};

/// An immutable lookup table from symbolic names to native codes.
pub struct EnumTable {
    name: &'static str,
    entries: Vec<(&'static str, i32)>,
    index: FnvHashMap<&'static str, i32>,
}

impl std::fmt::Debug for EnumTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnumTable")
            .field("name", &self.name)
            .field("len", &self.entries.len())
            .finish()
    }
}

impl EnumTable {
    /// Builds a table from native (name, code) pairs.
    ///
    /// Native constant tables are trusted, but the constructor still
    /// validates uniqueness; a repeated name fails with `DuplicateKey`.
    pub fn build(
        name: &'static str,
        pairs: impl IntoIterator<Item = (&'static str, i32)>,
    ) -> Result<Self> {
        let entries: Vec<(&'static str, i32)> = pairs.into_iter().collect();
        let mut index = FnvHashMap::with_capacity_and_hasher(entries.len(), Default::default());
        for &(key, code) in &entries {
            if index.insert(key, code).is_some() {
                return Err(StorageError::DuplicateKey {
                    table: name,
                    name: key.to_string(),
                });
            }
        }
        Ok(Self {
            name,
            entries,
            index,
        })
    }

    /// The table's own name (`directory_which`, `types`, `attr`).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Looks up a symbolic name, failing with `UnknownName` if absent.
    pub fn lookup(&self, key: &str) -> Result<i32> {
        self.try_lookup(key).ok_or_else(|| StorageError::UnknownName {
            table: self.name,
            name: key.to_string(),
        })
    }

    /// Looks up a symbolic name without an error path.
    pub fn try_lookup(&self, key: &str) -> Option<i32> {
        self.index.get(key).copied()
    }

    /// Whether any name maps to `code`.
    pub fn contains_code(&self, code: i32) -> bool {
        self.entries.iter().any(|&(_, c)| c == code)
    }

    /// Full enumeration of (name, code) pairs, in definition order.
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, i32)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
