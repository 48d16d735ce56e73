use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("duplicate name in {table} table: {name}")]
    DuplicateKey { table: &'static str, name: String },

    #[error("unknown name in {table} table: {name}")]
    UnknownName { table: &'static str, name: String },

    #[error("not found: {0}")]
    NotFound(PathBuf),

    #[error("volume not found: {0}")]
    VolumeNotFound(PathBuf),

    #[error("volume is not queryable: {0}")]
    VolumeNotQueryable(PathBuf),

    #[error("permission denied: {path} ({source})")]
    PermissionDenied { path: PathBuf, source: io::Error },

    #[error("storage exhausted: {path} ({source})")]
    ResourceExhausted { path: PathBuf, source: io::Error },

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("type mismatch for {type_name}: expected {expected} bytes, got {actual}")]
    TypeMismatch {
        type_name: String,
        expected: usize,
        actual: usize,
    },

    #[error("query syntax error near byte {position}: {message}")]
    QuerySyntax { message: String, position: usize },

    #[error("failed to create directory {path}: {source}")]
    DirectoryCreation { path: PathBuf, source: io::Error },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    /// Translates an IO failure on `path` into the binding taxonomy,
    /// keeping the underlying error (and its OS code) intact.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                path: path.to_path_buf(),
                source,
            },
            io::ErrorKind::StorageFull => Self::ResourceExhausted {
                path: path.to_path_buf(),
                source,
            },
            io::ErrorKind::Unsupported => Self::Unsupported(format!(
                "{}: {source}",
                path.display()
            )),
            _ => Self::Io(source),
        }
    }

    /// The native OS error code behind this failure, when one exists.
    ///
    /// Surfaced verbatim for diagnostics; the binding never rewrites it.
    pub fn os_code(&self) -> Option<i32> {
        match self {
            Self::PermissionDenied { source, .. }
            | Self::ResourceExhausted { source, .. }
            | Self::DirectoryCreation { source, .. }
            | Self::Io(source) => source.raw_os_error(),
            _ => None,
        }
    }
}
