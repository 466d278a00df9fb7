//! The error type shared by every segment implementation.

use crate::key::ResourceKey;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the workspace.
pub type SegmentResult<T> = std::result::Result<T, SegmentError>;

/// Errors produced by [`DbSegment`](crate::DbSegment) operations.
///
/// Per-file failures during aggregate discovery are absorbed at the call
/// site (logged and skipped); the variants here surface only when a whole
/// operation fails.
#[derive(Error, Debug)]
pub enum SegmentError {
    /// Filesystem I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The segment has not been opened (or was already closed).
    #[error("segment is not open")]
    NotOpen,

    /// A write-shaped operation was attempted on a read-only segment.
    #[error("segment is read only")]
    ReadOnly,

    /// The requested open mode is not supported by this segment type.
    #[error("unsupported access mode (read={read}, write={write})")]
    InvalidAccess { read: bool, write: bool },

    /// `open` was called before a path was set.
    #[error("no path set for segment")]
    EmptyPath,

    /// The key is not present in this segment.
    #[error("record not found: {0}")]
    RecordNotFound(ResourceKey),

    /// The key already names a record; `create_new_record` refuses to clobber.
    #[error("record already exists: {0}")]
    RecordExists(ResourceKey),

    /// The file is not a valid packed container (bad magic, truncated
    /// header or index, unsupported version).
    #[error("not a valid packed container: {0}")]
    InvalidContainer(String),

    /// Aggregate discovery found no file that opened as a valid container.
    #[error("no usable packed files under {0}")]
    NoUsableFiles(Utf8PathBuf),
}
