//! DBPF packed-file segment for SC4 FastLoad.
//!
//! A DBPF container is the packed format SimCity 4 uses for `.DAT` files
//! and the loose `.SC4*` plugin family: a fixed 96-byte header followed by
//! raw record payloads and an index table of (type, group, instance) →
//! (offset, size) entries.
//!
//! [`PackedFile`] implements the [`DbSegment`](sfl_resource::DbSegment)
//! contract over one such file. Reading parses the header and index and
//! serves record payloads straight off the file handle; the minimal writer
//! exists for consolidation targets and test fixtures and rewrites the whole
//! container on flush. Record payloads are opaque — QFS compression is never
//! applied or interpreted here.

pub mod format;
pub mod packed_file;

pub use format::{Header, IndexEntry};
pub use packed_file::PackedFile;
