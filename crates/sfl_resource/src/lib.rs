//! Resource keys, key lists, and the database segment contract.
//!
//! This crate defines the vocabulary shared by every segment implementation
//! in the workspace:
//!
//! - [`ResourceKey`] — the (type, group, instance) triple that identifies a
//!   resource record
//! - [`KeyList`] — an ordered, appendable collection of keys
//! - [`KeyFilter`] — a predicate used to narrow key enumeration and counting
//! - [`DbRecord`] — an owned handle to one record's payload
//! - [`DbSegment`] — the capability trait satisfied by every container of
//!   resource records, whether a single packed file or an aggregate of many
//!
//! Segments guard their own state internally, so every [`DbSegment`] method
//! takes `&self` and segments can be shared across threads freely.

pub mod error;
pub mod filter;
pub mod key;
pub mod key_list;
pub mod record;
pub mod segment;

pub use error::{SegmentError, SegmentResult};
pub use filter::{KeyFilter, TypeIdFilter};
pub use key::ResourceKey;
pub use key_list::KeyList;
pub use record::{DbRecord, RecordAccess};
pub use segment::DbSegment;
