//! The capability trait satisfied by every container of resource records.

use crate::error::SegmentResult;
use crate::filter::KeyFilter;
use crate::key::ResourceKey;
use crate::key_list::KeyList;
use crate::record::{DbRecord, RecordAccess};
use camino::{Utf8Path, Utf8PathBuf};

/// A single logical container of resource records.
///
/// Implemented by the packed-file reader and by the multi-packed aggregate,
/// which makes aggregates composable: an aggregate is itself a valid child
/// of another aggregator, and the host registry stores both uniformly.
///
/// Every method takes `&self`; implementations guard their state with a
/// private lock. Lifecycle: `init` → `set_path` → `open` → record
/// operations → `close` → `shutdown`.
pub trait DbSegment: Send + Sync {
    /// Marks the segment constructed. Idempotent.
    fn init(&self) -> bool;

    /// Reverses `init`. Idempotent.
    fn shutdown(&self) -> bool;

    /// Opens the segment with the requested access. Implementations that are
    /// read-only by design fail unless `(read, write) == (true, false)`.
    fn open(&self, read: bool, write: bool) -> SegmentResult<()>;

    fn is_open(&self) -> bool;

    /// Releases everything the segment holds. Idempotent: closing a closed
    /// segment is a no-op success.
    fn close(&self) -> SegmentResult<()>;

    /// Persists any pending writes. A no-op success on read-only segments.
    fn flush(&self) -> SegmentResult<()>;

    fn path(&self) -> Utf8PathBuf;

    /// Records the target path. Does not validate existence.
    fn set_path(&self, path: &Utf8Path);

    fn segment_id(&self) -> u32;

    fn set_segment_id(&self, segment_id: u32);

    /// Number of records, or of records passing `filter` when one is given.
    fn record_count(&self, filter: Option<&dyn KeyFilter>) -> u32;

    /// Appends this segment's keys (optionally filtered) to `list`,
    /// returning the number of keys contributed.
    fn resource_key_list(&self, list: &mut KeyList, filter: Option<&dyn KeyFilter>) -> u32;

    fn test_for_record(&self, key: ResourceKey) -> bool;

    /// Payload size of the record, or 0 when the key is absent.
    fn record_size(&self, key: ResourceKey) -> u32;

    fn open_record(&self, key: ResourceKey, access: RecordAccess) -> SegmentResult<DbRecord>;

    fn create_new_record(&self, key: ResourceKey) -> SegmentResult<DbRecord>;

    /// Commits a read-write record back to the segment. Closing a read
    /// record is a no-op success.
    fn close_record(&self, record: DbRecord) -> SegmentResult<()>;

    /// Discards a record without committing it.
    fn abort_record(&self, record: DbRecord) -> SegmentResult<()>;

    fn delete_record(&self, key: ResourceKey) -> SegmentResult<()>;

    /// Reads the record payload into `buffer` (replacing its contents) and
    /// returns the number of bytes read.
    fn read_record(&self, key: ResourceKey, buffer: &mut Vec<u8>) -> SegmentResult<u32>;

    fn write_record(&self, key: ResourceKey, data: &[u8]) -> SegmentResult<()>;

    /// Bulk-copies this segment's records (optionally filtered) into
    /// `target`, returning the number copied. Records that fail to read or
    /// write are skipped and not counted.
    fn copy_database_records(
        &self,
        target: &dyn DbSegment,
        filter: Option<&dyn KeyFilter>,
    ) -> i32 {
        let mut keys = KeyList::new();
        self.resource_key_list(&mut keys, filter);

        let mut copied = 0;
        let mut buffer = Vec::new();

        for key in keys.keys() {
            if self.read_record(key, &mut buffer).is_ok()
                && target.write_record(key, &buffer).is_ok()
            {
                copied += 1;
            }
        }

        copied
    }
}
