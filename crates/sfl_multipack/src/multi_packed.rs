//! The multi-packed aggregate segment.

use crate::scan::{DatFileScan, LooseSc4FileScan, ScanStrategy};
use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use sfl_dbpf::PackedFile;
use sfl_resource::{
    DbRecord, DbSegment, KeyFilter, KeyList, RecordAccess, ResourceKey, SegmentError,
    SegmentResult,
};
use std::collections::HashMap;
use std::ops::Deref;

/// The order in which an aggregate visits its children when enumerating
/// keys or consolidating records.
///
/// Fixed at construction. The global resource manager's file list wants
/// reverse (last-registered-wins visibility); the plugin-pack multi-file
/// wants discovery order. The flag never affects key *resolution* — the
/// index is always last-declared-wins regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumerationOrder {
    /// Children are visited first-discovered first.
    Discovery,
    /// Children are visited last-discovered first.
    ReverseDiscovery,
}

#[derive(Default)]
struct State {
    folder_path: Utf8PathBuf,
    segment_id: u32,
    initialized: bool,
    is_open: bool,
    /// Children in discovery order. Positions are stable until `close`.
    segments: Vec<Box<dyn DbSegment>>,
    /// Key → position in `segments` of the child that owns it. When several
    /// children declare the same key, the position of the *later* one wins.
    tgi_index: HashMap<ResourceKey, usize>,
}

/// A borrowed handle to one child segment.
///
/// Holds the aggregate's read lock for as long as it lives, which is what
/// makes the borrow safe: `close` needs the write lock, so a child can never
/// be released while a `SegmentRef` to it exists. Use it for the duration of
/// a call and drop it; holding one across a mutating call on the same
/// aggregate deadlocks.
pub struct SegmentRef<'a> {
    guard: MappedRwLockReadGuard<'a, dyn DbSegment>,
}

impl Deref for SegmentRef<'_> {
    type Target = dyn DbSegment;

    fn deref(&self) -> &Self::Target {
        &*self.guard
    }
}

/// Many packed containers under one root, exposed as a single read-only
/// segment.
///
/// `open` discovers candidate files through the injected [`ScanStrategy`],
/// opens each as a [`PackedFile`], and merges its keys into the index.
/// Files that fail to open are logged and skipped; the aggregate is open
/// iff at least one child opened. Record operations resolve the owning
/// child through the index in O(1) and delegate verbatim.
///
/// The aggregate is a valid [`DbSegment`] itself, so the host registry
/// stores it exactly like a single packed file.
pub struct MultiPackedFile {
    enumeration_order: EnumerationOrder,
    strategy: Box<dyn ScanStrategy>,
    state: RwLock<State>,
}

impl MultiPackedFile {
    pub fn new(enumeration_order: EnumerationOrder, strategy: Box<dyn ScanStrategy>) -> Self {
        Self {
            enumeration_order,
            strategy,
            state: RwLock::new(State::default()),
        }
    }

    /// Aggregate over every `*.DAT` file under the root, recursively.
    /// Enumerates in discovery order.
    pub fn for_dat_files() -> Self {
        Self::new(
            EnumerationOrder::Discovery,
            Box::new(DatFileScan {
                top_directory_only: false,
            }),
        )
    }

    /// Aggregate over the loose `.SC4*` plugin family under the root,
    /// recursively. Enumerates in reverse discovery order.
    pub fn for_loose_sc4_files() -> Self {
        Self::new(EnumerationOrder::ReverseDiscovery, Box::new(LooseSc4FileScan))
    }

    pub fn enumeration_order(&self) -> EnumerationOrder {
        self.enumeration_order
    }

    /// Opens the aggregate over an explicit, already-discovered file list
    /// instead of running the scan strategy. List order is discovery order.
    ///
    /// Used when one directory walk feeds several aggregates.
    pub fn open_with_files(&self, files: &[Utf8PathBuf]) -> SegmentResult<()> {
        let mut state = self.state.write();

        if state.is_open {
            return Ok(());
        }

        Self::setup_segments(&mut state, files)
    }

    /// Resolves the child segment that owns `key`.
    ///
    /// The returned handle borrows the aggregate; see [`SegmentRef`].
    pub fn find_db_segment(&self, key: ResourceKey) -> Option<SegmentRef<'_>> {
        let state = self.state.read();

        if !state.is_open {
            return None;
        }

        let index = *state.tgi_index.get(&key)?;
        Some(SegmentRef {
            guard: RwLockReadGuard::map(state, |s| s.segments[index].as_ref()),
        })
    }

    pub fn segment_count(&self) -> usize {
        self.state.read().segments.len()
    }

    /// Child at `index` in discovery order.
    ///
    /// Callers must check [`segment_count`](Self::segment_count) first; an
    /// out-of-range index panics.
    pub fn segment_by_index(&self, index: usize) -> SegmentRef<'_> {
        SegmentRef {
            guard: RwLockReadGuard::map(self.state.read(), |s| s.segments[index].as_ref()),
        }
    }

    /// Index maintenance hook for children that register resources after
    /// `open`: points `key` at the child at `segment_index`, overwriting any
    /// previous owner. Out-of-range indices are ignored.
    pub fn added_resource(&self, key: ResourceKey, segment_index: usize) {
        let mut state = self.state.write();
        if segment_index < state.segments.len() {
            state.tgi_index.insert(key, segment_index);
        }
    }

    /// Removes `key` from the index.
    pub fn removed_resource(&self, key: ResourceKey) {
        self.state.write().tgi_index.remove(&key);
    }

    /// Copies every record passing `filter` from every child into `target`,
    /// visiting children in enumeration order. Returns the total copied.
    pub fn consolidate_database_records(
        &self,
        target: &dyn DbSegment,
        filter: Option<&dyn KeyFilter>,
    ) -> i32 {
        let state = self.state.read();
        let mut total = 0;

        match self.enumeration_order {
            EnumerationOrder::ReverseDiscovery => {
                for segment in state.segments.iter().rev() {
                    total += segment.copy_database_records(target, filter);
                }
            }
            EnumerationOrder::Discovery => {
                for segment in &state.segments {
                    total += segment.copy_database_records(target, filter);
                }
            }
        }

        total
    }

    /// Consolidates into a packed file at `target_path`, creating it if
    /// necessary. Returns the total copied, or -1 when the destination
    /// cannot be opened or created.
    pub fn consolidate_database_records_to_path(
        &self,
        target_path: &Utf8Path,
        filter: Option<&dyn KeyFilter>,
    ) -> i32 {
        let target = PackedFile::new();
        let mut result = -1;

        if target.init() {
            target.set_path(target_path);

            if target.open(true, true).is_ok() {
                result = self.consolidate_database_records(&target, filter);

                if let Err(error) = target.close() {
                    tracing::error!("failed to close consolidation target {target_path}: {error}");
                    result = -1;
                }
            }

            target.shutdown();
        }

        result
    }

    fn setup_segments(state: &mut State, files: &[Utf8PathBuf]) -> SegmentResult<()> {
        if files.is_empty() {
            return Err(SegmentError::NoUsableFiles(state.folder_path.clone()));
        }

        state.segments.reserve(files.len());
        let mut keys = KeyList::new();

        for path in files {
            if let Err(error) = Self::setup_segment(state, path, &mut keys) {
                tracing::error!("Failed to load: {path} ({error})");
            }
        }

        state.is_open = !state.segments.is_empty();

        if state.is_open {
            Ok(())
        } else {
            Err(SegmentError::NoUsableFiles(state.folder_path.clone()))
        }
    }

    /// Opens one candidate file, appends it to the child list, and merges
    /// its keys into the index. Later children overwrite earlier ones on
    /// key collision.
    fn setup_segment(
        state: &mut State,
        path: &Utf8Path,
        keys: &mut KeyList,
    ) -> SegmentResult<()> {
        let segment = PackedFile::new();
        segment.init();
        segment.set_path(path);
        segment.open(true, false)?;

        keys.erase_all();
        segment.resource_key_list(keys, None);

        let index = state.segments.len();
        state.segments.push(Box::new(segment));

        for key in keys.keys() {
            state.tgi_index.insert(key, index);
        }

        Ok(())
    }
}

impl DbSegment for MultiPackedFile {
    fn init(&self) -> bool {
        self.state.write().initialized = true;
        true
    }

    fn shutdown(&self) -> bool {
        self.state.write().initialized = false;
        true
    }

    /// Read-only by design: anything but `(read=true, write=false)` fails
    /// without touching the filesystem.
    fn open(&self, read: bool, write: bool) -> SegmentResult<()> {
        if !read || write {
            return Err(SegmentError::InvalidAccess { read, write });
        }

        let mut state = self.state.write();

        if state.is_open {
            return Ok(());
        }

        if state.folder_path.as_str().is_empty() {
            return Err(SegmentError::EmptyPath);
        }

        let files = match self.strategy.discover(&state.folder_path) {
            Ok(files) => files,
            Err(error) => {
                tracing::error!("scan of {} failed: {error}", state.folder_path);
                return Err(error.into());
            }
        };

        Self::setup_segments(&mut state, &files)
    }

    fn is_open(&self) -> bool {
        self.state.read().is_open
    }

    /// Releases every child (close + shutdown) and clears both the child
    /// list and the index. Idempotent.
    fn close(&self) -> SegmentResult<()> {
        let mut state = self.state.write();

        if state.is_open {
            state.is_open = false;

            for segment in &state.segments {
                if let Err(error) = segment.close() {
                    tracing::warn!("failed to close {}: {error}", segment.path());
                }
                segment.shutdown();
            }

            state.segments.clear();
            state.tgi_index.clear();
        }

        Ok(())
    }

    fn flush(&self) -> SegmentResult<()> {
        // Always read only; nothing to persist.
        Ok(())
    }

    fn path(&self) -> Utf8PathBuf {
        self.state.read().folder_path.clone()
    }

    fn set_path(&self, path: &Utf8Path) {
        self.state.write().folder_path = path.to_path_buf();
    }

    fn segment_id(&self) -> u32 {
        self.state.read().segment_id
    }

    fn set_segment_id(&self, segment_id: u32) {
        self.state.write().segment_id = segment_id;
    }

    fn record_count(&self, filter: Option<&dyn KeyFilter>) -> u32 {
        let state = self.state.read();

        if !state.is_open {
            return 0;
        }

        match filter {
            Some(filter) => state
                .tgi_index
                .keys()
                .filter(|key| filter.is_key_included(**key))
                .count() as u32,
            None => state.tgi_index.len() as u32,
        }
    }

    /// Delegates to every child's own enumeration, visiting children in
    /// enumeration order. A key declared by several children is contributed
    /// once per child.
    fn resource_key_list(&self, list: &mut KeyList, filter: Option<&dyn KeyFilter>) -> u32 {
        let state = self.state.read();

        if !state.is_open {
            return 0;
        }

        let mut total = 0;

        match self.enumeration_order {
            EnumerationOrder::ReverseDiscovery => {
                for segment in state.segments.iter().rev() {
                    total += segment.resource_key_list(list, filter);
                }
            }
            EnumerationOrder::Discovery => {
                for segment in &state.segments {
                    total += segment.resource_key_list(list, filter);
                }
            }
        }

        total
    }

    fn test_for_record(&self, key: ResourceKey) -> bool {
        let state = self.state.read();
        state.is_open
            && state
                .tgi_index
                .get(&key)
                .is_some_and(|&index| state.segments[index].test_for_record(key))
    }

    fn record_size(&self, key: ResourceKey) -> u32 {
        let state = self.state.read();

        if !state.is_open {
            return 0;
        }

        match state.tgi_index.get(&key) {
            Some(&index) => state.segments[index].record_size(key),
            None => 0,
        }
    }

    fn open_record(&self, key: ResourceKey, access: RecordAccess) -> SegmentResult<DbRecord> {
        let state = self.state.read();

        if !state.is_open {
            return Err(SegmentError::NotOpen);
        }

        let &index = state
            .tgi_index
            .get(&key)
            .ok_or(SegmentError::RecordNotFound(key))?;
        state.segments[index].open_record(key, access)
    }

    fn create_new_record(&self, _key: ResourceKey) -> SegmentResult<DbRecord> {
        Err(SegmentError::ReadOnly)
    }

    fn close_record(&self, record: DbRecord) -> SegmentResult<()> {
        let state = self.state.read();

        if !state.is_open {
            return Err(SegmentError::NotOpen);
        }

        let key = record.key();
        let &index = state
            .tgi_index
            .get(&key)
            .ok_or(SegmentError::RecordNotFound(key))?;
        state.segments[index].close_record(record)
    }

    fn abort_record(&self, record: DbRecord) -> SegmentResult<()> {
        let state = self.state.read();

        if !state.is_open {
            return Err(SegmentError::NotOpen);
        }

        let key = record.key();
        let &index = state
            .tgi_index
            .get(&key)
            .ok_or(SegmentError::RecordNotFound(key))?;
        state.segments[index].abort_record(record)
    }

    fn delete_record(&self, _key: ResourceKey) -> SegmentResult<()> {
        Err(SegmentError::ReadOnly)
    }

    fn read_record(&self, key: ResourceKey, buffer: &mut Vec<u8>) -> SegmentResult<u32> {
        let state = self.state.read();

        if !state.is_open {
            return Err(SegmentError::NotOpen);
        }

        let &index = state
            .tgi_index
            .get(&key)
            .ok_or(SegmentError::RecordNotFound(key))?;
        state.segments[index].read_record(key, buffer)
    }

    fn write_record(&self, _key: ResourceKey, _data: &[u8]) -> SegmentResult<()> {
        Err(SegmentError::ReadOnly)
    }
}
