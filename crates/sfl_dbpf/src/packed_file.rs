//! The packed-file segment.

use crate::format;
use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use sfl_resource::{
    DbRecord, DbSegment, KeyFilter, KeyList, RecordAccess, ResourceKey, SegmentError,
    SegmentResult,
};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom};

/// Where a record's payload currently lives.
#[derive(Debug)]
enum RecordData {
    /// At a fixed location in the container file on disk.
    Disk { offset: u32, size: u32 },
    /// Pending in memory, not yet flushed.
    Memory(Vec<u8>),
}

#[derive(Debug)]
struct OpenState {
    /// Read handle for `Disk` records. `None` once every record is in memory
    /// (freshly created container, or right after a flush).
    file: Option<File>,
    writable: bool,
    /// Keys in index-table order; this is the segment's enumeration order.
    order: Vec<ResourceKey>,
    records: HashMap<ResourceKey, RecordData>,
    dirty: bool,
}

#[derive(Debug, Default)]
struct Inner {
    path: Utf8PathBuf,
    segment_id: u32,
    initialized: bool,
    open: Option<OpenState>,
}

/// One DBPF container file exposed through the [`DbSegment`] contract.
///
/// Opening read-only parses the header and index table and serves payloads
/// straight off the file handle. Opening read-write additionally allows
/// record creation, overwrite, and deletion; a nonexistent path opened for
/// write starts an empty container. All state sits behind one private lock,
/// so a `PackedFile` can be shared across threads.
#[derive(Debug, Default)]
pub struct PackedFile {
    inner: Mutex<Inner>,
}

impl PackedFile {
    pub fn new() -> Self {
        Self::default()
    }

    fn load(path: &Utf8Path, writable: bool) -> SegmentResult<OpenState> {
        let mut file = match File::open(path.as_std_path()) {
            Ok(file) => file,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound && writable => {
                // A consolidation target that does not exist yet.
                return Ok(OpenState {
                    file: None,
                    writable,
                    order: Vec::new(),
                    records: HashMap::new(),
                    dirty: false,
                });
            }
            Err(error) => return Err(error.into()),
        };

        let header = format::read_header(&mut file)?;
        let entries = format::read_index(&mut file, &header)?;

        let mut order = Vec::with_capacity(entries.len());
        let mut records = HashMap::with_capacity(entries.len());

        for entry in entries {
            order.push(entry.key);
            records.insert(
                entry.key,
                RecordData::Disk {
                    offset: entry.offset,
                    size: entry.size,
                },
            );
        }

        Ok(OpenState {
            file: Some(file),
            writable,
            order,
            records,
            dirty: false,
        })
    }

    fn read_payload(state: &mut OpenState, key: ResourceKey) -> SegmentResult<Vec<u8>> {
        match state.records.get(&key) {
            Some(RecordData::Memory(data)) => Ok(data.clone()),
            Some(&RecordData::Disk { offset, size }) => {
                let file = state.file.as_mut().ok_or(SegmentError::NotOpen)?;
                file.seek(SeekFrom::Start(offset as u64))?;
                let mut data = vec![0u8; size as usize];
                file.read_exact(&mut data).map_err(|_| {
                    SegmentError::InvalidContainer(format!("truncated record {key}"))
                })?;
                Ok(data)
            }
            None => Err(SegmentError::RecordNotFound(key)),
        }
    }

    fn store_payload(state: &mut OpenState, key: ResourceKey, data: Vec<u8>) {
        if state.records.insert(key, RecordData::Memory(data)).is_none() {
            state.order.push(key);
        }
        state.dirty = true;
    }

    /// Rewrites the container and leaves every record resident in memory.
    fn flush_locked(inner: &mut Inner) -> SegmentResult<()> {
        let path = inner.path.clone();
        let Some(state) = inner.open.as_mut() else {
            return Err(SegmentError::NotOpen);
        };

        if !state.dirty {
            return Ok(());
        }

        // Pull disk-resident payloads into memory first; the rewrite below
        // invalidates their offsets.
        let keys: Vec<ResourceKey> = state.order.clone();
        let mut payloads: Vec<(ResourceKey, Vec<u8>)> = Vec::with_capacity(keys.len());
        let mut seen = HashSet::new();

        for key in keys {
            if !seen.insert(key) {
                continue;
            }
            let data = Self::read_payload(state, key)?;
            payloads.push((key, data));
        }

        let file = File::create(path.as_std_path())?;
        let mut writer = BufWriter::new(file);
        let borrowed: Vec<(ResourceKey, &[u8])> = payloads
            .iter()
            .map(|(key, data)| (*key, data.as_slice()))
            .collect();
        format::write_container(&mut writer, &borrowed)?;
        writer.into_inner().map_err(|error| error.into_error())?;

        state.file = None;
        state.order = payloads.iter().map(|(key, _)| *key).collect();
        state.records = payloads
            .into_iter()
            .map(|(key, data)| (key, RecordData::Memory(data)))
            .collect();
        state.dirty = false;

        Ok(())
    }
}

impl DbSegment for PackedFile {
    fn init(&self) -> bool {
        self.inner.lock().initialized = true;
        true
    }

    fn shutdown(&self) -> bool {
        self.inner.lock().initialized = false;
        true
    }

    fn open(&self, read: bool, write: bool) -> SegmentResult<()> {
        if !read {
            return Err(SegmentError::InvalidAccess { read, write });
        }

        let mut inner = self.inner.lock();

        if inner.path.as_str().is_empty() {
            return Err(SegmentError::EmptyPath);
        }

        if inner.open.is_some() {
            return Ok(());
        }

        let loaded = Self::load(&inner.path, write)?;
        inner.open = Some(loaded);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.inner.lock().open.is_some()
    }

    fn close(&self) -> SegmentResult<()> {
        let mut inner = self.inner.lock();

        if inner.open.as_ref().is_some_and(|state| state.writable) {
            Self::flush_locked(&mut inner)?;
        }

        inner.open = None;
        Ok(())
    }

    fn flush(&self) -> SegmentResult<()> {
        let mut inner = self.inner.lock();

        match inner.open.as_ref().map(|state| state.writable) {
            Some(true) => Self::flush_locked(&mut inner),
            Some(false) => Ok(()),
            None => Err(SegmentError::NotOpen),
        }
    }

    fn path(&self) -> Utf8PathBuf {
        self.inner.lock().path.clone()
    }

    fn set_path(&self, path: &Utf8Path) {
        self.inner.lock().path = path.to_path_buf();
    }

    fn segment_id(&self) -> u32 {
        self.inner.lock().segment_id
    }

    fn set_segment_id(&self, segment_id: u32) {
        self.inner.lock().segment_id = segment_id;
    }

    fn record_count(&self, filter: Option<&dyn KeyFilter>) -> u32 {
        let inner = self.inner.lock();

        let Some(state) = inner.open.as_ref() else {
            return 0;
        };

        match filter {
            Some(filter) => state
                .records
                .keys()
                .filter(|key| filter.is_key_included(**key))
                .count() as u32,
            None => state.records.len() as u32,
        }
    }

    fn resource_key_list(&self, list: &mut KeyList, filter: Option<&dyn KeyFilter>) -> u32 {
        let inner = self.inner.lock();

        let Some(state) = inner.open.as_ref() else {
            return 0;
        };

        let mut contributed = 0;
        for key in &state.order {
            if filter.map_or(true, |filter| filter.is_key_included(*key)) {
                list.insert(*key);
                contributed += 1;
            }
        }
        contributed
    }

    fn test_for_record(&self, key: ResourceKey) -> bool {
        let inner = self.inner.lock();
        inner
            .open
            .as_ref()
            .is_some_and(|state| state.records.contains_key(&key))
    }

    fn record_size(&self, key: ResourceKey) -> u32 {
        let inner = self.inner.lock();

        let Some(state) = inner.open.as_ref() else {
            return 0;
        };

        match state.records.get(&key) {
            Some(RecordData::Disk { size, .. }) => *size,
            Some(RecordData::Memory(data)) => data.len() as u32,
            None => 0,
        }
    }

    fn open_record(&self, key: ResourceKey, access: RecordAccess) -> SegmentResult<DbRecord> {
        let mut inner = self.inner.lock();

        let Some(state) = inner.open.as_mut() else {
            return Err(SegmentError::NotOpen);
        };

        if access == RecordAccess::ReadWrite && !state.writable {
            return Err(SegmentError::ReadOnly);
        }

        let data = Self::read_payload(state, key)?;
        Ok(DbRecord::new(key, access, data))
    }

    fn create_new_record(&self, key: ResourceKey) -> SegmentResult<DbRecord> {
        let mut inner = self.inner.lock();

        let Some(state) = inner.open.as_mut() else {
            return Err(SegmentError::NotOpen);
        };

        if !state.writable {
            return Err(SegmentError::ReadOnly);
        }

        if state.records.contains_key(&key) {
            return Err(SegmentError::RecordExists(key));
        }

        Ok(DbRecord::new(key, RecordAccess::ReadWrite, Vec::new()))
    }

    fn close_record(&self, record: DbRecord) -> SegmentResult<()> {
        if record.access() == RecordAccess::Read {
            return Ok(());
        }

        let mut inner = self.inner.lock();

        let Some(state) = inner.open.as_mut() else {
            return Err(SegmentError::NotOpen);
        };

        if !state.writable {
            return Err(SegmentError::ReadOnly);
        }

        let key = record.key();
        Self::store_payload(state, key, record.into_data());
        Ok(())
    }

    fn abort_record(&self, _record: DbRecord) -> SegmentResult<()> {
        Ok(())
    }

    fn delete_record(&self, key: ResourceKey) -> SegmentResult<()> {
        let mut inner = self.inner.lock();

        let Some(state) = inner.open.as_mut() else {
            return Err(SegmentError::NotOpen);
        };

        if !state.writable {
            return Err(SegmentError::ReadOnly);
        }

        if state.records.remove(&key).is_none() {
            return Err(SegmentError::RecordNotFound(key));
        }

        state.order.retain(|entry| *entry != key);
        state.dirty = true;
        Ok(())
    }

    fn read_record(&self, key: ResourceKey, buffer: &mut Vec<u8>) -> SegmentResult<u32> {
        let mut inner = self.inner.lock();

        let Some(state) = inner.open.as_mut() else {
            return Err(SegmentError::NotOpen);
        };

        let data = Self::read_payload(state, key)?;
        let size = data.len() as u32;
        *buffer = data;
        Ok(size)
    }

    fn write_record(&self, key: ResourceKey, data: &[u8]) -> SegmentResult<()> {
        let mut inner = self.inner.lock();

        let Some(state) = inner.open.as_mut() else {
            return Err(SegmentError::NotOpen);
        };

        if !state.writable {
            return Err(SegmentError::ReadOnly);
        }

        Self::store_payload(state, key, data.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key(n: u32) -> ResourceKey {
        ResourceKey::new(n, n + 1, n + 2)
    }

    fn temp_path(dir: &TempDir, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap()
    }

    fn write_fixture(path: &Utf8Path, records: &[(ResourceKey, &[u8])]) {
        let segment = PackedFile::new();
        segment.init();
        segment.set_path(path);
        segment.open(true, true).unwrap();
        for (key, data) in records {
            segment.write_record(*key, data).unwrap();
        }
        segment.close().unwrap();
        segment.shutdown();
    }

    #[test]
    fn writes_and_reads_back_records() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "fixture.dat");
        write_fixture(&path, &[(key(1), b"alpha"), (key(2), b"beta")]);

        let segment = PackedFile::new();
        segment.init();
        segment.set_path(&path);
        segment.open(true, false).unwrap();

        assert!(segment.is_open());
        assert_eq!(segment.record_count(None), 2);
        assert!(segment.test_for_record(key(1)));
        assert!(!segment.test_for_record(key(9)));
        assert_eq!(segment.record_size(key(2)), 4);

        let mut buffer = Vec::new();
        assert_eq!(segment.read_record(key(1), &mut buffer).unwrap(), 5);
        assert_eq!(buffer, b"alpha");

        let mut list = KeyList::new();
        assert_eq!(segment.resource_key_list(&mut list, None), 2);
        assert_eq!(list[0], key(1));
        assert_eq!(list[1], key(2));
    }

    #[test]
    fn read_only_rejects_writes() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "fixture.dat");
        write_fixture(&path, &[(key(1), b"alpha")]);

        let segment = PackedFile::new();
        segment.init();
        segment.set_path(&path);
        segment.open(true, false).unwrap();

        assert!(matches!(
            segment.write_record(key(3), b"x"),
            Err(SegmentError::ReadOnly)
        ));
        assert!(matches!(
            segment.delete_record(key(1)),
            Err(SegmentError::ReadOnly)
        ));
        assert!(matches!(
            segment.create_new_record(key(3)),
            Err(SegmentError::ReadOnly)
        ));
        assert!(matches!(
            segment.open_record(key(1), RecordAccess::ReadWrite),
            Err(SegmentError::ReadOnly)
        ));
    }

    #[test]
    fn record_handles_commit_and_abort() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "fixture.dat");

        let segment = PackedFile::new();
        segment.init();
        segment.set_path(&path);
        segment.open(true, true).unwrap();

        let mut record = segment.create_new_record(key(1)).unwrap();
        record.data_mut().unwrap().extend_from_slice(b"committed");
        segment.close_record(record).unwrap();

        let record = segment.create_new_record(key(2)).unwrap();
        segment.abort_record(record).unwrap();

        assert!(segment.test_for_record(key(1)));
        assert!(!segment.test_for_record(key(2)));
        assert!(matches!(
            segment.create_new_record(key(1)),
            Err(SegmentError::RecordExists(_))
        ));
    }

    #[test]
    fn delete_and_overwrite_survive_a_flush() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "fixture.dat");
        write_fixture(&path, &[(key(1), b"old"), (key(2), b"gone")]);

        let segment = PackedFile::new();
        segment.init();
        segment.set_path(&path);
        segment.open(true, true).unwrap();
        segment.write_record(key(1), b"new").unwrap();
        segment.delete_record(key(2)).unwrap();
        segment.flush().unwrap();

        // Still readable through the same handle after the rewrite.
        let mut buffer = Vec::new();
        segment.read_record(key(1), &mut buffer).unwrap();
        assert_eq!(buffer, b"new");
        segment.close().unwrap();

        let reopened = PackedFile::new();
        reopened.init();
        reopened.set_path(&path);
        reopened.open(true, false).unwrap();
        assert_eq!(reopened.record_count(None), 1);
        let mut buffer = Vec::new();
        reopened.read_record(key(1), &mut buffer).unwrap();
        assert_eq!(buffer, b"new");
    }

    #[test]
    fn rejects_files_without_dbpf_signature() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "not_a_container");
        std::fs::write(path.as_std_path(), b"definitely not packed").unwrap();

        let segment = PackedFile::new();
        segment.init();
        segment.set_path(&path);
        assert!(matches!(
            segment.open(true, false),
            Err(SegmentError::InvalidContainer(_))
        ));
        assert!(!segment.is_open());
    }

    #[test]
    fn open_requires_a_path_and_read_access() {
        let segment = PackedFile::new();
        segment.init();
        assert!(matches!(
            segment.open(true, false),
            Err(SegmentError::EmptyPath)
        ));
        segment.set_path(Utf8Path::new("whatever.dat"));
        assert!(matches!(
            segment.open(false, true),
            Err(SegmentError::InvalidAccess { .. })
        ));
    }

    #[test]
    fn filtered_queries() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "fixture.dat");
        write_fixture(
            &path,
            &[
                (ResourceKey::new(1, 0, 0), b"a"),
                (ResourceKey::new(1, 0, 1), b"b"),
                (ResourceKey::new(2, 0, 0), b"c"),
            ],
        );

        let segment = PackedFile::new();
        segment.init();
        segment.set_path(&path);
        segment.open(true, false).unwrap();

        let filter = |key: ResourceKey| key.type_id == 1;
        assert_eq!(segment.record_count(Some(&filter)), 2);

        let mut list = KeyList::new();
        assert_eq!(segment.resource_key_list(&mut list, Some(&filter)), 2);
        assert_eq!(list.len(), 2);
    }
}
