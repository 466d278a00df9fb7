//! Owned record handles produced by segment record operations.

use crate::key::ResourceKey;

/// Access mode requested when opening a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAccess {
    Read,
    ReadWrite,
}

/// An open record: the key, its payload bytes, and the granted access mode.
///
/// Records are plain owned values — a segment hands one out from
/// [`open_record`](crate::DbSegment::open_record) or
/// [`create_new_record`](crate::DbSegment::create_new_record) and takes it
/// back through [`close_record`](crate::DbSegment::close_record) (commit) or
/// [`abort_record`](crate::DbSegment::abort_record) (discard). Payloads are
/// raw bytes; no segment interprets them.
#[derive(Debug)]
pub struct DbRecord {
    key: ResourceKey,
    access: RecordAccess,
    data: Vec<u8>,
}

impl DbRecord {
    pub fn new(key: ResourceKey, access: RecordAccess, data: Vec<u8>) -> Self {
        Self { key, access, data }
    }

    pub fn key(&self) -> ResourceKey {
        self.key
    }

    pub fn access(&self) -> RecordAccess {
        self.access
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable payload access. `None` unless the record was opened read-write.
    pub fn data_mut(&mut self) -> Option<&mut Vec<u8>> {
        match self.access {
            RecordAccess::ReadWrite => Some(&mut self.data),
            RecordAccess::Read => None,
        }
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}
