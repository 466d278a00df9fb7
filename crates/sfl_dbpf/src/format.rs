//! DBPF 1.0 header and index table layout.
//!
//! All fields are little-endian. The header is 96 bytes:
//!
//! | offset | field                  |
//! |--------|------------------------|
//! | 0      | magic `"DBPF"`         |
//! | 4      | format major version   |
//! | 8      | format minor version   |
//! | 12     | reserved (12 bytes)    |
//! | 24     | date created           |
//! | 28     | date modified          |
//! | 32     | index major version    |
//! | 36     | index entry count      |
//! | 40     | index offset           |
//! | 44     | index size             |
//! | 48     | hole entry count       |
//! | 52     | hole offset            |
//! | 56     | hole size              |
//! | 60     | index minor version    |
//! | 64     | reserved (32 bytes)    |
//!
//! Index entries are 20 bytes: type, group, instance, record offset, record
//! size. SimCity 4 containers use format 1.0 with index 7.0; anything else
//! is rejected. Hole tables are ignored on read and written as zero.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use sfl_resource::{ResourceKey, SegmentError, SegmentResult};
use std::io::{Read, Seek, SeekFrom, Write};

pub const MAGIC: [u8; 4] = *b"DBPF";
pub const HEADER_SIZE: u32 = 96;
pub const FORMAT_VERSION_MAJOR: u32 = 1;
pub const FORMAT_VERSION_MINOR: u32 = 0;
pub const INDEX_VERSION_MAJOR: u32 = 7;
pub const INDEX_VERSION_MINOR: u32 = 0;
pub const INDEX_ENTRY_SIZE: u32 = 20;

/// The header fields a reader needs to locate the index table.
#[derive(Debug, Clone, Copy)]
pub struct Header {
    pub index_entry_count: u32,
    pub index_offset: u32,
    pub index_size: u32,
}

/// One index table entry: a key and the record's location in the file.
#[derive(Debug, Clone, Copy)]
pub struct IndexEntry {
    pub key: ResourceKey,
    pub offset: u32,
    pub size: u32,
}

fn invalid(message: impl Into<String>) -> SegmentError {
    SegmentError::InvalidContainer(message.into())
}

/// Parses and validates the 96-byte header.
///
/// Any short read is reported as an invalid container rather than an I/O
/// error: a file too small to hold a DBPF header is not a DBPF file.
pub fn read_header<R: Read>(reader: &mut R) -> SegmentResult<Header> {
    let mut buffer = [0u8; HEADER_SIZE as usize];
    reader
        .read_exact(&mut buffer)
        .map_err(|_| invalid("file is smaller than the DBPF header"))?;

    if buffer[..4] != MAGIC {
        return Err(invalid("missing DBPF magic"));
    }

    let mut fields = &buffer[4..];
    let version_major = fields.read_u32::<LittleEndian>().unwrap();
    let version_minor = fields.read_u32::<LittleEndian>().unwrap();

    if version_major != FORMAT_VERSION_MAJOR || version_minor != FORMAT_VERSION_MINOR {
        return Err(invalid(format!(
            "unsupported format version {version_major}.{version_minor}"
        )));
    }

    // reserved + dates
    fields = &fields[20..];

    let index_version_major = fields.read_u32::<LittleEndian>().unwrap();
    let index_entry_count = fields.read_u32::<LittleEndian>().unwrap();
    let index_offset = fields.read_u32::<LittleEndian>().unwrap();
    let index_size = fields.read_u32::<LittleEndian>().unwrap();

    if index_version_major != INDEX_VERSION_MAJOR {
        return Err(invalid(format!(
            "unsupported index version {index_version_major}"
        )));
    }

    if index_size < index_entry_count.saturating_mul(INDEX_ENTRY_SIZE) {
        return Err(invalid("index size does not cover the entry count"));
    }

    Ok(Header {
        index_entry_count,
        index_offset,
        index_size,
    })
}

/// Reads the index table described by `header`, in file order.
pub fn read_index<R: Read + Seek>(reader: &mut R, header: &Header) -> SegmentResult<Vec<IndexEntry>> {
    reader
        .seek(SeekFrom::Start(header.index_offset as u64))
        .map_err(|_| invalid("index offset is past the end of the file"))?;

    let mut entries = Vec::with_capacity(header.index_entry_count as usize);

    for _ in 0..header.index_entry_count {
        let mut raw = [0u8; INDEX_ENTRY_SIZE as usize];
        reader
            .read_exact(&mut raw)
            .map_err(|_| invalid("truncated index table"))?;

        let mut fields = &raw[..];
        let type_id = fields.read_u32::<LittleEndian>().unwrap();
        let group_id = fields.read_u32::<LittleEndian>().unwrap();
        let instance_id = fields.read_u32::<LittleEndian>().unwrap();
        let offset = fields.read_u32::<LittleEndian>().unwrap();
        let size = fields.read_u32::<LittleEndian>().unwrap();

        entries.push(IndexEntry {
            key: ResourceKey::new(type_id, group_id, instance_id),
            offset,
            size,
        });
    }

    Ok(entries)
}

/// Writes a complete container: header, record payloads, index table.
///
/// Records land in the given order starting right after the header, with
/// the index table at the end. Dates are written as zero — the game never
/// reads them and it keeps fixture output deterministic.
pub fn write_container<W: Write>(
    writer: &mut W,
    records: &[(ResourceKey, &[u8])],
) -> std::io::Result<()> {
    let mut offset = HEADER_SIZE;
    let mut entries = Vec::with_capacity(records.len());

    for (key, data) in records {
        entries.push(IndexEntry {
            key: *key,
            offset,
            size: data.len() as u32,
        });
        offset += data.len() as u32;
    }

    let index_offset = offset;
    let index_size = entries.len() as u32 * INDEX_ENTRY_SIZE;

    writer.write_all(&MAGIC)?;
    writer.write_u32::<LittleEndian>(FORMAT_VERSION_MAJOR)?;
    writer.write_u32::<LittleEndian>(FORMAT_VERSION_MINOR)?;
    writer.write_all(&[0u8; 12])?;
    writer.write_u32::<LittleEndian>(0)?; // date created
    writer.write_u32::<LittleEndian>(0)?; // date modified
    writer.write_u32::<LittleEndian>(INDEX_VERSION_MAJOR)?;
    writer.write_u32::<LittleEndian>(entries.len() as u32)?;
    writer.write_u32::<LittleEndian>(index_offset)?;
    writer.write_u32::<LittleEndian>(index_size)?;
    writer.write_u32::<LittleEndian>(0)?; // hole entry count
    writer.write_u32::<LittleEndian>(0)?; // hole offset
    writer.write_u32::<LittleEndian>(0)?; // hole size
    writer.write_u32::<LittleEndian>(INDEX_VERSION_MINOR)?;
    writer.write_all(&[0u8; 32])?;

    for (_, data) in records {
        writer.write_all(data)?;
    }

    for entry in &entries {
        writer.write_u32::<LittleEndian>(entry.key.type_id)?;
        writer.write_u32::<LittleEndian>(entry.key.group_id)?;
        writer.write_u32::<LittleEndian>(entry.key.instance_id)?;
        writer.write_u32::<LittleEndian>(entry.offset)?;
        writer.write_u32::<LittleEndian>(entry.size)?;
    }

    Ok(())
}
