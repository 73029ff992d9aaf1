pub mod builder;
pub mod crypto;
pub mod reader;

use std::convert::TryFrom;
use std::io::Write;

use crate::archive::{serialize_name_field, string_from_name_field, NAME_FIELD_SIZE};
use crate::{FolError, Result};
use nom::number::complete::le_u32;
use nom::*;
use serde::Serialize;

pub use builder::FolArchiveBuilder;
pub use reader::{FolArchive, FolFileEntry};

// Packed structs' sizes in bytes
pub const FOL_HEADER_SIZE: usize = std::mem::size_of::<u32>();
pub const INDEX_ENTRY_SIZE: usize = NAME_FIELD_SIZE + 2 * std::mem::size_of::<u32>();
pub const KEY_SIZE: usize = std::mem::size_of::<u32>();
/// Number of zeroed u32 words closing every archive
pub const TRAILER_PADDING_COUNT: usize = 97;
pub const TRAILER_PADDING_SIZE: usize = TRAILER_PADDING_COUNT * KEY_SIZE;

const ENCRYPTED_FLAG: u32 = 0x8000_0000;
const ENTRY_COUNT_MASK: u32 = !ENCRYPTED_FLAG;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FolHeader {
    pub encrypted: bool,
    pub file_count: usize,
}

impl FolHeader {
    pub fn new(file_count: usize) -> Result<Self> {
        let count = u32::try_from(file_count)?;
        if count & ENCRYPTED_FLAG != 0 {
            return Err(FolError::serialization_error("Too many entries"));
        }
        Ok(Self {
            encrypted: true,
            file_count,
        })
    }

    pub fn to_u32(self) -> u32 {
        let flag = if self.encrypted { ENCRYPTED_FLAG } else { 0 };
        flag | (self.file_count as u32 & ENTRY_COUNT_MASK)
    }

    /// Offset of the first byte following the index table
    pub fn data_base(&self) -> u64 {
        data_base(self.file_count)
    }
}

/// Decrypted content of an index entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub name: String,
    pub offset: u32,
    pub size: u32,
}

#[derive(Debug, Serialize)]
struct SerializableIndexEntryTail {
    // Note: the 128-byte name field is written by hand, serde only handles
    // arrays of up to 32 elements.
    offset: u32,
    size: u32,
}

impl IndexEntry {
    pub fn serialize_into<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&serialize_name_field(&self.name)?)?;
        let tail = SerializableIndexEntryTail {
            offset: self.offset,
            size: self.size,
        };
        bincode::serialize_into(writer, &tail)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<[u8; INDEX_ENTRY_SIZE]> {
        let mut buffer = [0; INDEX_ENTRY_SIZE];
        self.serialize_into(&mut buffer[..])?;
        Ok(buffer)
    }

    pub fn from_bytes(buffer: &[u8; INDEX_ENTRY_SIZE]) -> Result<Self> {
        let (_, entry) = parse_index_entry(&buffer[..])
            .map_err(|_| FolError::format_error("Failed to parse index entry"))?;
        Ok(entry)
    }
}

pub fn data_base(file_count: usize) -> u64 {
    (FOL_HEADER_SIZE + file_count * INDEX_ENTRY_SIZE) as u64
}

/// Converts content offsets stored relative to the content region into
/// absolute ones. Offsets of 0 or from `data_base` onward are kept.
pub fn normalize_offset(offset: u32, data_base: u64) -> u64 {
    let offset = u64::from(offset);
    if offset > 0 && offset < data_base {
        offset + data_base
    } else {
        offset
    }
}

/// Total size of an archive holding `content_size` bytes of content
pub fn archive_size(file_count: usize, content_size: u64) -> u64 {
    data_base(file_count) + content_size + (file_count * KEY_SIZE + TRAILER_PADDING_SIZE) as u64
}

named!(parse_fol_header<&[u8], FolHeader>,
    do_parse!(
        raw: le_u32
            >> (FolHeader {
                encrypted: raw & ENCRYPTED_FLAG != 0,
                file_count: (raw & ENTRY_COUNT_MASK) as usize,
            }
    )
));

named!(parse_index_entry<&[u8], IndexEntry>,
    do_parse!(
        name: map_res!(take!(NAME_FIELD_SIZE), string_from_name_field)
            >> offset: le_u32
            >> size: le_u32
            >> (IndexEntry { name, offset, size })
    )
);

named_args!(parse_key_table(file_count: usize)<&[u8], Vec<u32>>,
    count!(le_u32, file_count)
);
