use std::boxed::Box;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::fol::crypto::{decrypt_file_content, decrypt_index_entry};
use crate::fol::{
    normalize_offset, parse_fol_header, parse_key_table, FolHeader, IndexEntry,
    FOL_HEADER_SIZE, INDEX_ENTRY_SIZE, KEY_SIZE, TRAILER_PADDING_SIZE,
};
use crate::{FolError, Result};

#[derive(Debug)]
pub struct FolArchive<R: ?Sized> {
    obj: Box<R>,
    archive_size: u64,
    header: FolHeader,
    entries: Vec<FolFileEntry>,
}

/// Decrypted index entry, in table order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolFileEntry {
    pub index: usize,
    pub relative_path: String,
    pub key: u32,
    // Absolute, already normalized
    pub offset: u64,
    pub size: usize,
}

impl FolArchive<File> {
    pub fn open<P: AsRef<Path>>(fol_path: P) -> Result<FolArchive<File>> {
        let file = File::open(fol_path)?;
        FolArchive::new(file)
    }
}

impl<R: Read + Seek> FolArchive<R> {
    /// Create a new archive with the underlying object as the reader.
    pub fn new(mut obj: R) -> Result<FolArchive<R>> {
        let archive_size = obj.seek(SeekFrom::End(0))?;
        if archive_size < FOL_HEADER_SIZE as u64 {
            return Err(FolError::format_error("Archive is too small"));
        }
        obj.seek(SeekFrom::Start(0))?;
        let mut header_buf = [0; FOL_HEADER_SIZE];
        obj.read_exact(&mut header_buf)?;
        let (_, header) = parse_fol_header(&header_buf)
            .map_err(|_| FolError::format_error("Failed to parse archive (header)"))?;
        if !header.encrypted {
            return Err(FolError::format_error("Not an encrypted archive"));
        }

        let file_count = header.file_count;
        let trailer_size = (file_count * KEY_SIZE + TRAILER_PADDING_SIZE) as u64;
        if archive_size < header.data_base() + trailer_size {
            return Err(FolError::format_error(format!(
                "Archive is truncated ({} entries declared, {} bytes available)",
                file_count, archive_size
            )));
        }

        // Keys are stored right before the trailing padding
        let mut key_table_buf = vec![0; file_count * KEY_SIZE];
        obj.seek(SeekFrom::Start(archive_size - trailer_size))?;
        obj.read_exact(&mut key_table_buf)?;
        let (_, keys) = parse_key_table(&key_table_buf, file_count)
            .map_err(|_| FolError::format_error("Failed to parse archive (keys)"))?;

        let mut index_table = vec![0; file_count * INDEX_ENTRY_SIZE];
        obj.seek(SeekFrom::Start(FOL_HEADER_SIZE as u64))?;
        obj.read_exact(&mut index_table)?;
        let entries = parse_index_table(&index_table, &keys, header.data_base())?;

        Ok(FolArchive {
            obj: Box::new(obj),
            archive_size,
            header,
            entries,
        })
    }

    pub fn file_count(&self) -> usize {
        self.header.file_count
    }

    pub fn data_base(&self) -> u64 {
        self.header.data_base()
    }

    pub fn keys(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|entry| entry.key)
    }

    pub fn get_entries(&self) -> impl Iterator<Item = &'_ FolFileEntry> {
        self.entries.iter()
    }

    pub fn get_entry(&self, index: usize) -> Option<&FolFileEntry> {
        self.entries.get(index)
    }

    pub fn get_file_entry<S: AsRef<str>>(&self, file_path: S) -> Option<&FolFileEntry> {
        self.entries
            .iter()
            .find(|entry| entry.relative_path == file_path.as_ref())
    }

    pub fn contains_file<S: AsRef<str>>(&self, file_path: S) -> bool {
        self.get_file_entry(file_path).is_some()
    }

    /// Reads the content of the entry at `index` in the table, as stored in
    /// the archive.
    pub fn get_entry_raw_data(&mut self, index: usize) -> Result<Vec<u8>> {
        let file_entry = self
            .get_entry(index)
            .ok_or(FolError::EntryNotFound)?
            .clone();
        if file_entry.size == 0 {
            return Ok(vec![]);
        }
        let end_offset = file_entry.offset + file_entry.size as u64;
        if end_offset > self.archive_size {
            return Err(FolError::invalid_content(format!(
                "'{}' ends at offset {}, past the end of the archive ({})",
                file_entry.relative_path, end_offset, self.archive_size
            )));
        }

        self.obj.seek(SeekFrom::Start(file_entry.offset))?;
        let mut content: Vec<u8> = Vec::with_capacity(file_entry.size);
        let mut file_chunk = self.obj.by_ref().take(content.capacity() as u64);
        file_chunk.read_to_end(&mut content)?;
        if content.len() != file_entry.size {
            return Err(FolError::invalid_content(format!(
                "'{}' is incomplete ({} of {} bytes)",
                file_entry.relative_path,
                content.len(),
                file_entry.size
            )));
        }
        Ok(content)
    }

    /// Reads and decrypts the content of the entry at `index` in the table.
    pub fn read_file_content(&mut self, index: usize) -> Result<Vec<u8>> {
        let mut content = self.get_entry_raw_data(index)?;
        let key = self.entries[index].key;
        decrypt_file_content(&mut content, key);
        Ok(content)
    }

    pub fn extract_file(&mut self, index: usize, destination_path: &Path) -> Result<()> {
        let content = self.read_file_content(index)?;
        let mut file = File::create(destination_path)?;
        Ok(file.write_all(content.as_slice())?)
    }
}

fn parse_index_table(
    index_table: &[u8],
    keys: &[u32],
    data_base: u64,
) -> Result<Vec<FolFileEntry>> {
    index_table
        .chunks_exact(INDEX_ENTRY_SIZE)
        .zip(keys)
        .enumerate()
        .map(|(index, (entry_bytes, &key))| {
            let mut entry_buf = [0; INDEX_ENTRY_SIZE];
            entry_buf.copy_from_slice(entry_bytes);
            decrypt_index_entry(&mut entry_buf, key);
            let entry = IndexEntry::from_bytes(&entry_buf)?;
            Ok(FolFileEntry {
                index,
                relative_path: entry.name,
                key,
                offset: normalize_offset(entry.offset, data_base),
                size: entry.size as usize,
            })
        })
        .collect()
}
