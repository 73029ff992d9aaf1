use std::boxed::Box;
use std::collections::HashSet;
use std::convert::TryFrom;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::fol::crypto::{encrypt_file_content, encrypt_index_entry};
use crate::fol::{
    archive_size, FolHeader, IndexEntry, FOL_HEADER_SIZE, INDEX_ENTRY_SIZE,
    TRAILER_PADDING_SIZE,
};
use crate::{FolError, Result};

/// Writes a FOL archive whose entry count is known up front.
///
/// The index table is reserved when the builder is created and written back
/// by `finish`, once every file has been appended.
pub struct FolArchiveBuilder<W: Write + Seek> {
    obj: Box<W>,
    start_offset: u64,
    finished: bool,
    header: FolHeader,
    entries: Vec<BuilderFileEntry>,
    paths: HashSet<String>,
    next_offset: u64,
}

struct BuilderFileEntry {
    index_entry: IndexEntry,
    key: u32,
}

impl<W: Write + Seek> FolArchiveBuilder<W> {
    pub fn create(mut obj: W, file_count: usize) -> Result<Self> {
        let header = FolHeader::new(file_count)?;
        let start_offset = obj.seek(SeekFrom::Current(0)).unwrap_or(0);
        bincode::serialize_into(obj.by_ref(), &header.to_u32())?;
        // Placeholder for the index table
        obj.write_all(&vec![0; file_count * INDEX_ENTRY_SIZE])?;
        Ok(Self {
            obj: Box::new(obj),
            start_offset,
            finished: false,
            header,
            entries: Vec::with_capacity(file_count),
            paths: HashSet::with_capacity(file_count),
            next_offset: header.data_base(),
        })
    }

    pub fn file_count(&self) -> usize {
        self.header.file_count
    }

    /// Appends the content of `data`, encrypted with `key`, as the next entry
    /// of the index table.
    pub fn add_file<R: Read>(
        &mut self,
        relative_path: String,
        key: u32,
        mut data: R,
    ) -> Result<()> {
        if self.entries.len() >= self.header.file_count {
            return Err(FolError::serialization_error(format!(
                "Cannot add '{}', all {} entries have been added already",
                relative_path, self.header.file_count
            )));
        }
        if self.paths.contains(&relative_path) {
            return Err(FolError::serialization_error(format!(
                "'{}' has been added twice",
                relative_path
            )));
        }

        let mut content = Vec::new();
        data.read_to_end(&mut content)?;
        let size = u32::try_from(content.len())?;
        let offset = u32::try_from(self.next_offset)?;
        encrypt_file_content(&mut content, key);

        self.obj
            .seek(SeekFrom::Start(self.start_offset + self.next_offset))?;
        self.obj.write_all(&content)?;
        self.next_offset += u64::from(size);
        self.paths.insert(relative_path.clone());
        self.entries.push(BuilderFileEntry {
            index_entry: IndexEntry {
                name: relative_path,
                offset,
                size,
            },
            key,
        });
        Ok(())
    }

    /// Writes the index table and the trailer. Fails if fewer entries than
    /// declared have been added.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let file_count = self.header.file_count;
        if self.entries.len() != file_count {
            return Err(FolError::serialization_error(format!(
                "Only {} of {} entries have been added",
                self.entries.len(),
                file_count
            )));
        }

        let index_table = self.generate_index_table()?;
        self.obj
            .seek(SeekFrom::Start(self.start_offset + FOL_HEADER_SIZE as u64))?;
        self.obj.write_all(&index_table)?;

        // Keys, in table order, then the fixed padding
        self.obj
            .seek(SeekFrom::Start(self.start_offset + self.next_offset))?;
        for entry in &self.entries {
            bincode::serialize_into(self.obj.by_ref(), &entry.key)?;
        }
        self.obj.write_all(&[0; TRAILER_PADDING_SIZE])?;
        self.obj.flush()?;

        let written = self.obj.seek(SeekFrom::Current(0))? - self.start_offset;
        let expected = archive_size(file_count, self.next_offset - self.header.data_base());
        if written != expected {
            return Err(FolError::serialization_error(format!(
                "Archive size mismatch (expected {} bytes, wrote {})",
                expected, written
            )));
        }
        Ok(())
    }

    /// Size of the archive once finished
    pub fn archive_size(&self) -> u64 {
        archive_size(
            self.header.file_count,
            self.next_offset - self.header.data_base(),
        )
    }

    fn generate_index_table(&self) -> Result<Vec<u8>> {
        let mut table = Vec::with_capacity(self.entries.len() * INDEX_ENTRY_SIZE);
        for entry in &self.entries {
            let mut entry_bytes = entry.index_entry.to_bytes()?;
            encrypt_index_entry(&mut entry_bytes, entry.key);
            table.extend_from_slice(&entry_bytes);
        }
        Ok(table)
    }
}

impl<W: Write + Seek> Drop for FolArchiveBuilder<W> {
    // Automatically call finish on destruction
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::reader::tests::build_raw_archive;
    use crate::fol::{FolArchive, FolFileEntry};
    use std::fs::File;
    use std::io::{self, Cursor};
    use tempfile::tempdir;

    #[test]
    fn test_add_file() {
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("builder.fol");
        let test_content: Vec<(&str, u32, Vec<u8>)> = vec![
            ("data\\file.gat", 0x0000_0001, vec![0u8; 60]),
            ("data\\subfolder\\file.gnd", 0xFFFF_FFFF, vec![0xCCu8; 341]),
            ("data\\file2.gat", 0x8000_0000, (0..129).collect()),
            ("data\\empty.txt", 42, vec![]),
        ];
        // Generate
        {
            let output_file = File::create(&output_path).unwrap();
            let mut builder = FolArchiveBuilder::create(output_file, test_content.len()).unwrap();
            for (name, key, content) in &test_content {
                builder
                    .add_file(name.to_string(), *key, content.as_slice())
                    .unwrap();
            }
            assert_eq!(builder.archive_size(), archive_size(4, 60 + 341 + 129));
            // Call finish manually, even though builder will be dropped on scope exit
            builder.finish().unwrap();
        }
        // Check result
        {
            let mut fol = FolArchive::open(&output_path).unwrap();
            assert_eq!(fol.file_count(), test_content.len());
            let file_entries: Vec<FolFileEntry> = fol.get_entries().cloned().collect();
            for (entry, (name, key, content)) in file_entries.iter().zip(test_content.iter()) {
                assert_eq!(&entry.relative_path, name);
                assert_eq!(entry.key, *key);
                assert_eq!(entry.size, content.len());
                assert_eq!(&fol.read_file_content(entry.index).unwrap(), content);
            }
            let output_size = std::fs::metadata(&output_path).unwrap().len();
            assert_eq!(output_size, archive_size(4, 60 + 341 + 129));
        }
    }

    #[test]
    fn test_matches_reference_layout() {
        let files: [(&str, u32, &[u8]); 3] = [
            ("a.txt", 0x0102_0304, b"first file"),
            ("dir\\b.bin", 0xA5A5_A5A5, b"\x00\x01\x02\x03\x04"),
            ("dir\\sub\\c", 9, b"xyz"),
        ];
        let mut output = Cursor::new(Vec::new());
        {
            let mut builder = FolArchiveBuilder::create(&mut output, files.len()).unwrap();
            for (name, key, content) in &files {
                builder.add_file(name.to_string(), *key, *content).unwrap();
            }
        }
        assert_eq!(output.into_inner(), build_raw_archive(&files, false));
    }

    #[test]
    fn test_entry_count_is_enforced() {
        let mut output = Cursor::new(Vec::new());
        let mut builder = FolArchiveBuilder::create(&mut output, 1).unwrap();
        builder.add_file("a".to_string(), 1, io::empty()).unwrap();
        assert!(builder.add_file("b".to_string(), 2, io::empty()).is_err());
        builder.finish().unwrap();

        let mut output = Cursor::new(Vec::new());
        let mut builder = FolArchiveBuilder::create(&mut output, 2).unwrap();
        builder.add_file("a".to_string(), 1, io::empty()).unwrap();
        assert!(builder.finish().is_err());
    }

    #[test]
    fn test_duplicate_path_is_rejected() {
        let mut output = Cursor::new(Vec::new());
        let mut builder = FolArchiveBuilder::create(&mut output, 2).unwrap();
        builder.add_file("a".to_string(), 1, &b"1"[..]).unwrap();
        assert!(builder.add_file("a".to_string(), 2, &b"2"[..]).is_err());
    }
}
