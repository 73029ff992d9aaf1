use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::{FolError, Result};
use serde::Deserialize;

pub const MANIFEST_FILE_NAME: &str = "manifest.txt";

const COMMENT_MARKER: char = '#';
const FIELD_SEPARATOR: char = '|';
// Left by some text editors at the start of the file
const BYTE_ORDER_MARK: char = '\u{feff}';
const MANIFEST_HEADER: &str = "# FOL Manifest\n# Format: Index|Key|GamePath\n";

/// One `position|key|archive_path` record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub position: i32,
    pub key: u32,
    pub archive_path: String,
}

impl ManifestEntry {
    pub fn new(position: i32, key: u32, archive_path: impl Into<String>) -> Self {
        Self {
            position,
            key,
            archive_path: archive_path.into(),
        }
    }

    /// Parses a manifest line.
    /// Returns None for comments, blank lines and malformed lines.
    fn from_line(line: &str) -> Option<ManifestEntry> {
        let line = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
        if line.trim().is_empty() || line.starts_with(COMMENT_MARKER) {
            return None;
        }
        // The path is everything after the second separator
        let mut fields = line.splitn(3, FIELD_SEPARATOR);
        let position = fields.next()?.trim().parse().ok()?;
        let key = fields.next()?.trim().parse().ok()?;
        let archive_path = fields.next()?;
        if archive_path.is_empty() {
            return None;
        }
        Some(ManifestEntry::new(position, key, archive_path))
    }
}

// Key files written by earlier versions of the tool
#[derive(Deserialize)]
struct LegacyKeyEntry {
    index: i32,
    key: u32,
    name: String,
}

/// Ordered list of entries bridging an unpack and a later pack
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open<P: AsRef<Path>>(manifest_path: P) -> Result<Self> {
        let content = fs::read_to_string(manifest_path)?;
        Self::from_string(&content)
    }

    /// Parses a manifest, either in the line-oriented format or in the legacy
    /// JSON format.
    pub fn from_string(content: &str) -> Result<Self> {
        let content = content.strip_prefix(BYTE_ORDER_MARK).unwrap_or(content);
        if content.trim_start().starts_with('[') {
            return Self::from_json_str(content);
        }
        let mut entries = Vec::new();
        for (line_number, line) in content.lines().enumerate() {
            match ManifestEntry::from_line(line) {
                Some(entry) => entries.push(entry),
                None => {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() && !trimmed.starts_with(COMMENT_MARKER) {
                        log::warn!(
                            "Ignoring malformed manifest line {}: '{}'",
                            line_number + 1,
                            line
                        );
                    }
                }
            }
        }
        Ok(Self { entries })
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let legacy_entries: Vec<LegacyKeyEntry> = serde_json::from_str(content)
            .map_err(|e| FolError::manifest_error(format!("Invalid key file: {}", e)))?;
        Ok(Self {
            entries: legacy_entries
                .into_iter()
                .map(|e| ManifestEntry::new(e.index, e.key, e.name))
                .collect(),
        })
    }

    pub fn push(&mut self, entry: ManifestEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &'_ ManifestEntry> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> Vec<ManifestEntry> {
        self.entries
    }

    /// Sorts entries by original position. Entries sharing a position keep
    /// their relative order.
    pub fn sort_by_position(&mut self) {
        self.entries.sort_by_key(|entry| entry.position);
    }

    pub fn write_into<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(MANIFEST_HEADER.as_bytes())?;
        for entry in &self.entries {
            writeln!(
                writer,
                "{}{}{}{}{}",
                entry.position, FIELD_SEPARATOR, entry.key, FIELD_SEPARATOR, entry.archive_path
            )?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, manifest_path: P) -> Result<()> {
        let file = File::create(manifest_path)?;
        self.write_into(BufWriter::new(file))
    }
}

impl From<Vec<ManifestEntry>> for Manifest {
    fn from(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }
}
