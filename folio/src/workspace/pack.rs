use std::convert::TryFrom;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::fol::FolArchiveBuilder;
use crate::keygen::KeyGenerator;
use crate::manifest::Manifest;
use crate::workspace::{reconcile, scan_assets, FileRecord, ScanFilter, Workspace};
use crate::{FolError, Result};
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Default)]
pub struct PackOptions {
    /// Manifest to reconcile against, instead of the workspace's own
    pub manifest_path: Option<PathBuf>,
    pub scan_filter: ScanFilter,
}

/// A file that could not be read and was packed as an empty entry
#[derive(Debug)]
pub struct SkippedFile {
    pub archive_path: String,
    pub disk_location: Option<PathBuf>,
    pub error: FolError,
}

#[derive(Debug, Default)]
pub struct PackReport {
    /// Number of entries in the new archive
    pub packed: usize,
    pub new_files: usize,
    /// Manifest entries whose file is gone
    pub missing: Vec<String>,
    pub skipped: Vec<SkippedFile>,
    /// Entries of the assets directory the scan could not inspect
    pub unreadable: Vec<PathBuf>,
    pub archive_size: u64,
}

impl PackReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.skipped.is_empty() && self.unreadable.is_empty()
    }
}

/// Packs the content of `workspace` into a new archive at `archive_path`.
///
/// Files listed in the manifest keep their key and position, files found on
/// disk only are appended with keys drawn from `key_generator`. The archive
/// is written to a temporary file first and only replaces `archive_path`
/// once complete. The workspace's manifest is then updated to describe the
/// new archive.
pub fn pack<P, K>(
    workspace: &Workspace,
    archive_path: P,
    options: &PackOptions,
    key_generator: &mut K,
) -> Result<PackReport>
where
    P: AsRef<Path>,
    K: KeyGenerator + ?Sized,
{
    let archive_path = archive_path.as_ref();
    let assets_dir = workspace.assets_dir();
    let manifest_path = options
        .manifest_path
        .clone()
        .unwrap_or_else(|| workspace.manifest_path());
    if !assets_dir.is_dir() {
        return Err(FolError::prerequisite_missing("assets directory", assets_dir));
    }
    if !manifest_path.is_file() {
        return Err(FolError::prerequisite_missing("manifest", manifest_path));
    }

    log::info!(
        "Packing '{}' into '{}'",
        workspace.root().display(),
        archive_path.display()
    );
    let manifest = Manifest::open(&manifest_path)?;
    log::trace!("{} entries in '{}'", manifest.len(), manifest_path.display());
    let scan = scan_assets(&assets_dir, &options.scan_filter)?;
    log::trace!("{} files found on disk", scan.candidates.len());
    let reconciliation = reconcile(manifest, scan.candidates, key_generator);
    if reconciliation.is_empty() {
        return Err(FolError::EmptyOutput);
    }

    let mut report = PackReport {
        packed: reconciliation.records.len(),
        new_files: reconciliation.new_file_count,
        missing: reconciliation
            .missing
            .iter()
            .map(|entry| entry.archive_path.clone())
            .collect(),
        unreadable: scan.unreadable,
        ..Default::default()
    };
    let (archive_size, skipped) = write_archive(&reconciliation.records, archive_path)?;
    report.archive_size = archive_size;
    report.skipped = skipped;

    reconciliation.to_manifest().save(workspace.manifest_path())?;
    log::info!(
        "Packed {} entries ({} new, {} bytes)",
        report.packed,
        report.new_files,
        report.archive_size
    );
    Ok(report)
}

fn write_archive(
    records: &[FileRecord],
    archive_path: &Path,
) -> Result<(u64, Vec<SkippedFile>)> {
    let output_dir = match archive_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp_file = NamedTempFile::new_in(output_dir)?;
    let mut skipped = Vec::new();
    let archive_size = {
        let mut archive_builder = FolArchiveBuilder::create(
            BufWriter::new(temp_file.as_file_mut()),
            records.len(),
        )?;
        for record in records {
            let content = match read_source_file(record) {
                Ok(content) => content,
                Err(error) => {
                    log::warn!(
                        "Failed to read '{}', packing it as an empty file: {}",
                        record.archive_path,
                        error
                    );
                    skipped.push(SkippedFile {
                        archive_path: record.archive_path.clone(),
                        disk_location: record.disk_location.clone(),
                        error,
                    });
                    Vec::new()
                }
            };
            log::trace!("'{}' will be PACKED", record.archive_path);
            archive_builder.add_file(
                record.archive_path.clone(),
                record.key,
                content.as_slice(),
            )?;
        }
        archive_builder.finish()?;
        archive_builder.archive_size()
    };
    temp_file
        .persist(archive_path)
        .map_err(|e| FolError::from(e.error))?;
    Ok((archive_size, skipped))
}

fn read_source_file(record: &FileRecord) -> Result<Vec<u8>> {
    let disk_location = record
        .disk_location
        .as_ref()
        .ok_or(FolError::EntryNotFound)?;
    let content = fs::read(disk_location)?;
    // Sizes are stored on 32 bits
    u32::try_from(content.len())?;
    Ok(content)
}
