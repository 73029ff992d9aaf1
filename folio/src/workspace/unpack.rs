use std::fs;
use std::io::{Read, Seek};
use std::path::Path;

use crate::fol::FolArchive;
use crate::manifest::{Manifest, ManifestEntry};
use crate::workspace::{archive_path_to_local, Workspace};
use crate::{FolError, Result};

/// An entry that could not be extracted
#[derive(Debug)]
pub struct EntryFailure {
    pub index: usize,
    pub archive_path: String,
    pub error: FolError,
}

#[derive(Debug, Default)]
pub struct UnpackReport {
    /// Number of entries in the archive's table
    pub entries: usize,
    pub extracted: usize,
    pub failures: Vec<EntryFailure>,
}

impl UnpackReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Extracts every entry of the archive at `archive_path` into `workspace`
/// and writes the workspace's manifest.
pub fn unpack<P: AsRef<Path>>(archive_path: P, workspace: &Workspace) -> Result<UnpackReport> {
    let archive_path = archive_path.as_ref();
    log::info!(
        "Unpacking '{}' into '{}'",
        archive_path.display(),
        workspace.root().display()
    );
    let mut archive = FolArchive::open(archive_path)?;
    unpack_archive(&mut archive, workspace)
}

/// Extracts every entry of `archive` into `workspace`.
///
/// Entries that cannot be read or written are recorded in the report and
/// extraction goes on. The manifest lists every entry of the table, extracted
/// or not, so that positions and keys survive a later pack.
pub fn unpack_archive<R: Read + Seek>(
    archive: &mut FolArchive<R>,
    workspace: &Workspace,
) -> Result<UnpackReport> {
    let assets_dir = workspace.assets_dir();
    fs::create_dir_all(&assets_dir)?;

    let entries: Vec<(usize, String, u32)> = archive
        .get_entries()
        .map(|e| (e.index, e.relative_path.clone(), e.key))
        .collect();
    let mut report = UnpackReport {
        entries: entries.len(),
        ..Default::default()
    };
    let mut manifest = Manifest::new();
    for (index, archive_path, key) in entries {
        match extract_entry(archive, index, &archive_path, &assets_dir) {
            Ok(()) => {
                log::trace!("Extracted '{}'", archive_path);
                report.extracted += 1;
            }
            Err(error) => {
                log::warn!("Failed to extract '{}': {}", archive_path, error);
                report.failures.push(EntryFailure {
                    index,
                    archive_path: archive_path.clone(),
                    error,
                });
            }
        }
        // Table indices always fit, the entry count is stored on 31 bits
        manifest.push(ManifestEntry::new(index as i32, key, archive_path));
    }

    manifest.save(workspace.manifest_path())?;
    log::info!(
        "Extracted {} of {} entries",
        report.extracted,
        report.entries
    );
    Ok(report)
}

fn extract_entry<R: Read + Seek>(
    archive: &mut FolArchive<R>,
    index: usize,
    archive_path: &str,
    assets_dir: &Path,
) -> Result<()> {
    let local_path = archive_path_to_local(archive_path).ok_or_else(|| {
        FolError::invalid_content(format!("unsafe archive path '{}'", archive_path))
    })?;
    let destination_path = assets_dir.join(local_path);
    if let Some(parent_dir) = destination_path.parent() {
        fs::create_dir_all(parent_dir)?;
    }
    archive.extract_file(index, &destination_path)
}
