use std::collections::HashSet;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use crate::workspace::local_to_archive_path;
use crate::Result;
use walkdir::WalkDir;

/// Files never packed, whatever the filter says
pub const JUNK_FILE_NAMES: &[&str] = &[".DS_Store"];

/// Additional files to leave out of the disk scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanFilter {
    pub ignored_file_names: Vec<String>,
    // Without the leading dot, compared case-insensitively
    pub ignored_extensions: Vec<String>,
}

impl ScanFilter {
    pub fn is_ignored(&self, file_name: &OsStr) -> bool {
        let file_name = file_name.to_string_lossy();
        if JUNK_FILE_NAMES.contains(&&*file_name)
            || self.ignored_file_names.iter().any(|n| *n == file_name)
        {
            return true;
        }
        match Path::new(&*file_name)
            .extension()
            .map(|e| e.to_string_lossy())
        {
            Some(extension) => self
                .ignored_extensions
                .iter()
                .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&extension)),
            None => false,
        }
    }
}

/// A regular file found on disk, with the path it gets inside the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskCandidate {
    pub disk_location: PathBuf,
    pub archive_path: String,
}

/// Result of a disk scan
#[derive(Debug, Default)]
pub struct DiskScan {
    pub candidates: Vec<DiskCandidate>,
    /// Entries that could not be inspected (dangling links, unreadable
    /// directories, ...), left out of the scan
    pub unreadable: Vec<PathBuf>,
}

/// Lists the regular files under `assets_dir`.
///
/// Entries are visited depth-first, sorted by file name within each
/// directory, so the result does not depend on the order the host
/// filesystem returns them in. When two files map to the same archive path,
/// the first one visited is kept. Only a failure on `assets_dir` itself is
/// an error, entries below it that cannot be inspected are skipped.
pub fn scan_assets<P: AsRef<Path>>(assets_dir: P, filter: &ScanFilter) -> Result<DiskScan> {
    let assets_dir = assets_dir.as_ref();
    let mut scan = DiskScan::default();
    let mut seen_paths = HashSet::new();
    let walker = WalkDir::new(assets_dir)
        .follow_links(true)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        .into_iter();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => return Err(io::Error::from(err).into()),
            Err(err) => {
                let path = err.path().unwrap_or(assets_dir).to_path_buf();
                log::warn!("Cannot read '{}', skipping it: {}", path.display(), err);
                scan.unreadable.push(path);
                continue;
            }
        };
        if !entry.file_type().is_file() || filter.is_ignored(entry.file_name()) {
            continue;
        }
        let rel_path = match entry.path().strip_prefix(assets_dir) {
            Ok(v) => v,
            Err(_) => continue,
        };
        let archive_path = local_to_archive_path(rel_path);
        if !seen_paths.insert(archive_path.clone()) {
            log::warn!(
                "'{}' maps to '{}' which is already taken, ignoring it",
                entry.path().display(),
                archive_path
            );
            continue;
        }
        scan.candidates.push(DiskCandidate {
            disk_location: entry.path().to_path_buf(),
            archive_path,
        });
    }
    Ok(scan)
}
