//! Workspaces are the unpacked form of an archive: an `assets/` tree holding
//! the decrypted files and a `manifest.txt` holding keys and table order.

mod pack;
mod reconcile;
mod scan;
mod unpack;

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use crate::manifest::MANIFEST_FILE_NAME;

pub use pack::{pack, PackOptions, PackReport, SkippedFile};
pub use reconcile::{reconcile, FileRecord, Reconciliation};
pub use scan::{scan_assets, DiskCandidate, DiskScan, ScanFilter, JUNK_FILE_NAMES};
pub use unpack::{unpack, unpack_archive, EntryFailure, UnpackReport};

pub const ASSETS_DIR_NAME: &str = "assets";
const ARCHIVE_PATH_SEPARATOR: &str = "\\";
const DEFAULT_WORKSPACE_SUFFIX: &str = "_project";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Workspace next to `archive_path`, named after the archive without its
    /// extension: `slr.fol` unpacks into `slr_project`.
    pub fn for_archive<P: AsRef<Path>>(archive_path: P) -> Self {
        let archive_path = archive_path.as_ref();
        let mut dir_name: OsString = archive_path
            .file_stem()
            .unwrap_or_else(|| archive_path.as_os_str())
            .to_os_string();
        dir_name.push(DEFAULT_WORKSPACE_SUFFIX);
        Self::new(archive_path.with_file_name(dir_name))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join(ASSETS_DIR_NAME)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE_NAME)
    }
}

/// Converts an archive path into a relative local path.
///
/// Returns None for paths that would escape the destination directory or
/// that have no file name.
pub fn archive_path_to_local(archive_path: &str) -> Option<PathBuf> {
    let mut local_path = PathBuf::new();
    for component in archive_path.split(|c: char| c == '\\' || c == '/') {
        match component {
            "" | "." => continue,
            ".." => return None,
            _ => local_path.push(component),
        }
    }
    let is_relative = local_path
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if local_path.as_os_str().is_empty() || !is_relative {
        return None;
    }
    Some(local_path)
}

/// Converts a path relative to the assets directory into an archive path.
pub fn local_to_archive_path(rel_path: &Path) -> String {
    let components: Vec<String> = rel_path
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    components.join(ARCHIVE_PATH_SEPARATOR)
}
