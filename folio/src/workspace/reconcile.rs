use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

use crate::keygen::KeyGenerator;
use crate::manifest::{Manifest, ManifestEntry};
use crate::workspace::DiskCandidate;

/// Position given to files that were not listed in the manifest
pub const NEW_FILE_POSITION: i32 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub disk_location: Option<PathBuf>,
    pub archive_path: String,
    pub key: u32,
    pub original_position: i32,
}

/// Final list of files to pack, in archive order
#[derive(Debug, Default)]
pub struct Reconciliation {
    pub records: Vec<FileRecord>,
    /// Manifest entries without a file on disk
    pub missing: Vec<ManifestEntry>,
    pub new_file_count: usize,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_manifest(&self) -> Manifest {
        self.records
            .iter()
            .map(|record| {
                ManifestEntry::new(
                    record.original_position,
                    record.key,
                    record.archive_path.as_str(),
                )
            })
            .collect::<Vec<_>>()
            .into()
    }
}

/// Merges the manifest of a previous unpack with the files currently on disk.
///
/// Files listed in the manifest keep their key and come first, in original
/// position order. Each manifest entry claims the first unclaimed candidate
/// with the same archive path; entries left without one are dropped. The
/// remaining candidates are new files: they are sorted by archive path and
/// then given fresh keys, in that order.
pub fn reconcile<K>(
    mut manifest: Manifest,
    candidates: Vec<DiskCandidate>,
    key_generator: &mut K,
) -> Reconciliation
where
    K: KeyGenerator + ?Sized,
{
    manifest.sort_by_position();

    let mut consumed = vec![false; candidates.len()];
    let mut records = Vec::with_capacity(candidates.len());
    let mut missing = Vec::new();
    {
        let mut candidates_by_path: HashMap<&str, VecDeque<usize>> = HashMap::new();
        for (i, candidate) in candidates.iter().enumerate() {
            candidates_by_path
                .entry(candidate.archive_path.as_str())
                .or_default()
                .push_back(i);
        }

        for entry in manifest.into_entries() {
            let found = candidates_by_path
                .get_mut(entry.archive_path.as_str())
                .and_then(|indices| indices.pop_front());
            match found {
                Some(i) => {
                    consumed[i] = true;
                    records.push(FileRecord {
                        disk_location: Some(candidates[i].disk_location.clone()),
                        archive_path: entry.archive_path,
                        key: entry.key,
                        original_position: entry.position,
                    });
                }
                None => {
                    log::warn!(
                        "'{}' is listed in the manifest but missing on disk, skipping it",
                        entry.archive_path
                    );
                    missing.push(entry);
                }
            }
        }
    }

    let mut new_files: Vec<DiskCandidate> = candidates
        .into_iter()
        .zip(consumed)
        .filter_map(|(candidate, consumed)| if consumed { None } else { Some(candidate) })
        .collect();
    new_files.sort_by(|a, b| a.archive_path.as_bytes().cmp(b.archive_path.as_bytes()));
    let new_file_count = new_files.len();
    for candidate in new_files {
        let key = key_generator.next_key();
        log::info!("New file: '{}' (key {})", candidate.archive_path, key);
        records.push(FileRecord {
            disk_location: Some(candidate.disk_location),
            archive_path: candidate.archive_path,
            key,
            original_position: NEW_FILE_POSITION,
        });
    }

    Reconciliation {
        records,
        missing,
        new_file_count,
    }
}
