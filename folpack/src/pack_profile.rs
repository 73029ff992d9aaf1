use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use folio::workspace::ScanFilter;
use serde::Deserialize;

/// Optional settings for the `pack` command
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PackProfile {
    #[serde(default)]
    pub ignored_file_names: Vec<String>,
    #[serde(default)]
    pub ignored_extensions: Vec<String>,
    pub key_seed: Option<u64>,
}

impl PackProfile {
    pub fn scan_filter(&self) -> ScanFilter {
        ScanFilter {
            ignored_file_names: self.ignored_file_names.clone(),
            ignored_extensions: self.ignored_extensions.clone(),
        }
    }
}

pub fn parse_pack_profile(file_path: impl AsRef<Path>) -> Result<PackProfile> {
    let file = File::open(file_path)?;
    let file_reader = BufReader::new(file);
    let pack_profile = serde_yaml::from_reader(file_reader).context("Invalid pack profile")?;
    Ok(pack_profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_pack_profile() {
        let temp_dir = tempdir().unwrap();
        let profile_path = temp_dir.path().join("profile.yml");
        fs::write(
            &profile_path,
            "ignored_file_names:\n  - Thumbs.db\nignored_extensions: [key, json]\nkey_seed: 42\n",
        )
        .unwrap();
        let profile = parse_pack_profile(&profile_path).unwrap();
        assert_eq!(profile.key_seed, Some(42));
        let filter = profile.scan_filter();
        assert!(filter.is_ignored(OsStr::new("Thumbs.db")));
        assert!(filter.is_ignored(OsStr::new("old.KEY")));
        assert!(!filter.is_ignored(OsStr::new("hero.spr")));
    }

    #[test]
    fn test_partial_pack_profile() {
        let temp_dir = tempdir().unwrap();
        let profile_path = temp_dir.path().join("profile.yml");
        fs::write(&profile_path, "key_seed: 7\n").unwrap();
        let profile = parse_pack_profile(&profile_path).unwrap();
        assert_eq!(
            profile,
            PackProfile {
                key_seed: Some(7),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_invalid_pack_profile() {
        let temp_dir = tempdir().unwrap();
        let profile_path = temp_dir.path().join("profile.yml");
        fs::write(&profile_path, "key_seed: [not, a, number]\n").unwrap();
        assert!(parse_pack_profile(&profile_path).is_err());
        assert!(parse_pack_profile(temp_dir.path().join("missing.yml")).is_err());
    }
}
