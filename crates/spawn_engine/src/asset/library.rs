use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use super::info::{AssetInfo, InfoJson};

const INFO_FILE_NAME: &str = "info.json";

#[derive(Debug, Error)]
pub enum AssetLibraryError {
    #[error("asset library root is not a directory: {path}")]
    InvalidRoot { path: PathBuf },
    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read directory entry in {path}: {source}")]
    ReadDirEntry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetLoadSummary {
    pub loaded: usize,
    pub failed: usize,
}

/// Name-keyed registry of asset metadata. Iteration order is sorted by name so
/// that seeded tag lookups are reproducible.
#[derive(Debug, Default, Clone)]
pub struct AssetLibrary {
    info_by_name: BTreeMap<String, Arc<AssetInfo>>,
}

impl AssetLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_infos(infos: impl IntoIterator<Item = AssetInfo>) -> Self {
        let mut library = Self::new();
        for info in infos {
            library.insert(info);
        }
        library
    }

    /// Later inserts replace earlier ones with the same name.
    pub fn insert(&mut self, info: AssetInfo) {
        self.info_by_name.insert(info.name.clone(), Arc::new(info));
    }

    pub fn get(&self, name: &str) -> Option<Arc<AssetInfo>> {
        self.info_by_name.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.info_by_name.contains_key(name)
    }

    pub fn all(&self) -> &BTreeMap<String, Arc<AssetInfo>> {
        &self.info_by_name
    }

    pub fn len(&self) -> usize {
        self.info_by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.info_by_name.is_empty()
    }

    /// Loads every sub-directory of `dir` as one asset described by its
    /// `info.json`. Assets whose info file cannot be read or parsed are skipped
    /// and counted as failures.
    pub fn load_from_dir(dir: &Path) -> Result<(Self, AssetLoadSummary), AssetLibraryError> {
        if !dir.is_dir() {
            return Err(AssetLibraryError::InvalidRoot {
                path: dir.to_path_buf(),
            });
        }

        let entries = fs::read_dir(dir).map_err(|source| AssetLibraryError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut asset_dirs = Vec::<(String, PathBuf)>::new();
        for entry in entries {
            let entry = entry.map_err(|source| AssetLibraryError::ReadDirEntry {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            asset_dirs.push((name.to_string(), path));
        }
        asset_dirs.sort_by(|(a, _), (b, _)| a.cmp(b));

        let mut library = Self::new();
        let mut summary = AssetLoadSummary::default();
        for (name, path) in asset_dirs {
            match read_info_json(&path.join(INFO_FILE_NAME)) {
                Ok(raw) => {
                    library.insert(AssetInfo::from_info_json(&name, raw));
                    summary.loaded += 1;
                }
                Err(reason) => {
                    warn!(asset = %name, reason = %reason, "asset_info_load_failed");
                    summary.failed += 1;
                }
            }
        }

        info!(
            root = %dir.display(),
            loaded = summary.loaded,
            failed = summary.failed,
            "asset_library_loaded"
        );
        Ok((library, summary))
    }
}

fn read_info_json(path: &Path) -> Result<InfoJson, String> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("read '{}': {error}", path.display()))?;
    serde_json::from_str::<InfoJson>(&raw)
        .map_err(|error| format!("parse '{}': {error}", path.display()))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn write_asset(root: &Path, name: &str, info: Option<&str>) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).expect("asset dir");
        if let Some(body) = info {
            fs::write(dir.join(INFO_FILE_NAME), body).expect("info json");
        }
    }

    #[test]
    fn loads_each_asset_directory() {
        let temp = TempDir::new().expect("temp");
        write_asset(temp.path(), "torch", Some(r#"{"tags":["light"]}"#));
        write_asset(
            temp.path(),
            "grunt",
            Some(r#"{"tags":["goblin"],"anti_tags":["holy"],"animations":{}}"#),
        );
        fs::write(temp.path().join("notes.txt"), "ignored").expect("stray file");

        let (library, summary) = AssetLibrary::load_from_dir(temp.path()).expect("load");
        assert_eq!(summary, AssetLoadSummary { loaded: 2, failed: 0 });
        assert_eq!(library.len(), 2);
        let grunt = library.get("grunt").expect("grunt");
        assert!(grunt.has_tag("goblin"));
        assert!(grunt.has_anti_tag("holy"));
        assert_eq!(
            library.all().keys().cloned().collect::<Vec<_>>(),
            vec!["grunt".to_string(), "torch".to_string()]
        );
    }

    #[test]
    fn broken_info_files_count_as_failures() {
        let temp = TempDir::new().expect("temp");
        write_asset(temp.path(), "missing_info", None);
        write_asset(temp.path(), "bad_json", Some("{not json"));
        write_asset(temp.path(), "ok", Some("{}"));

        let (library, summary) = AssetLibrary::load_from_dir(temp.path()).expect("load");
        assert_eq!(summary, AssetLoadSummary { loaded: 1, failed: 2 });
        assert!(library.contains("ok"));
        assert!(!library.contains("bad_json"));
    }

    #[test]
    fn missing_root_is_an_error() {
        let temp = TempDir::new().expect("temp");
        let result = AssetLibrary::load_from_dir(&temp.path().join("SRC"));
        assert!(matches!(result, Err(AssetLibraryError::InvalidRoot { .. })));
    }

    #[test]
    fn later_insert_replaces_earlier() {
        let library = AssetLibrary::from_infos([
            AssetInfo::new("torch").with_tags(["light"]),
            AssetInfo::new("torch").with_tags(["fire"]),
        ]);
        assert_eq!(library.len(), 1);
        assert!(library.get("torch").expect("torch").has_tag("fire"));
    }
}
