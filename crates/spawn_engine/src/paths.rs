use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const ROOT_ENV_VAR: &str = "SPAWN_TOOL_ROOT";
/// Directory under the game root holding one sub-directory per asset.
pub const LIBRARY_DIR_NAME: &str = "SRC";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub root: PathBuf,
    pub library_dir: PathBuf,
}

impl ToolPaths {
    fn at(root: PathBuf) -> Self {
        let library_dir = root.join(LIBRARY_DIR_NAME);
        Self { root, library_dir }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to read current directory: {0}")]
    CurrentDir(#[source] io::Error),
    #[error("SPAWN_TOOL_ROOT points at {}, which has no SRC/ asset library", .path.display())]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "no SRC/ asset library found in {} or any parent directory; set SPAWN_TOOL_ROOT or pass --library",
        .start_dir.display()
    )]
    LibraryNotFound { start_dir: PathBuf },
}

/// Game root from `SPAWN_TOOL_ROOT`, else the nearest directory at or above
/// the working directory that holds an asset library.
pub fn resolve_tool_paths() -> Result<ToolPaths, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let root = canonical(Path::new(&value));
            if has_asset_library(&root) {
                Ok(ToolPaths::at(root))
            } else {
                Err(StartupError::InvalidEnvRoot { path: root })
            }
        }
        Err(env::VarError::NotPresent) => {
            let start_dir = env::current_dir().map_err(StartupError::CurrentDir)?;
            find_library_root(&start_dir)
                .map(ToolPaths::at)
                .ok_or(StartupError::LibraryNotFound { start_dir })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn find_library_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| has_asset_library(dir))
        .map(canonical)
}

fn has_asset_library(dir: &Path) -> bool {
    dir.join(LIBRARY_DIR_NAME).is_dir()
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn library_root_is_found_from_nested_directory() {
        let temp = TempDir::new().expect("temp");
        fs::create_dir_all(temp.path().join(LIBRARY_DIR_NAME)).expect("library dir");
        let nested = temp.path().join("rooms").join("cave");
        fs::create_dir_all(&nested).expect("nested dir");

        let root = find_library_root(&nested).expect("root");
        assert_eq!(root, canonical(temp.path()));
        let paths = ToolPaths::at(root);
        assert_eq!(paths.library_dir, canonical(temp.path()).join("SRC"));
    }

    #[test]
    fn plain_file_named_like_library_is_not_a_root() {
        let temp = TempDir::new().expect("temp");
        fs::write(temp.path().join(LIBRARY_DIR_NAME), "not a directory").expect("file");
        assert!(!has_asset_library(temp.path()));
        fs::remove_file(temp.path().join(LIBRARY_DIR_NAME)).expect("remove");
        fs::create_dir_all(temp.path().join(LIBRARY_DIR_NAME)).expect("library dir");
        assert!(has_asset_library(temp.path()));
    }
}
