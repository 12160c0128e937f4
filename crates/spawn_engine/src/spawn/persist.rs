use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

const EMBEDDED_KEY_SEPARATOR: &str = "::";

/// Where a source document is written back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcePath {
    /// No backing file; the document only lives in memory.
    InMemory,
    File(PathBuf),
    /// The document is the value of `key` inside the JSON object stored at
    /// `file` (written as `file::key`).
    Embedded { file: PathBuf, key: String },
}

impl SourcePath {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::InMemory;
        }
        match trimmed.rsplit_once(EMBEDDED_KEY_SEPARATOR) {
            Some((file, key)) if !file.is_empty() && !key.is_empty() => Self::Embedded {
                file: PathBuf::from(file),
                key: key.to_string(),
            },
            _ => Self::File(PathBuf::from(trimmed)),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self, Self::InMemory)
    }

    pub fn file(&self) -> Option<&Path> {
        match self {
            Self::InMemory => None,
            Self::File(file) | Self::Embedded { file, .. } => Some(file),
        }
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InMemory => write!(f, "<in-memory>"),
            Self::File(file) => write!(f, "{}", file.display()),
            Self::Embedded { file, key } => {
                write!(f, "{}{EMBEDDED_KEY_SEPARATOR}{key}", file.display())
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to encode source json for {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot store key '{key}' in {path}: file does not hold a JSON object")]
    NotAnObject { path: PathBuf, key: String },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Unchanged,
    SkippedInMemory,
    SkippedDisabled,
    Written,
    Failed(String),
}

/// Overwrites the backing file of `path` with `doc` as 2-space indented JSON.
pub(crate) fn write_source(path: &SourcePath, doc: &Value) -> Result<(), PersistError> {
    match path {
        SourcePath::InMemory => Ok(()),
        SourcePath::File(file) => write_pretty(file, doc),
        SourcePath::Embedded { file, key } => {
            let mut container = read_container(file, key)?;
            container.insert(key.clone(), doc.clone());
            write_pretty(file, &Value::Object(container))
        }
    }
}

fn read_container(file: &Path, key: &str) -> Result<Map<String, Value>, PersistError> {
    let raw = match fs::read_to_string(file) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(source) => {
            return Err(PersistError::Read {
                path: file.to_path_buf(),
                source,
            })
        }
    };
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(PersistError::NotAnObject {
            path: file.to_path_buf(),
            key: key.to_string(),
        }),
        Err(source) => Err(PersistError::Parse {
            path: file.to_path_buf(),
            source,
        }),
    }
}

fn write_pretty(file: &Path, doc: &Value) -> Result<(), PersistError> {
    let text = serde_json::to_string_pretty(doc).map_err(|source| PersistError::Encode {
        path: file.to_path_buf(),
        source,
    })?;
    fs::write(file, text).map_err(|source| PersistError::Write {
        path: file.to_path_buf(),
        source,
    })
}
