//! Load a structured config document, deep-merge an overlay into it and save it
//! back in place.
//!
//! Both TOML and JSON documents are decoded into the same key-ordered tree
//! (`serde_json::Value`), so the merge rules are identical for both formats.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

/// Override mapping applied on top of an on-disk document.
pub type Overlay = Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentFormat {
    Toml,
    Json,
}

impl DocumentFormat {
    pub fn name(self) -> &'static str {
        match self {
            DocumentFormat::Toml => "toml",
            DocumentFormat::Json => "json",
        }
    }

    fn decode(self, raw: &str) -> Result<Value, String> {
        match self {
            DocumentFormat::Toml => toml::from_str::<Value>(raw).map_err(|err| err.to_string()),
            DocumentFormat::Json => serde_json::from_str(raw).map_err(|err| err.to_string()),
        }
    }

    fn encode(self, value: &Map<String, Value>) -> Result<String, String> {
        match self {
            DocumentFormat::Toml => toml::to_string(value).map_err(|err| err.to_string()),
            DocumentFormat::Json => serde_json::to_string_pretty(value)
                .map(|mut out| {
                    out.push('\n');
                    out
                })
                .map_err(|err| err.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {format} document {path}: {reason}")]
    Decode {
        path: PathBuf,
        format: &'static str,
        reason: String,
    },

    #[error("cannot encode merged {format} document {path}: {reason}")]
    Encode {
        path: PathBuf,
        format: &'static str,
        reason: String,
    },

    #[error("{path} does not hold a {format} table at its root")]
    NotATable { path: PathBuf, format: &'static str },
}

/// Merge `overlay` into the document stored at `path` and rewrite the file.
///
/// No backup is kept. An empty overlay still rewrites the file, which
/// normalizes its formatting.
pub fn merge_overlay(
    path: impl AsRef<Path>,
    format: DocumentFormat,
    overlay: &Overlay,
) -> Result<(), DocumentError> {
    let path = path.as_ref();
    let mut document = load(path, format)?;
    deep_merge(&mut document, overlay);
    save(path, format, &document)
}

/// Read and decode a document. The root must be a table/object.
pub fn load(path: &Path, format: DocumentFormat) -> Result<Map<String, Value>, DocumentError> {
    let raw = fs::read_to_string(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value = format.decode(&raw).map_err(|reason| DocumentError::Decode {
        path: path.to_path_buf(),
        format: format.name(),
        reason,
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(DocumentError::NotATable {
            path: path.to_path_buf(),
            format: format.name(),
        }),
    }
}

pub fn save(
    path: &Path,
    format: DocumentFormat,
    document: &Map<String, Value>,
) -> Result<(), DocumentError> {
    let encoded = format
        .encode(document)
        .map_err(|reason| DocumentError::Encode {
            path: path.to_path_buf(),
            format: format.name(),
            reason,
        })?;
    fs::write(path, encoded).map_err(|source| DocumentError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Override-wins deep merge. Only mappings present on both sides are merged
/// recursively; any other overlay value, arrays included, replaces the base
/// value outright.
pub fn deep_merge(base: &mut Map<String, Value>, overlay: &Overlay) {
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => deep_merge(existing, nested),
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Build the single-path overlay `{a: {b: {c: value}}}` for `path = ["a", "b", "c"]`.
pub fn overlay_at(path: &[&str], value: Value) -> Overlay {
    let mut current = value;
    for key in path.iter().rev() {
        let mut map = Map::new();
        map.insert((*key).to_string(), current);
        current = Value::Object(map);
    }
    match current {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
