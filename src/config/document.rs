//! The application's storage file
//!
//! A flat JSON object whose four telemetry keys belong to this tool. Every
//! other key is carried through untouched, in its original order.

use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

use crate::atomic::write_atomic;
use crate::error::ResetError;
use crate::identity::IdentitySet;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
    entries: Map<String, Value>,
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn from_map(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Parse raw file content. Blank content is an empty document; anything
    /// else must be a UTF-8 JSON object.
    pub fn parse(path: &Path, contents: &[u8]) -> Result<Self, ResetError> {
        if contents.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::new());
        }

        let value: Value =
            serde_json::from_slice(contents).map_err(|source| ResetError::ConfigParseFailed {
                path: path.to_path_buf(),
                source,
            })?;

        match value {
            Value::Object(entries) => Ok(Self { entries }),
            other => Err(ResetError::ConfigNotObject {
                path: path.to_path_buf(),
                found: json_kind(&other),
            }),
        }
    }

    /// Load the storage file. A missing file is an empty document.
    pub fn load(path: &Path) -> Result<Self, ResetError> {
        let contents = match fs::read(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Storage file not found, starting from an empty document");
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(ResetError::ConfigReadFailed {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let document = Self::parse(path, &contents)?;
        debug!(path = %path.display(), keys = document.len(), "Loaded storage file");
        Ok(document)
    }

    /// Set the four telemetry keys, leaving everything else as it was
    pub fn patch(mut self, ids: &IdentitySet) -> Self {
        for (key, value) in ids.entries() {
            self.entries
                .insert(key.to_string(), Value::String(value.to_string()));
        }
        self
    }

    /// Two-space indented JSON text
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries)
    }

    /// Replace the storage file atomically; the old file stays intact on any failure
    pub fn save(&self, path: &Path) -> Result<(), ResetError> {
        let write_failed = |source: io::Error| ResetError::ConfigWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        let text = self
            .to_json_pretty()
            .map_err(|e| write_failed(io::Error::from(e)))?;
        write_atomic(path, text.as_bytes()).map_err(write_failed)?;

        info!(path = %path.display(), keys = self.len(), "Saved storage file");
        Ok(())
    }
}
