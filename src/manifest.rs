//! Export of the highway list for external tooling.
//!
//! The manifest is a JSON array of `{ "name": ..., "usage": ... }` objects,
//! sorted by name. It is regenerated on every launch so that editor plugins
//! and shell completion can pick the current list up. Highway never reads it
//! back itself.

use std::fs;

use camino::Utf8Path;

use crate::error::ManifestError;
use crate::task::TaskDescriptor;

/// Default location relative to the project root.
pub const DEFAULT_PATH: &str = ".highway/highways.json";

pub fn to_json(descriptors: &[TaskDescriptor]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(descriptors)
}

pub fn from_json(json: &str) -> serde_json::Result<Vec<TaskDescriptor>> {
    serde_json::from_str(json)
}

pub fn write(path: &Utf8Path, descriptors: &[TaskDescriptor]) -> Result<(), ManifestError> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    fs::write(path, to_json(descriptors)?)?;
    Ok(())
}

pub fn read(path: &Utf8Path) -> Result<Vec<TaskDescriptor>, ManifestError> {
    let json = fs::read_to_string(path)?;
    Ok(from_json(&json)?)
}

/// Writes the manifest, logging instead of failing. Returns whether the file
/// was written.
pub fn export(path: &Utf8Path, descriptors: &[TaskDescriptor]) -> bool {
    match write(path, descriptors) {
        Ok(()) => {
            tracing::debug!(%path, count = descriptors.len(), "manifest written");
            true
        }
        Err(err) => {
            tracing::warn!(%path, "couldn't export highway manifest: {err}");
            false
        }
    }
}
