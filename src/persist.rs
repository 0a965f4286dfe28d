use std::fs;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::errors::{LedgerError, Result};

/// Writes `bytes` to a temporary file next to `path` and renames it into place,
/// so readers only ever see the old or the new content.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| LedgerError::file_system(dir, "directory creation", e))?;

    let mut temp = NamedTempFile::new_in(dir)
        .map_err(|e| LedgerError::file_system(dir, "temporary file creation", e))?;
    temp.write_all(bytes)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| LedgerError::file_system(temp.path(), "temporary file write", e))?;
    temp.persist(path)
        .map_err(|e| LedgerError::file_system(path, "rename into place", e.error))?;

    log::debug!("Wrote {}", path.display());
    Ok(())
}

/// Serializes `value` as pretty JSON and writes it atomically.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut json = serde_json::to_vec_pretty(value).map_err(|e| LedgerError::Serialization {
        path: path.to_path_buf(),
        source: e,
    })?;
    json.push(b'\n');
    write_atomic(path, &json)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| LedgerError::file_system(path, "file read", e))?;
    serde_json::from_slice(&bytes).map_err(|e| LedgerError::Serialization {
        path: path.to_path_buf(),
        source: e,
    })
}
