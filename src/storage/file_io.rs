//! File I/O utilities with atomic writes
//!
//! Every write lands in a sibling `*.tmp` file first and is renamed over the
//! target once flushed and synced, so readers see either the old or the new
//! content and never a truncated file.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::CaseError;

/// Read JSON from a file, returning `None` if the file doesn't exist
pub fn read_json_opt<T, P>(path: P) -> Result<Option<T>, CaseError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(CaseError::Io(format!(
                "Failed to open {}: {}",
                path.display(),
                e
            )))
        }
    };

    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .map(Some)
        .map_err(|e| CaseError::Io(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Write JSON to a file atomically (write to temp, then rename)
pub fn write_json_atomic<T, P>(path: P, data: &T) -> Result<(), CaseError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    ensure_parent_dir(path)?;

    let temp_path = temp_path_for(path);

    let result: Result<(), CaseError> = (|| {
        let file = File::create(&temp_path)
            .map_err(|e| CaseError::Io(format!("Failed to create temp file: {}", e)))?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, data)
            .map_err(|e| CaseError::Io(format!("Failed to serialize data: {}", e)))?;

        writer
            .flush()
            .map_err(|e| CaseError::Io(format!("Failed to flush data: {}", e)))?;

        writer
            .get_ref()
            .sync_all()
            .map_err(|e| CaseError::Io(format!("Failed to sync data: {}", e)))
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    rename_into_place(&temp_path, path)
}

/// Copy a file atomically (copy to temp next to the target, then rename)
///
/// Returns the number of bytes copied.
pub fn copy_file_atomic<P, Q>(from: P, to: Q) -> Result<u64, CaseError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let from = from.as_ref();
    let to = to.as_ref();
    ensure_parent_dir(to)?;

    let temp_path = temp_path_for(to);

    let result: Result<u64, CaseError> = (|| {
        let bytes = fs::copy(from, &temp_path).map_err(|e| {
            CaseError::Io(format!("Failed to copy {}: {}", from.display(), e))
        })?;

        File::open(&temp_path)
            .and_then(|f| f.sync_all())
            .map_err(|e| CaseError::Io(format!("Failed to sync copy: {}", e)))?;

        Ok(bytes)
    })();

    match result {
        Ok(bytes) => {
            rename_into_place(&temp_path, to)?;
            Ok(bytes)
        }
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            Err(e)
        }
    }
}

/// Temp file used while writing `path`: the full filename plus `.tmp`
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Create the directory holding `path` if it is missing
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<(), CaseError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                CaseError::Io(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }
    Ok(())
}

fn rename_into_place(temp_path: &Path, path: &Path) -> Result<(), CaseError> {
    fs::rename(temp_path, path).map_err(|e| {
        let _ = fs::remove_file(temp_path);
        CaseError::Io(format!("Failed to rename temp file: {}", e))
    })
}
