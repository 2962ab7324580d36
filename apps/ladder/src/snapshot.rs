//! # Snapshot Files
//!
//! JSON ledger snapshots, used by the `file` backend and by `export`.
//!
//! Writes go to a sibling temp file and are renamed into place, so a crash
//! mid-write leaves the previous snapshot intact.

use ladder_core::{LadderError, LedgerSnapshot};
use std::path::{Path, PathBuf};

/// Maximum size of a snapshot file (500 MB).
pub const MAX_SNAPSHOT_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Read and decode a snapshot, refusing oversized files.
pub fn read(path: &Path) -> Result<LedgerSnapshot, LadderError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| LadderError::Io(format!("cannot read '{}': {}", path.display(), e)))?;
    if metadata.len() > MAX_SNAPSHOT_FILE_SIZE {
        return Err(LadderError::Validation(format!(
            "snapshot size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_SNAPSHOT_FILE_SIZE
        )));
    }

    let data = std::fs::read(path)
        .map_err(|e| LadderError::Io(format!("cannot read '{}': {}", path.display(), e)))?;
    serde_json::from_slice(&data)
        .map_err(|e| LadderError::Serialization(format!("invalid snapshot: {}", e)))
}

/// Encode `snapshot` and atomically replace the file at `path`.
pub fn write(snapshot: &LedgerSnapshot, path: &Path) -> Result<(), LadderError> {
    let data = serde_json::to_vec_pretty(snapshot)
        .map_err(|e| LadderError::Serialization(format!("encode snapshot: {}", e)))?;

    let staging = staging_path(path);
    std::fs::write(&staging, data)
        .map_err(|e| LadderError::Io(format!("cannot write '{}': {}", staging.display(), e)))?;
    std::fs::rename(&staging, path).map_err(|e| {
        LadderError::Io(format!(
            "cannot move '{}' to '{}': {}",
            staging.display(),
            path.display(),
            e
        ))
    })
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_replaces_without_leaving_staging_file() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("ledger.json");

        write(&LedgerSnapshot::default(), &path).expect("first write");
        write(&LedgerSnapshot::default(), &path).expect("second write");

        assert_eq!(read(&path).expect("read"), LedgerSnapshot::default());
        assert!(!dir.path().join("ledger.json.tmp").exists());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = TempDir::new().expect("tempdir");
        assert!(matches!(
            read(&dir.path().join("absent.json")),
            Err(LadderError::Io(_))
        ));
    }
}
