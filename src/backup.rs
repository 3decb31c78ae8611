//! Timestamped snapshots of files about to be rewritten
//!
//! A snapshot is taken before any mutation. A missing original is the normal
//! first-run case and produces no backup; failing to write a backup for an
//! existing original is fatal.

use chrono::{Local, NaiveDateTime};
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::backup::{MAX_COLLISIONS, SUFFIX_PREFIX, TIMESTAMP_FORMAT};
use crate::error::ResetError;

/// A copy of a file as it was before this run touched it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupArtifact {
    pub original: PathBuf,
    pub path: PathBuf,
}

/// `<path>.backup_<ts>` for attempt 0, `<path>.backup_<ts>_<n>` afterwards
fn candidate_path(original: &Path, stamp: &str, attempt: u32) -> PathBuf {
    let mut name = OsString::from(original.as_os_str());
    name.push(SUFFIX_PREFIX);
    name.push(stamp);
    if attempt > 0 {
        name.push(format!("_{attempt}"));
    }
    PathBuf::from(name)
}

/// Snapshot `path` using the current local time
pub fn backup(path: &Path) -> Result<Option<BackupArtifact>, ResetError> {
    backup_at(path, Local::now().naive_local())
}

/// Snapshot `path` using the given timestamp.
/// Never overwrites an existing file: same-second snapshots get a counter.
pub fn backup_at(
    path: &Path,
    timestamp: NaiveDateTime,
) -> Result<Option<BackupArtifact>, ResetError> {
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No existing file, skipping backup");
            return Ok(None);
        }
        Err(e) => {
            // Whoever reads the file next reports the failure
            debug!(path = %path.display(), error = %e, "File not readable, skipping backup");
            return Ok(None);
        }
    };

    let stamp = timestamp.format(TIMESTAMP_FORMAT).to_string();
    let write_failed = |source: io::Error| ResetError::BackupWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    for attempt in 0..MAX_COLLISIONS {
        let candidate = candidate_path(path, &stamp, attempt);
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(write_failed(e)),
        };

        if let Err(e) = file.write_all(&contents).and_then(|()| file.sync_all()) {
            drop(file);
            let _ = fs::remove_file(&candidate);
            return Err(write_failed(e));
        }

        if let Ok(metadata) = fs::metadata(path) {
            if let Err(e) = fs::set_permissions(&candidate, metadata.permissions()) {
                debug!(path = %candidate.display(), error = %e, "Could not copy permissions to backup");
            }
        }

        info!(path = %candidate.display(), bytes = contents.len(), "Created backup");
        return Ok(Some(BackupArtifact {
            original: path.to_path_buf(),
            path: candidate,
        }));
    }

    Err(write_failed(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("{MAX_COLLISIONS} backups already exist for timestamp {stamp}"),
    )))
}
