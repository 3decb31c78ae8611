//! Files outside the storage file that also carry the device identity
//!
//! Cursor keeps a plain-text `machineId` file and mirrors the telemetry keys
//! into the `ItemTable` of its `state.vscdb` SQLite database. Both are only
//! updated when they already exist; each is backed up before it is touched.

use rusqlite::{Connection, OpenFlags, params};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::atomic::write_atomic;
use crate::backup::{self, BackupArtifact};
use crate::constants::state_db;
use crate::error::ResetError;
use crate::identity::IdentitySet;
use crate::platform::PlatformProfile;

/// A companion file that was rewritten
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanionUpdate {
    pub path: PathBuf,
    pub backup: Option<BackupArtifact>,
}

fn exists(path: &Path) -> bool {
    match fs::symlink_metadata(path) {
        Ok(_) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        // Let the backup read surface anything stranger
        Err(_) => true,
    }
}

/// Back up `path` before mutation. `None` means the file could not be read
/// and must be left alone.
fn snapshot(path: &Path) -> Result<Option<BackupArtifact>, ResetError> {
    let artifact = backup::backup(path)?;
    if artifact.is_none() {
        warn!(path = %path.display(), "Companion file exists but is unreadable, leaving it alone");
    }
    Ok(artifact)
}

/// Replace the machine id file with the new device id
pub fn update_machine_id(
    path: &Path,
    ids: &IdentitySet,
) -> Result<Option<CompanionUpdate>, ResetError> {
    if !exists(path) {
        debug!(path = %path.display(), "No machine id file");
        return Ok(None);
    }
    let Some(backup) = snapshot(path)? else {
        return Ok(None);
    };

    write_atomic(path, ids.dev_device_id.as_bytes()).map_err(|source| {
        ResetError::MachineIdWriteFailed {
            path: path.to_path_buf(),
            source,
        }
    })?;

    info!(path = %path.display(), "Machine id file updated");
    Ok(Some(CompanionUpdate {
        path: path.to_path_buf(),
        backup: Some(backup),
    }))
}

fn upsert_ids(path: &Path, ids: &IdentitySet) -> rusqlite::Result<()> {
    let mut conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)?;
    let tx = conn.transaction()?;
    tx.execute_batch(state_db::CREATE_TABLE)?;
    for (key, value) in ids.entries() {
        tx.execute(state_db::UPSERT, params![key, value])?;
    }
    tx.commit()
}

/// Upsert the telemetry keys into the state database in one transaction
pub fn update_state_db(
    path: &Path,
    ids: &IdentitySet,
) -> Result<Option<CompanionUpdate>, ResetError> {
    if !exists(path) {
        debug!(path = %path.display(), "No state database");
        return Ok(None);
    }
    let Some(backup) = snapshot(path)? else {
        return Ok(None);
    };

    upsert_ids(path, ids).map_err(|source| ResetError::StateDbFailed {
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = %path.display(), "State database updated");
    Ok(Some(CompanionUpdate {
        path: path.to_path_buf(),
        backup: Some(backup),
    }))
}

/// Update every companion file the profile knows about
pub fn update_all(
    profile: &PlatformProfile,
    ids: &IdentitySet,
) -> Result<Vec<CompanionUpdate>, ResetError> {
    let mut updates = Vec::new();
    if let Some(path) = &profile.machine_id_path {
        updates.extend(update_machine_id(path, ids)?);
    }
    if let Some(path) = &profile.state_db_path {
        updates.extend(update_state_db(path, ids)?);
    }
    Ok(updates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::keys;
    use crate::error::Stage;
    use crate::identity::{EntropySource, IdentityGenerator};
    use crate::platform::tests::FakeEnvironment;

    fn ids() -> IdentitySet {
        IdentityGenerator::new(EntropySource::detect()).generate()
    }

    fn read_item(path: &Path, key: &str) -> Option<String> {
        let conn = Connection::open(path).unwrap();
        conn.query_row(
            "SELECT value FROM ItemTable WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .ok()
    }

    #[test]
    fn test_machine_id_file_replaced_after_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("machineId");
        fs::write(&path, "old-machine-id").unwrap();
        let ids = ids();

        let update = update_machine_id(&path, &ids).unwrap().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), ids.dev_device_id);
        let backup = update.backup.unwrap();
        assert_eq!(fs::read_to_string(&backup.path).unwrap(), "old-machine-id");
    }

    #[test]
    fn test_missing_companions_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let ids = ids();

        assert_eq!(update_machine_id(&dir.path().join("machineId"), &ids).unwrap(), None);
        assert_eq!(update_state_db(&dir.path().join("state.vscdb"), &ids).unwrap(), None);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_state_db_keys_upserted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.vscdb");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(state_db::CREATE_TABLE).unwrap();
            conn.execute(state_db::UPSERT, params!["workbench.theme", "dark"]).unwrap();
            conn.execute(state_db::UPSERT, params![keys::MACHINE_ID, "old"]).unwrap();
        }
        let before = fs::read(&path).unwrap();
        let ids = ids();

        let update = update_state_db(&path, &ids).unwrap().unwrap();

        assert_eq!(read_item(&path, keys::MACHINE_ID), Some(ids.machine_id.clone()));
        assert_eq!(read_item(&path, keys::SQM_ID), Some(ids.sqm_id.clone()));
        assert_eq!(read_item(&path, "workbench.theme"), Some("dark".to_string()));
        assert_eq!(fs::read(update.backup.unwrap().path).unwrap(), before);
    }

    #[test]
    fn test_state_db_without_item_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.vscdb");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE other (x INTEGER)")
            .unwrap();
        let ids = ids();

        update_state_db(&path, &ids).unwrap();

        assert_eq!(
            read_item(&path, keys::DEV_DEVICE_ID),
            Some(ids.dev_device_id.clone())
        );
    }

    #[test]
    fn test_corrupt_state_db_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.vscdb");
        let garbage = vec![0x5a_u8; 4096];
        fs::write(&path, &garbage).unwrap();

        let err = update_state_db(&path, &ids()).unwrap_err();

        assert!(matches!(err, ResetError::StateDbFailed { .. }));
        assert_eq!(err.stage(), Stage::Save);
        assert_eq!(fs::read(&path).unwrap(), garbage);
    }

    #[test]
    fn test_update_all_follows_profile() {
        let home = tempfile::tempdir().unwrap();
        let environment = FakeEnvironment::new("Linux", home.path());
        let profile = crate::platform::resolve(&environment);
        let machine_id = profile.machine_id_path.clone().unwrap();
        fs::create_dir_all(machine_id.parent().unwrap()).unwrap();
        fs::write(&machine_id, "old").unwrap();
        let ids = ids();

        let updates = update_all(&profile, &ids).unwrap();

        // state.vscdb does not exist, so only the machine id file changes
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].path, machine_id);
        assert_eq!(fs::read_to_string(&machine_id).unwrap(), ids.dev_device_id);
        assert!(!profile.state_db_path.unwrap().exists());
    }
}
