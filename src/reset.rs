//! The reset pipeline
//!
//! resolve platform -> back up -> load -> patch -> save -> companions.
//! Strictly linear; the first failure ends the run with the storage file
//! untouched.

use std::path::PathBuf;
use tracing::info;

use crate::backup::{self, BackupArtifact};
use crate::companion::{self, CompanionUpdate};
use crate::config::{ConfigDocument, Settings};
use crate::error::ResetError;
use crate::identity::{IdentityGenerator, IdentitySet};
use crate::platform::{self, Environment, PlatformProfile};

/// What a successful reset did
#[derive(Debug)]
pub struct ResetOutcome {
    pub ids: IdentitySet,
    /// `None` for a dry run
    pub storage_path: Option<PathBuf>,
    /// `None` when there was nothing to back up, or on a dry run
    pub backup: Option<BackupArtifact>,
    /// Companion files rewritten after the storage file
    pub companions: Vec<CompanionUpdate>,
}

/// Resolve the platform, applying any configured path override
pub fn locate(
    settings: &Settings,
    environment: &dyn Environment,
) -> Result<PlatformProfile, ResetError> {
    let profile = platform::resolve(environment).with_override(settings.storage_path.clone());
    profile.require_path()?;
    Ok(profile)
}

pub fn run(
    settings: &Settings,
    environment: &dyn Environment,
    generator: &mut IdentityGenerator,
) -> Result<ResetOutcome, ResetError> {
    let profile = locate(settings, environment)?;
    let path = profile.require_path()?.to_path_buf();
    info!(os = ?profile.os_kind, path = %path.display(), "Located storage file");

    if settings.dry_run {
        info!("Dry run, leaving the storage file untouched");
        return Ok(ResetOutcome {
            ids: generator.generate(),
            storage_path: None,
            backup: None,
            companions: Vec::new(),
        });
    }

    let backup = backup::backup(&path)?;
    let document = ConfigDocument::load(&path)?;
    let ids = generator.generate();
    document.patch(&ids).save(&path)?;

    let companions = if settings.storage_only {
        Vec::new()
    } else {
        companion::update_all(&profile, &ids)?
    };

    Ok(ResetOutcome {
        ids,
        storage_path: Some(path),
        backup,
        companions,
    })
}
