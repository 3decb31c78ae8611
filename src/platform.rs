//! Platform detection and storage file lookup
//!
//! All ambient OS inspection goes through the [`Environment`] trait so the
//! resolver can be exercised against any platform from tests.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::{env, kernel, paths};
use crate::error::ResetError;

/// Read-only view of the process environment
pub trait Environment {
    /// Kernel name in `uname -s` form (`Darwin`, `Linux`, `MINGW64_NT-10.0`, ...)
    fn kernel_name(&self) -> Option<String>;

    /// Kernel version string, used to spot WSL
    fn kernel_version(&self) -> Option<String>;

    fn var(&self, key: &str) -> Option<String>;

    fn home_dir(&self) -> Option<PathBuf>;
}

/// The real environment of the running process
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn kernel_name(&self) -> Option<String> {
        let name = match std::env::consts::OS {
            "macos" => kernel::DARWIN,
            "linux" => kernel::LINUX,
            "windows" => kernel::WINDOWS_NT,
            other => other,
        };
        Some(name.to_string())
    }

    fn kernel_version(&self) -> Option<String> {
        env::KERNEL_VERSION_FILES
            .iter()
            .find_map(|file| fs::read_to_string(file).ok())
    }

    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }

    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OsKind {
    Macos,
    Linux,
    Wsl,
    Windows,
    Unknown,
}

/// Where the storage file lives on this machine, derived once per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformProfile {
    #[serde(rename = "os")]
    pub os_kind: OsKind,
    /// `None` when no path could be resolved; always `None` for `Unknown`
    #[serde(rename = "storagePath")]
    pub config_path: Option<PathBuf>,
    /// Plain-text machine id file, rotated alongside the storage file
    #[serde(rename = "machineIdPath")]
    pub machine_id_path: Option<PathBuf>,
    /// SQLite state database mirroring the telemetry keys
    #[serde(rename = "stateDbPath")]
    pub state_db_path: Option<PathBuf>,
    #[serde(skip)]
    kernel_name: Option<String>,
}

impl PlatformProfile {
    /// The storage path, or the `platform` stage failure when there is none
    pub fn require_path(&self) -> Result<&Path, ResetError> {
        if self.os_kind == OsKind::Unknown {
            return Err(ResetError::UnsupportedPlatform {
                detail: format!(
                    "kernel '{}' is not macOS, Linux, WSL or Windows",
                    self.kernel_name.as_deref().unwrap_or("<none>")
                ),
            });
        }
        self.config_path
            .as_deref()
            .ok_or_else(|| ResetError::UnsupportedPlatform {
                detail: format!(
                    "no home or app-data directory available on {:?}",
                    self.os_kind
                ),
            })
    }

    /// Replace the resolved path with an explicit one.
    /// An `Unknown` platform keeps its empty path. An explicit storage path
    /// has no known siblings, so the companion files are dropped.
    pub fn with_override(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            if self.os_kind != OsKind::Unknown {
                self.config_path = Some(path);
                self.machine_id_path = None;
                self.state_db_path = None;
            }
        }
        self
    }
}

/// Classify the kernel name (and, for Linux, the kernel version)
pub fn detect_os(kernel_name: Option<&str>, kernel_version: Option<&str>) -> OsKind {
    let Some(name) = kernel_name else {
        return OsKind::Unknown;
    };

    if name == kernel::DARWIN {
        OsKind::Macos
    } else if name == kernel::LINUX {
        let is_wsl = kernel_version
            .map(|v| v.to_lowercase().contains(env::WSL_MARKER))
            .unwrap_or(false);
        if is_wsl { OsKind::Wsl } else { OsKind::Linux }
    } else if name == kernel::WINDOWS_NT
        || kernel::WINDOWS_SHELL_PREFIXES
            .iter()
            .any(|prefix| name.to_uppercase().starts_with(prefix))
    {
        OsKind::Windows
    } else {
        OsKind::Unknown
    }
}

fn absolute(path: PathBuf) -> Option<PathBuf> {
    path.is_absolute().then_some(path)
}

fn join_all(mut base: PathBuf, parts: &[&str]) -> PathBuf {
    base.extend(parts);
    base
}

/// Resolve the storage file for the running system
pub fn resolve(environment: &dyn Environment) -> PlatformProfile {
    let kernel_name = environment.kernel_name();
    let kernel_version = environment.kernel_version();
    let os_kind = detect_os(kernel_name.as_deref(), kernel_version.as_deref());

    let base = match os_kind {
        OsKind::Macos => environment
            .home_dir()
            .map(|home| join_all(home, &paths::MACOS_BASE)),
        OsKind::Linux | OsKind::Wsl => environment
            .home_dir()
            .map(|home| join_all(home, &paths::LINUX_BASE)),
        OsKind::Windows => environment
            .var(env::APPDATA)
            .map(PathBuf::from)
            .or_else(|| {
                environment
                    .home_dir()
                    .map(|home| join_all(home, &paths::WINDOWS_ROAMING_FALLBACK))
            }),
        OsKind::Unknown => None,
    };

    let base = base.and_then(absolute);
    let under_base = |suffix: &[&str]| base.clone().map(|base| join_all(base, suffix));
    let config_path = under_base(&paths::APP_SUFFIX);
    let machine_id_path = under_base(&paths::MACHINE_ID_SUFFIX);
    let state_db_path = under_base(&paths::STATE_DB_SUFFIX);

    debug!(os = ?os_kind, kernel = ?kernel_name, path = ?config_path, "Resolved platform");

    PlatformProfile {
        os_kind,
        config_path,
        machine_id_path,
        state_db_path,
        kernel_name,
    }
}
