//! Application-wide constants
//!
//! File locations, owned key names and formatting constants used throughout
//! the application, providing a single source of truth for constant values.

/// Storage file location relative to each platform's base directory
pub mod paths {
    /// Directory components shared by every platform below the base directory
    pub const APP_SUFFIX: [&str; 4] = ["Cursor", "User", "globalStorage", "storage.json"];

    /// Plain-text machine id file kept beside the user profile
    pub const MACHINE_ID_SUFFIX: [&str; 2] = ["Cursor", "machineId"];

    /// SQLite key/value store next to the storage file
    pub const STATE_DB_SUFFIX: [&str; 4] = ["Cursor", "User", "globalStorage", "state.vscdb"];

    /// macOS base directory, relative to the home directory
    pub const MACOS_BASE: [&str; 2] = ["Library", "Application Support"];

    /// Linux (and WSL) base directory, relative to the home directory
    pub const LINUX_BASE: [&str; 1] = [".config"];

    /// Windows roaming app-data fallback, relative to the home directory
    pub const WINDOWS_ROAMING_FALLBACK: [&str; 2] = ["AppData", "Roaming"];
}

/// Environment inspection constants
pub mod env {
    /// Windows roaming application data directory
    pub const APPDATA: &str = "APPDATA";

    /// Explicit storage path override
    pub const STORAGE_PATH_OVERRIDE: &str = "CURSOR_RESET_STORAGE_PATH";

    /// Log level selector
    pub const LOG_LEVEL: &str = "LOG_LEVEL";

    /// Kernel version files checked for the WSL marker, first readable wins
    pub const KERNEL_VERSION_FILES: [&str; 2] = ["/proc/sys/kernel/osrelease", "/proc/version"];

    /// Case-insensitive marker present in WSL kernel version strings
    pub const WSL_MARKER: &str = "microsoft";
}

/// Kernel names as reported by `uname -s`
pub mod kernel {
    pub const DARWIN: &str = "Darwin";
    pub const LINUX: &str = "Linux";
    pub const WINDOWS_NT: &str = "Windows_NT";

    /// Prefixes reported by Windows-hosted POSIX shells (Git Bash, MSYS2, Cygwin)
    pub const WINDOWS_SHELL_PREFIXES: [&str; 3] = ["MINGW", "MSYS", "CYGWIN"];
}

/// Telemetry keys owned by this tool inside the storage file
pub mod keys {
    pub const MACHINE_ID: &str = "telemetry.machineId";
    pub const MAC_MACHINE_ID: &str = "telemetry.macMachineId";
    pub const DEV_DEVICE_ID: &str = "telemetry.devDeviceId";
    pub const SQM_ID: &str = "telemetry.sqmId";

    pub const ALL: [&str; 4] = [MACHINE_ID, MAC_MACHINE_ID, DEV_DEVICE_ID, SQM_ID];
}

/// State database layout
pub mod state_db {
    pub const CREATE_TABLE: &str =
        "CREATE TABLE IF NOT EXISTS ItemTable (key TEXT PRIMARY KEY, value TEXT)";

    pub const UPSERT: &str = "INSERT OR REPLACE INTO ItemTable (key, value) VALUES (?1, ?2)";
}

/// Identifier shape constants
pub mod identity {
    /// Random bytes behind each 64-character hex machine identifier
    pub const MACHINE_ID_BYTES: usize = 32;

    /// Random bytes behind a UUID
    pub const UUID_BYTES: usize = 16;
}

/// Backup naming constants
pub mod backup {
    /// Marker appended to the original file name
    pub const SUFFIX_PREFIX: &str = ".backup_";

    /// Second-granularity timestamp format (chrono strftime syntax)
    pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

    /// Upper bound on same-second disambiguation attempts
    pub const MAX_COLLISIONS: u32 = 1000;
}
