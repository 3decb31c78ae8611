//! Runtime settings for the reset tool
//!
//! Built once at startup from CLI flags, with environment variables filling
//! in anything the flags leave unset.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level as TraceLevel;

use crate::constants::env;
use crate::platform::Environment;

/// Rotate the device identifiers stored in Cursor's global storage file
#[derive(Parser, Debug)]
#[command(name = "cursor-reset", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Storage file to operate on instead of the platform default
    /// (or set CURSOR_RESET_STORAGE_PATH)
    #[arg(long, global = true)]
    pub storage_path: Option<PathBuf>,

    /// Generate and print identifiers without touching any file
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Leave the machineId file and state database alone
    #[arg(long, global = true)]
    pub storage_only: bool,

    /// Log progress to stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Back up the storage file and write fresh identifiers (default)
    Reset,
    /// Print the detected platform and storage file location
    Path,
}

/// Immutable settings for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub command: Command,
    pub storage_path: Option<PathBuf>,
    pub dry_run: bool,
    /// Skip the companion files next to the storage file
    pub storage_only: bool,
    pub log_level: TraceLevel,
}

fn parse_level(value: &str) -> TraceLevel {
    match value.to_lowercase().as_str() {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "info" => TraceLevel::INFO,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::WARN,
    }
}

impl Settings {
    /// Combine parsed flags with environment overrides. Flags win.
    pub fn from_cli(cli: Cli, environment: &dyn Environment) -> Self {
        let storage_path = cli.storage_path.or_else(|| {
            environment
                .var(env::STORAGE_PATH_OVERRIDE)
                .map(PathBuf::from)
        });

        let log_level = if cli.verbose {
            TraceLevel::INFO
        } else if cli.quiet {
            TraceLevel::ERROR
        } else {
            environment
                .var(env::LOG_LEVEL)
                .as_deref()
                .map(parse_level)
                .unwrap_or(TraceLevel::WARN)
        };

        Self {
            command: cli.command.unwrap_or(Command::Reset),
            storage_path,
            dry_run: cli.dry_run,
            storage_only: cli.storage_only,
            log_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::tests::FakeEnvironment;
    use std::path::Path;

    fn settings(args: &[&str], environment: &FakeEnvironment) -> Settings {
        let argv = std::iter::once("cursor-reset").chain(args.iter().copied());
        Settings::from_cli(Cli::try_parse_from(argv).unwrap(), environment)
    }

    #[test]
    fn test_no_arguments_means_reset() {
        let s = settings(&[], &FakeEnvironment::default());
        assert_eq!(s.command, Command::Reset);
        assert_eq!(s.storage_path, None);
        assert!(!s.dry_run);
        assert!(!s.storage_only);
        assert_eq!(s.log_level, TraceLevel::WARN);
    }

    #[test]
    fn test_subcommands() {
        let environment = FakeEnvironment::default();
        assert_eq!(settings(&["reset"], &environment).command, Command::Reset);
        assert_eq!(settings(&["path"], &environment).command, Command::Path);
        assert!(settings(&["reset", "--dry-run"], &environment).dry_run);
        assert!(settings(&["reset", "--storage-only"], &environment).storage_only);
        assert!(settings(&["--storage-only", "reset"], &environment).storage_only);
    }

    #[test]
    fn test_unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["cursor-reset", "explode"]).is_err());
    }

    #[test]
    fn test_storage_path_env_override() {
        let mut environment = FakeEnvironment::new("Linux", Path::new("/home/h"));
        environment.vars.insert(
            env::STORAGE_PATH_OVERRIDE.to_string(),
            "/tmp/from-env.json".to_string(),
        );

        let s = settings(&[], &environment);
        assert_eq!(s.storage_path, Some(PathBuf::from("/tmp/from-env.json")));

        let s = settings(&["--storage-path", "/tmp/from-flag.json"], &environment);
        assert_eq!(s.storage_path, Some(PathBuf::from("/tmp/from-flag.json")));
    }

    #[test]
    fn test_log_level_sources() {
        let mut environment = FakeEnvironment::default();
        environment
            .vars
            .insert(env::LOG_LEVEL.to_string(), "DEBUG".to_string());

        assert_eq!(settings(&[], &environment).log_level, TraceLevel::DEBUG);
        assert_eq!(settings(&["-v"], &environment).log_level, TraceLevel::INFO);
        assert_eq!(settings(&["--quiet"], &environment).log_level, TraceLevel::ERROR);
        assert!(Cli::try_parse_from(["cursor-reset", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_parse_level_falls_back_to_warn() {
        assert_eq!(parse_level("trace"), TraceLevel::TRACE);
        assert_eq!(parse_level("nonsense"), TraceLevel::WARN);
    }
}
