#![forbid(unsafe_code)]

mod atomic;
mod backup;
mod companion;
mod config;
mod constants;
mod error;
mod identity;
mod platform;
mod report;
mod reset;

use anyhow::Result;
use clap::Parser;
use std::io;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::FmtSubscriber;

use config::settings::Cli;
use config::{Command, Settings};
use identity::{EntropySource, IdentityGenerator};
use platform::SystemEnvironment;

fn init_logging(settings: &Settings) -> Result<()> {
    // stdout is reserved for the JSON summary
    let subscriber = FmtSubscriber::builder()
        .with_max_level(settings.log_level)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn main() -> ExitCode {
    let environment = SystemEnvironment;
    let settings = Settings::from_cli(Cli::parse(), &environment);

    if let Err(e) = init_logging(&settings) {
        eprintln!("warning: logging disabled: {e:#}");
    }
    info!(command = ?settings.command, dry_run = settings.dry_run, "Starting");

    let (mut stdout, mut stderr) = (io::stdout().lock(), io::stderr());
    let code = match settings.command {
        Command::Path => {
            let outcome = reset::locate(&settings, &environment);
            report::report(&outcome, &mut stdout, &mut stderr)
        }
        Command::Reset => {
            let mut generator = IdentityGenerator::new(EntropySource::detect());
            info!(source = %generator.source(), secure = generator.source().is_secure(), "Entropy source selected");
            let outcome = reset::run(&settings, &environment, &mut generator)
                .inspect(|done| {
                    if let Some(path) = &done.storage_path {
                        info!(path = %path.display(), "Storage file updated");
                    }
                    if let Some(backup) = &done.backup {
                        info!(path = %backup.path.display(), "Previous storage file kept as backup");
                    }
                    for update in &done.companions {
                        let backup = update.backup.as_ref().map(|b| b.path.display().to_string());
                        info!(path = %update.path.display(), backup = ?backup, "Companion file updated");
                    }
                })
                .inspect_err(|e| debug!(stage = %e.stage(), error = ?e, "Reset failed"))
                .map(|done| done.ids);
            report::report(&outcome, &mut stdout, &mut stderr)
        }
    };

    ExitCode::from(code)
}
