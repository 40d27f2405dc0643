//! tls-bringup - Main entry point

use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use tlsbringup::cli::Cli;
use tlsbringup::pipeline::{ExitReason, Pipeline};
use tlsbringup::process_guard::{init_signal_handlers, ChildRegistry};
use tlsbringup::runner::SystemRunner;
use tlsbringup::sanity::verify_environment;
use tlsbringup::settings::Settings;
use tlsbringup::{FsBackup, FsTemplater, TerminalConsole};

/// Logs go to stderr so they never interleave with prompts on stdout.
/// `RUST_LOG` overrides the level chosen on the command line.
fn init_logger(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => {
            info!("Loading settings from {:?}", path);
            Settings::load_from_file(path)?
        }
        None => Settings::default(),
    };
    if cli.staging {
        settings.staging = true;
    }
    if let Some(dir) = &cli.template_dir {
        settings.template_dir = dir.clone();
    }
    settings.validate()?;
    Ok(settings)
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logger(cli.log_level());
    info!("tls-bringup starting up");

    let registry = ChildRegistry::shared();
    if let Err(e) = init_signal_handlers(registry.clone()) {
        warn!("Failed to initialize signal handlers: {}", e);
    }
    debug!("Signal handlers initialized");

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load settings: {:#}", e);
            eprintln!("Failed to load settings: {:#}", e);
            return ExitReason::SettingsInvalid.into();
        }
    };

    if cli.print_config {
        match serde_json::to_string_pretty(&settings) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize settings: {}", e);
                return ExitReason::SettingsInvalid.into();
            }
        }
        return ExitCode::SUCCESS;
    }

    if let Some(path) = &cli.save_config {
        if let Err(e) = settings.save_to_file(path) {
            error!("Failed to save settings: {:#}", e);
            eprintln!("Failed to save settings: {:#}", e);
            return ExitReason::SettingsInvalid.into();
        }
        println!("Settings written to {}", path.display());
        return ExitCode::SUCCESS;
    }

    let home = std::env::var_os("HOME").map(PathBuf::from);
    let runner = SystemRunner::new(registry);
    let templater = FsTemplater;
    let backup = FsBackup::new(settings.backup_dir_name.clone());
    let mut console = TerminalConsole::stdio();
    let mut pipeline = Pipeline::new(&settings, home, &runner, &templater, &backup, &mut console);

    if let Err(exit) = pipeline.require_home() {
        return exit.into();
    }

    let preflight = verify_environment(&settings, cli.skip_root_check);
    if !preflight.is_ok() {
        eprintln!("{}", preflight.report());
        return ExitReason::PreflightFailed.into();
    }

    let exit = pipeline.run();

    if exit.is_success() {
        info!("tls-bringup finished: {}", exit);
    } else {
        warn!("tls-bringup stopped: {} (exit code {})", exit, exit.code());
    }
    exit.into()
}
