// src/bin/run-shell.rs

use anyhow::{Context, Result};
use clap::{Parser, error::ErrorKind};
use colored::*;
use log::LevelFilter;
use run_shell::{
    cli::Cli,
    core::config_loader,
    system::{
        session::{self, SessionError},
        shell::ShellResolver,
        supervisor::SystemProcesses,
    },
    t,
};
use std::convert::Infallible;

/// The main entry point of `run-shell`.
///
/// On success the process image is replaced by a shell and nothing after the
/// call to `run` ever executes. Every way back here is a failure.
fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            // `--help` and `--version` print to stdout and exit with 0.
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                std::process::exit(1);
            }
        },
    };

    match run(cli) {
        Ok(never) => match never {},
        Err(e) => {
            // --- Centralized Error Handling ---
            eprintln!("{}: {:#}", t!("main.error.prefix").red().bold(), e);
            if let Some(SessionError::Supervisor(err)) = e.downcast_ref::<SessionError>() {
                if err.is_internal() {
                    eprintln!("\n{}", t!("supervisor.error.internal"));
                }
            }
            std::process::exit(1);
        }
    }
}

/// Sets up logging. `--verbose` turns on our debug records; `RUST_LOG` still wins.
fn init_logger(verbose: bool) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn,run_shell=debug"))
        .format_timestamp(None)
        .init();
    set_verbose(verbose);
}

/// Gates our debug records by the global max level, so a `verbose = true`
/// from the config file can still switch them on after the logger is up.
fn set_verbose(verbose: bool) {
    if std::env::var_os(env_logger::DEFAULT_FILTER_ENV).is_some() {
        return;
    }
    log::set_max_level(if verbose { LevelFilter::Debug } else { LevelFilter::Warn });
}

fn run(cli: Cli) -> Result<Infallible> {
    init_logger(cli.verbose);

    let config = config_loader::resolve_run_config(cli.run_config(), cli.config.as_deref())
        .context("Failed to load configuration")?;
    if config.verbose && !cli.verbose {
        set_verbose(true);
    }
    log::debug!("Run configuration: {:?}", config);

    let resolver = ShellResolver::new();
    Ok(session::run_session(&config, &resolver, SystemProcesses)?)
}
