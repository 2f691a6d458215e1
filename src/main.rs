use args::{parse_args, Args, Command};
use compose_watcher::{
    cancel::{cancellation, listen_for_signals},
    config::ConfigError,
    credentials::{resolve, CredentialError},
    deploy::{compose::ComposeDeployer, DeployError},
    reconcile::{check_once, init, watch, CheckOptions, ReconcileError, WatchOptions},
    repository::{git::GitWorkspace, known_hosts::setup_known_hosts, RepositoryError},
};
use log::{error, info};
use logger::init_logger;
use std::{process, time::Duration};
use thiserror::Error;

mod args;
mod logger;

#[derive(Debug, Error)]
pub enum MainError {
    #[error("You have to pick a command: init, check or watch.")]
    MissingCommand,
    #[error("The interval has to be longer than zero.")]
    ZeroInterval,
    #[error("Failed to determine the local timezone offset.")]
    FailedLoggerTimezones,
    #[error("Failed to set up the logger: {0}.")]
    FailedLogger(#[from] log::SetLoggerError),
    #[error("Invalid configuration: {0}.")]
    Config(#[from] ConfigError),
    #[error("Invalid credentials: {0}.")]
    Credential(#[from] CredentialError),
    #[error("{0}.")]
    Repository(#[from] RepositoryError),
    #[error("{0}.")]
    Deploy(#[from] DeployError),
    #[error("{0}.")]
    Reconcile(#[from] ReconcileError),
}

fn main() {
    let args = parse_args();

    if args.version {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return;
    }

    if let Err(err) = init_logger(&args) {
        eprintln!("{err}");
        process::exit(1);
    }

    if let Err(err) = run(args) {
        error!("{err}");
        process::exit(1);
    }
}

fn run(mut args: Args) -> Result<(), MainError> {
    let command = args.command.take().ok_or(MainError::MissingCommand)?;

    // Validate everything before touching the network.
    let target = args.to_target()?;
    info!("Configuration: {}.", target.describe());
    let auth = resolve(&target.credential)?;
    if target.is_ssh() {
        setup_known_hosts(args.known_host.as_deref())?;
    }

    let deployer = ComposeDeployer::new(target.directory.clone(), &args.docker, &args.files)?;
    let branch = target.branch.clone();
    let workspace = GitWorkspace::new(target, auth);

    match command {
        Command::Init(_) => init(&workspace, &branch)?,
        Command::Check(check) => {
            let options = CheckOptions {
                force: check.force,
                up_flags: args.up_args,
            };
            check_once(&workspace, &deployer, &options)?;
        }
        Command::Watch(watch_args) => {
            let interval: Duration = watch_args.interval.into();
            if interval.is_zero() {
                return Err(MainError::ZeroInterval);
            }

            let (handle, cancellation) = cancellation();
            listen_for_signals(handle);

            let options = WatchOptions {
                branch,
                interval,
                on_start: watch_args.on_start,
                clone_first: watch_args.clone,
                up_flags: args.up_args,
            };
            let reason = watch(&workspace, &deployer, &options, &cancellation)?;
            info!("Finished running: {reason}.");
        }
    }

    Ok(())
}
