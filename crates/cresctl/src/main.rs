mod cli;
mod commands;
mod error;
mod output;

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cresctl_config::{Config, ConfigError, Profile};
use cresctl_core::{Coordinator, CoordinatorConfig, DEFAULT_POLL_INTERVAL};

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't touch the device
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "cresctl", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let mut config = build_coordinator_config(&cli.global)?;
            config.poll_interval = match &cmd {
                Command::Watch(args) => watch_interval(args.interval, config.poll_interval),
                _ => Duration::ZERO,
            };
            tracing::debug!(command = ?cmd, address = %config.address, "dispatching command");
            let coordinator = Coordinator::new(config)?;
            commands::dispatch(cmd, &coordinator, &cli.global).await
        }
    }
}

/// Build a `CoordinatorConfig` from the config file, profile, and CLI overrides.
fn build_coordinator_config(global: &GlobalOpts) -> Result<CoordinatorConfig, CliError> {
    let cfg = cresctl_config::load_config()?;
    resolve_profile(&cfg, global)
}

/// One-shot commands never poll. `watch` always does, falling back to the
/// default interval when the profile disables polling.
fn watch_interval(flag: Option<u64>, profile: Duration) -> Duration {
    let interval = flag.map_or(profile, Duration::from_secs);
    if interval.is_zero() {
        DEFAULT_POLL_INTERVAL
    } else {
        interval
    }
}

fn resolve_profile(cfg: &Config, global: &GlobalOpts) -> Result<CoordinatorConfig, CliError> {
    let mut profile = match cfg.profile(global.profile.as_deref()) {
        Ok((_, profile)) => profile.clone(),
        // An explicitly named profile must exist
        Err(ConfigError::UnknownProfile { profile }) if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile,
                available: available_profiles(cfg),
            });
        }
        Err(e) => {
            if global.host.is_none() {
                return Err(match e {
                    ConfigError::UnknownProfile { .. } => CliError::NoConfig {
                        path: cresctl_config::config_path().display().to_string(),
                    },
                    other => other.into(),
                });
            }
            Profile::default()
        }
    };

    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }
    if global.timeout.is_some() {
        profile.timeout = global.timeout;
    }

    Ok(cresctl_config::profile_to_coordinator_config(
        &profile,
        &cfg.defaults,
    )?)
}

fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}
