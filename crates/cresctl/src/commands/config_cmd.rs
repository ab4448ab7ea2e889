//! Config subcommand handlers.

use dialoguer::Input;

use cresctl_config::{self as config, Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::commands::util::prompt_err;
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("# unprintable: {e}")),
                |c| c.profiles.keys().cloned().collect::<Vec<_>>().join("\n"),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Init {
            name,
            poll_interval,
        } => {
            let host = match global.host.clone() {
                Some(host) => host,
                None => Input::<String>::new()
                    .with_prompt("Device host or address")
                    .interact_text()
                    .map_err(prompt_err)?,
            };
            if host.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "host".into(),
                    reason: "must not be empty".into(),
                });
            }

            let mut cfg: Config = config::load_config()?;
            let mut profile = Profile::new(host.trim());
            profile.poll_interval = poll_interval;
            cfg.profiles.insert(name.clone(), profile);
            if cfg
                .default_profile
                .as_ref()
                .is_none_or(|d| !cfg.profiles.contains_key(d))
            {
                cfg.default_profile = Some(name.clone());
            }

            let path = config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Profile '{name}' written to {}", path.display());
            }
            Ok(())
        }
    }
}
