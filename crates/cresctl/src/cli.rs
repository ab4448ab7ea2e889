//! Clap derive structures for the `cresctl` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use cresctl_core::Category;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// cresctl -- command-line client for CresControl grow controllers
#[derive(Debug, Parser)]
#[command(
    name = "cresctl",
    version,
    about = "Monitor and control CresControl devices from the command line",
    long_about = "Talks to a CresControl controller over its local HTTP command endpoint.\n\n\
        Reads sensors, fan, analog outputs and inputs, and power switches,\n\
        and writes individual settings.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Device profile to use
    #[arg(long, short = 'p', env = "CRESCTL_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Device host or URL (overrides profile)
    #[arg(long, short = 'H', env = "CRESCTL_HOST", global = true)]
    pub host: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CRESCTL_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "CRESCTL_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check that the device answers
    #[command(alias = "ping")]
    Test,

    /// Scan the device and show every category
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Poll the device and print each refresh until interrupted
    Watch(WatchArgs),

    /// Read one field from the device
    Get(GetArgs),

    /// Write one field on the device
    Set(SetArgs),

    /// Control the fan
    Fan(FanArgs),

    /// Show system information
    Info,

    /// Reboot the device
    Reboot,

    /// Manage configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Device commands ──────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Only show one category (sensor, fan, output, input, switch)
    pub category: Option<Category>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Poll interval in seconds (overrides profile)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Category (sensor, fan, output, input, switch, system)
    pub category: Category,
    /// Instance id (e.g. "a", "12v", "fan")
    pub instance: String,
    /// Field name (e.g. "voltage", "duty-cycle")
    pub field: String,
}

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Category (fan, output, input, switch, system)
    pub category: Category,
    /// Instance id
    pub instance: String,
    /// Field name
    pub field: String,
    /// New value (numbers, or 1/0/true/false/on/off)
    pub value: String,
}

#[derive(Debug, Args)]
pub struct FanArgs {
    #[command(subcommand)]
    pub command: FanCommand,
}

#[derive(Debug, Subcommand)]
pub enum FanCommand {
    /// Turn the fan on
    On,
    /// Turn the fan off (also sets duty cycle to 0)
    Off,
    /// Set the duty cycle in percent
    Duty {
        #[arg(value_parser = parse_percent)]
        percent: f64,
    },
    /// Set the minimum duty cycle in percent
    Min {
        #[arg(value_parser = parse_percent)]
        percent: f64,
    },
}

fn parse_percent(raw: &str) -> Result<f64, String> {
    let v: f64 = raw.parse().map_err(|_| format!("'{raw}' is not a number"))?;
    if (0.0..=100.0).contains(&v) {
        Ok(v)
    } else {
        Err(format!("{v} is outside 0-100"))
    }
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show,
    /// Print the config file path
    Path,
    /// Create or update a profile from --host, prompting when it is omitted
    Init {
        /// Profile name
        #[arg(long, default_value = "default")]
        name: String,
        /// Poll interval in seconds
        #[arg(long)]
        poll_interval: Option<u64>,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
