//! Command dispatch: bridges CLI args to coordinator calls and output formatting.

pub mod config_cmd;
pub mod device;
pub mod system;
pub mod util;

use cresctl_core::Coordinator;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a device-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    coordinator: &Coordinator,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Test => device::test(coordinator, global).await,
        Command::Status(args) => device::status(coordinator, args, global).await,
        Command::Watch(_) => device::watch(coordinator, global).await,
        Command::Get(args) => device::get(coordinator, args, global).await,
        Command::Set(args) => device::set(coordinator, args, global).await,
        Command::Fan(args) => device::fan(coordinator, args, global).await,
        Command::Info => system::info(coordinator, global).await,
        Command::Reboot => system::reboot(coordinator, global).await,
        // Handled before a coordinator exists
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
