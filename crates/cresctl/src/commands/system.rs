//! System command handlers.

use cresctl_core::{Coordinator, SystemInfo};

use crate::cli::GlobalOpts;
use crate::commands::util;
use crate::error::CliError;
use crate::output;

fn detail(info: &SystemInfo, device_type: &str) -> String {
    output::render_pairs([
        ("type", device_type.to_owned()),
        ("cpu-id", info.cpu_id.clone()),
        ("frequency", info.frequency.clone()),
        ("reset-cause", info.reset_cause.clone()),
        ("rescue-mode", info.rescue_mode.to_string()),
        ("debugging-enabled", info.debugging_enabled.to_string()),
        (
            "heap",
            format!(
                "{} free of {} (largest block {}, watermark {})",
                info.heap_free, info.heap_size, info.heap_largest_block, info.heap_watermark
            ),
        ),
        (
            "serial",
            if info.serial_enabled {
                format!("enabled @ {} baud", info.serial_baudrate)
            } else {
                "disabled".to_owned()
            },
        ),
    ])
}

pub async fn info(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    let device_type = coordinator.device_type().await?;
    let info = coordinator.system_info().await?;

    let out = output::render_single(
        &global.output,
        &info,
        |i| detail(i, &device_type),
        |i| i.cpu_id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn reboot(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    let address = &coordinator.config().address;
    if !util::confirm("reboot", &format!("Reboot device at {address}?"), global.yes)? {
        return Ok(());
    }
    coordinator.reboot().await?;
    if !global.quiet {
        eprintln!("Reboot requested for {address}");
    }
    Ok(())
}
