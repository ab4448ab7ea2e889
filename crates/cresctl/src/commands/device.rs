//! Device command handlers: test, status, watch, get, set, fan.

use serde::Serialize;
use tabled::Tabled;

use cresctl_core::model::display_name;
use cresctl_core::{Attributes, Category, Coordinator, CycleOutcome, Snapshot, Value};

use crate::cli::{FanArgs, FanCommand, GetArgs, GlobalOpts, OutputFormat, SetArgs, StatusArgs};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Tabled)]
struct DeviceRow {
    #[tabled(rename = "Category")]
    category: Category,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Values")]
    values: String,
}

fn format_attributes(attrs: &Attributes) -> String {
    attrs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn rows(snapshot: &Snapshot) -> Vec<DeviceRow> {
    snapshot
        .categories
        .iter()
        .flat_map(|(category, devices)| {
            devices.iter().map(|(id, attrs)| DeviceRow {
                category: *category,
                id: id.clone(),
                name: display_name(*category, id),
                values: format_attributes(attrs),
            })
        })
        .collect()
}

fn filtered(snapshot: &Snapshot, category: Option<Category>) -> Snapshot {
    let mut copy = snapshot.clone();
    if let Some(category) = category {
        copy.categories.retain(|c, _| *c == category);
    }
    copy
}

fn cycle_line(snapshot: &Snapshot, color: bool) -> String {
    let when = snapshot
        .refreshed_at
        .map_or_else(|| "never".to_owned(), |t| t.format("%H:%M:%S").to_string());
    let status = match &snapshot.last_cycle {
        None | Some(CycleOutcome::Ok) => output::status_label(true, "ok", color),
        Some(CycleOutcome::Failed { failures }) => {
            let which = failures
                .iter()
                .map(|f| f.category.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            output::status_label(false, &format!("failed: {which}"), color)
        }
    };
    format!("refreshed {when}  {status}")
}

fn render_snapshot(snapshot: &Snapshot, global: &GlobalOpts) -> Result<String, CliError> {
    match global.output {
        OutputFormat::Table => {
            let table = output::render_list(&global.output, &rows(snapshot), Clone::clone, |_| {
                String::new()
            })?;
            let color = output::should_color(&global.color);
            Ok(format!("{}\n{table}", cycle_line(snapshot, color)))
        }
        OutputFormat::Plain => output::render_list(
            &global.output,
            &rows(snapshot),
            Clone::clone,
            |r| format!("{}\t{}\t{}", r.category, r.id, r.values),
        ),
        _ => output::render_single(
            &global.output,
            snapshot,
            |_| String::new(),
            |_| String::new(),
        ),
    }
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn test(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    let address = coordinator.config().address.clone();
    if !coordinator.test_connection().await {
        return Err(CliError::Unreachable { address });
    }
    let color = output::should_color(&global.color);
    output::print_output(
        &format!("{address}: {}", output::status_label(true, "reachable", color)),
        global.quiet,
    );
    Ok(())
}

pub async fn status(
    coordinator: &Coordinator,
    args: StatusArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    coordinator.start().await?;
    let snapshot = filtered(&coordinator.snapshot(), args.category);
    coordinator.stop().await;

    let out = render_snapshot(&snapshot, global)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Print every published snapshot until Ctrl-C.
pub async fn watch(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    coordinator.start().await?;
    let mut rx = coordinator.subscribe();
    output::print_output(&render_snapshot(&rx.borrow_and_update(), global)?, global.quiet);

    let result = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => break signal.map_err(CliError::from),
            changed = rx.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let snapshot = rx.borrow_and_update().clone();
                match render_snapshot(&snapshot, global) {
                    Ok(out) => output::print_output(&out, global.quiet),
                    Err(e) => break Err(e),
                }
            }
        }
    };

    coordinator.stop().await;
    result
}

#[derive(Debug, Serialize)]
struct FieldValue {
    category: Category,
    instance: String,
    field: String,
    value: Value,
}

fn print_field(value: &FieldValue, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(
        &global.output,
        value,
        |v| format!("{}/{} {} = {}", v.category, v.instance, v.field, v.value),
        |v| v.value.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Sensor instances only exist after discovery.
async fn prepare(coordinator: &Coordinator, category: Category) -> Result<(), CliError> {
    if category == Category::Sensor {
        coordinator.start().await?;
    }
    Ok(())
}

pub async fn get(
    coordinator: &Coordinator,
    args: GetArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    prepare(coordinator, args.category).await?;
    let value = coordinator
        .get_value(args.category, &args.instance, &args.field)
        .await?;
    coordinator.stop().await;

    print_field(
        &FieldValue {
            category: args.category,
            instance: args.instance,
            field: args.field,
            value,
        },
        global,
    )
}

pub async fn set(
    coordinator: &Coordinator,
    args: SetArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    prepare(coordinator, args.category).await?;
    let value = coordinator
        .parse_value(args.category, &args.instance, &args.field, &args.value)
        .await?;
    let confirmed = coordinator
        .set_value(args.category, &args.instance, &args.field, value)
        .await?;
    coordinator.stop().await;

    print_field(
        &FieldValue {
            category: args.category,
            instance: args.instance,
            field: args.field,
            value: confirmed,
        },
        global,
    )
}

pub async fn fan(
    coordinator: &Coordinator,
    args: FanArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (field, value): (&str, Value) = match args.command {
        FanCommand::On => ("enabled", coordinator.set_fan_enabled(true).await?.into()),
        FanCommand::Off => ("enabled", coordinator.set_fan_enabled(false).await?.into()),
        FanCommand::Duty { percent } => (
            "duty-cycle",
            coordinator.set_fan_duty_cycle(percent).await?.into(),
        ),
        FanCommand::Min { percent } => (
            "duty-cycle-min",
            coordinator.set_fan_duty_cycle_min(percent).await?.into(),
        ),
    };

    print_field(
        &FieldValue {
            category: Category::Fan,
            instance: "fan".into(),
            field: field.into(),
            value,
        },
        global,
    )
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use indexmap::IndexMap;

    use super::*;

    #[test]
    fn rows_follow_category_then_instance_order() {
        let mut outputs = IndexMap::new();
        let mut attrs = Attributes::new();
        attrs.insert("enabled".into(), Value::Bool(true));
        attrs.insert("voltage".into(), Value::Float(5.0));
        outputs.insert("b".to_owned(), attrs.clone());
        outputs.insert("a".to_owned(), attrs);
        let mut categories = BTreeMap::new();
        categories.insert(Category::Output, outputs);
        let snapshot = Snapshot {
            categories,
            ..Snapshot::default()
        };

        let rows = rows(&snapshot);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Output-b");
        assert_eq!(rows[1].values, "enabled=true voltage=5");
    }

    #[test]
    fn filter_keeps_only_requested_category() {
        let mut categories = BTreeMap::new();
        categories.insert(Category::Fan, IndexMap::new());
        categories.insert(Category::Switch, IndexMap::new());
        let snapshot = Snapshot {
            categories,
            ..Snapshot::default()
        };
        let only = filtered(&snapshot, Some(Category::Switch));
        assert_eq!(only.categories.keys().copied().collect::<Vec<_>>(), [Category::Switch]);
        assert_eq!(filtered(&snapshot, None).categories.len(), 2);
    }
}
