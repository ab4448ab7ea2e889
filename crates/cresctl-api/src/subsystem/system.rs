// Device-level information and controls under `system:`.

use serde::Serialize;
use tracing::info;

use super::{InstanceSet, Subsystem};
use crate::client::CresClient;
use crate::codec::{self, Op};
use crate::error::Error;
use crate::model::{
    Category, Field, FieldKind, Instance, InstanceState, Value, expect_bool, expect_f64,
    expect_text,
};

pub const SYSTEM_ID: &str = "system";

pub const CPU_ID: &str = "cpu-id";
pub const RESET_CAUSE: &str = "reset-cause";
pub const FREQUENCY: &str = "frequency";
pub const RESCUE_MODE: &str = "rescue-mode";
pub const DEBUGGING_ENABLED: &str = "debugging-enabled";
pub const HEAP_SIZE: &str = "heap:size";
pub const HEAP_FREE: &str = "heap:free";
pub const HEAP_LARGEST_BLOCK: &str = "heap:largest-block";
pub const HEAP_WATERMARK: &str = "heap:watermark";
pub const SERIAL_ENABLED: &str = "serial:enabled";
pub const SERIAL_BAUDRATE: &str = "serial:baudrate";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemInfo {
    pub cpu_id: String,
    pub reset_cause: String,
    pub frequency: String,
    pub rescue_mode: bool,
    pub debugging_enabled: bool,
    pub heap_size: f64,
    pub heap_free: f64,
    pub heap_largest_block: f64,
    pub heap_watermark: f64,
    pub serial_enabled: bool,
    pub serial_baudrate: f64,
}

impl InstanceState for SystemInfo {
    fn get(&self, field: &str) -> Option<Value> {
        Some(match field {
            CPU_ID => Value::Text(self.cpu_id.clone()),
            RESET_CAUSE => Value::Text(self.reset_cause.clone()),
            FREQUENCY => Value::Text(self.frequency.clone()),
            RESCUE_MODE => self.rescue_mode.into(),
            DEBUGGING_ENABLED => self.debugging_enabled.into(),
            HEAP_SIZE => self.heap_size.into(),
            HEAP_FREE => self.heap_free.into(),
            HEAP_LARGEST_BLOCK => self.heap_largest_block.into(),
            HEAP_WATERMARK => self.heap_watermark.into(),
            SERIAL_ENABLED => self.serial_enabled.into(),
            SERIAL_BAUDRATE => self.serial_baudrate.into(),
            _ => return None,
        })
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), Error> {
        match field {
            CPU_ID => self.cpu_id = expect_text(field, value)?,
            RESET_CAUSE => self.reset_cause = expect_text(field, value)?,
            FREQUENCY => self.frequency = expect_text(field, value)?,
            RESCUE_MODE => self.rescue_mode = expect_bool(field, &value)?,
            DEBUGGING_ENABLED => self.debugging_enabled = expect_bool(field, &value)?,
            HEAP_SIZE => self.heap_size = expect_f64(field, &value)?,
            HEAP_FREE => self.heap_free = expect_f64(field, &value)?,
            HEAP_LARGEST_BLOCK => self.heap_largest_block = expect_f64(field, &value)?,
            HEAP_WATERMARK => self.heap_watermark = expect_f64(field, &value)?,
            SERIAL_ENABLED => self.serial_enabled = expect_bool(field, &value)?,
            SERIAL_BAUDRATE => self.serial_baudrate = expect_f64(field, &value)?,
            _ => {}
        }
        Ok(())
    }
}

pub fn system_instance() -> Instance {
    Instance::new(
        SYSTEM_ID,
        "system:",
        vec![
            Field::ro(CPU_ID, FieldKind::Text),
            Field::ro(RESET_CAUSE, FieldKind::Text),
            Field::ro(FREQUENCY, FieldKind::Text),
            Field::ro(RESCUE_MODE, FieldKind::Bool),
            Field::rw(DEBUGGING_ENABLED, FieldKind::Bool),
            Field::ro(HEAP_SIZE, FieldKind::Float),
            Field::ro(HEAP_FREE, FieldKind::Float),
            Field::ro(HEAP_LARGEST_BLOCK, FieldKind::Float),
            Field::ro(HEAP_WATERMARK, FieldKind::Float),
            Field::rw(SERIAL_ENABLED, FieldKind::Bool),
            Field::rw(SERIAL_BAUDRATE, FieldKind::Float),
        ],
    )
}

#[derive(Debug, Clone)]
pub struct System {
    set: InstanceSet<SystemInfo>,
}

impl System {
    pub fn new(client: CresClient) -> Self {
        Self {
            set: InstanceSet::new(Category::System, client, vec![system_instance()]),
        }
    }

    pub fn info(&self) -> SystemInfo {
        self.set.state(SYSTEM_ID).cloned().unwrap_or_default()
    }

    /// The device's self-reported type string (`type` query).
    pub async fn device_type(&self) -> Result<String, Error> {
        self.set.client().query_one(Op::get("type")).await
    }

    /// Reachability check: succeeds with `true` only when the device
    /// answers the type query with a non-empty body.
    pub async fn test_connection(&self) -> bool {
        match self.device_type().await {
            Ok(t) => !t.is_empty(),
            Err(e) => {
                info!(error = %e, "connection test failed");
                false
            }
        }
    }

    pub async fn reboot(&self) -> Result<(), Error> {
        let body = self.set.client().query("system:reboot").await?;
        codec::check_device_error(&body)
    }
}

impl Subsystem for System {
    type State = SystemInfo;

    const CATEGORY: Category = Category::System;

    fn instance_set(&self) -> &InstanceSet<SystemInfo> {
        &self.set
    }

    fn instance_set_mut(&mut self) -> &mut InstanceSet<SystemInfo> {
        &mut self.set
    }
}
