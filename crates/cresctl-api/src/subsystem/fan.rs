// Fan subsystem: a single instance under the `fan:` prefix.

use std::future::Future;

use serde::Serialize;

use super::{InstanceSet, Subsystem};
use crate::client::CresClient;
use crate::error::Error;
use crate::model::{
    Category, Field, FieldKind, Instance, InstanceState, Value, expect_bool, expect_f64,
};

pub const FAN_ID: &str = "fan";

pub const ENABLED: &str = "enabled";
pub const DUTY_CYCLE: &str = "duty-cycle";
pub const DUTY_CYCLE_MIN: &str = "duty-cycle-min";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FanState {
    pub enabled: bool,
    /// Percent, 0–100.
    pub duty_cycle: f64,
    pub duty_cycle_min: f64,
}

impl InstanceState for FanState {
    fn get(&self, field: &str) -> Option<Value> {
        match field {
            ENABLED => Some(self.enabled.into()),
            DUTY_CYCLE => Some(self.duty_cycle.into()),
            DUTY_CYCLE_MIN => Some(self.duty_cycle_min.into()),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), Error> {
        match field {
            ENABLED => self.enabled = expect_bool(field, &value)?,
            DUTY_CYCLE => self.duty_cycle = expect_f64(field, &value)?,
            DUTY_CYCLE_MIN => self.duty_cycle_min = expect_f64(field, &value)?,
            _ => {}
        }
        Ok(())
    }
}

pub fn fan_instance() -> Instance {
    Instance::new(
        FAN_ID,
        "fan:",
        vec![
            Field::rw(ENABLED, FieldKind::Bool),
            Field::rw(DUTY_CYCLE, FieldKind::Float),
            Field::rw(DUTY_CYCLE_MIN, FieldKind::Float),
        ],
    )
}

#[derive(Debug, Clone)]
pub struct Fan {
    set: InstanceSet<FanState>,
}

impl Fan {
    pub fn new(client: CresClient) -> Self {
        Self {
            set: InstanceSet::new(Category::Fan, client, vec![fan_instance()]),
        }
    }

    pub fn state(&self) -> FanState {
        self.set.state(FAN_ID).copied().unwrap_or_default()
    }

    pub async fn enabled(&mut self) -> Result<bool, Error> {
        let v = self.set.fetch_one(FAN_ID, ENABLED).await?;
        expect_bool(ENABLED, &v)
    }

    pub async fn duty_cycle(&mut self) -> Result<f64, Error> {
        let v = self.set.fetch_one(FAN_ID, DUTY_CYCLE).await?;
        expect_f64(DUTY_CYCLE, &v)
    }

    pub async fn duty_cycle_min(&mut self) -> Result<f64, Error> {
        let v = self.set.fetch_one(FAN_ID, DUTY_CYCLE_MIN).await?;
        expect_f64(DUTY_CYCLE_MIN, &v)
    }

    /// Turn the fan on or off. Turning it off also writes a zero duty
    /// cycle, as a second request after the enable write.
    pub async fn set_enabled(&mut self, enabled: bool) -> Result<bool, Error> {
        let confirmed = self.write_field(FAN_ID, ENABLED, enabled.into()).await?;
        expect_bool(ENABLED, &confirmed)
    }

    // A disable that reached the device zeroes the duty cycle even when
    // its echo does not decode.
    async fn write_field(&mut self, id: &str, field: &str, value: Value) -> Result<Value, Error> {
        let disabling = field == ENABLED && value == Value::Bool(false);
        let (kind, token) = self.set.write_one(id, field, value).await?;
        if disabling {
            self.set.set_one(id, DUTY_CYCLE, 0.0.into()).await?;
        }
        kind.decode(&token)
    }

    pub async fn set_duty_cycle(&mut self, duty: f64) -> Result<f64, Error> {
        let confirmed = self.set.set_one(FAN_ID, DUTY_CYCLE, duty.into()).await?;
        expect_f64(DUTY_CYCLE, &confirmed)
    }

    pub async fn set_duty_cycle_min(&mut self, duty: f64) -> Result<f64, Error> {
        let confirmed = self
            .set
            .set_one(FAN_ID, DUTY_CYCLE_MIN, duty.into())
            .await?;
        expect_f64(DUTY_CYCLE_MIN, &confirmed)
    }

    /// Write the whole fan state in one batch. A disabled target always
    /// carries a zero duty cycle.
    pub async fn apply_all(&mut self, desired: FanState) -> Result<FanState, Error> {
        let mut desired = desired;
        if !desired.enabled {
            desired.duty_cycle = 0.0;
        }
        self.set.apply_instance(FAN_ID, &desired).await
    }
}

impl Subsystem for Fan {
    type State = FanState;

    const CATEGORY: Category = Category::Fan;

    fn instance_set(&self) -> &InstanceSet<FanState> {
        &self.set
    }

    fn instance_set_mut(&mut self) -> &mut InstanceSet<FanState> {
        &mut self.set
    }

    fn set_one(
        &mut self,
        instance: &str,
        field: &str,
        value: Value,
    ) -> impl Future<Output = Result<Value, Error>> + Send {
        self.write_field(instance, field, value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn attributes_follow_schema_order() {
        let state = FanState {
            enabled: true,
            duty_cycle: 40.0,
            duty_cycle_min: 10.0,
        };
        let attrs = state.attributes(&fan_instance());
        let keys: Vec<&str> = attrs.keys().map(String::as_str).collect();
        assert_eq!(keys, [ENABLED, DUTY_CYCLE, DUTY_CYCLE_MIN]);
        assert_eq!(attrs[DUTY_CYCLE], Value::Float(40.0));
    }

    #[test]
    fn set_rejects_mistyped_value() {
        let mut state = FanState::default();
        assert!(state.set(ENABLED, Value::Float(1.0)).is_err());
        state.set(ENABLED, Value::Bool(true)).unwrap();
        assert!(state.enabled);
    }
}
