// Power switches, `switch-<id>:` prefix.
//
// Field order per switch: enabled, [pwm-enabled], duty-cycle, [pwm-frequency].

use serde::Serialize;

use super::{InstanceSet, PwmState, Subsystem};
use crate::client::CresClient;
use crate::error::Error;
use crate::model::{
    Category, Field, FieldKind, Instance, InstanceState, Value, expect_bool, expect_f64,
};

pub const DEFAULT_SWITCHES: [&str; 3] = ["12v", "24v-a", "24v-b"];
pub const DEFAULT_PWM_SWITCHES: [&str; 3] = DEFAULT_SWITCHES;

pub const ENABLED: &str = "enabled";
pub const PWM_ENABLED: &str = "pwm-enabled";
pub const DUTY_CYCLE: &str = "duty-cycle";
pub const PWM_FREQUENCY: &str = "pwm-frequency";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SwitchState {
    pub enabled: bool,
    pub duty_cycle: f64,
    pub pwm: Option<PwmState>,
}

impl InstanceState for SwitchState {
    fn get(&self, field: &str) -> Option<Value> {
        match field {
            ENABLED => Some(self.enabled.into()),
            PWM_ENABLED => self.pwm.map(|p| p.enabled.into()),
            DUTY_CYCLE => Some(self.duty_cycle.into()),
            PWM_FREQUENCY => self.pwm.map(|p| p.frequency.into()),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), Error> {
        match field {
            ENABLED => self.enabled = expect_bool(field, &value)?,
            PWM_ENABLED => self.pwm.get_or_insert_default().enabled = expect_bool(field, &value)?,
            DUTY_CYCLE => self.duty_cycle = expect_f64(field, &value)?,
            PWM_FREQUENCY => {
                self.pwm.get_or_insert_default().frequency = expect_f64(field, &value)?;
            }
            _ => {}
        }
        Ok(())
    }
}

pub fn switch_instance(id: &str, pwm: bool) -> Instance {
    let fields = if pwm {
        vec![
            Field::rw(ENABLED, FieldKind::Bool),
            Field::rw(PWM_ENABLED, FieldKind::Bool),
            Field::rw(DUTY_CYCLE, FieldKind::Float),
            Field::rw(PWM_FREQUENCY, FieldKind::Float),
        ]
    } else {
        vec![
            Field::rw(ENABLED, FieldKind::Bool),
            Field::rw(DUTY_CYCLE, FieldKind::Float),
        ]
    };
    Instance::new(id, format!("switch-{id}:"), fields)
}

#[derive(Debug, Clone)]
pub struct Switches {
    set: InstanceSet<SwitchState>,
}

impl Switches {
    pub fn new<S: AsRef<str>>(client: CresClient, ids: &[S], pwm: &[S]) -> Self {
        let instances = ids
            .iter()
            .map(|id| {
                let id = id.as_ref();
                switch_instance(id, pwm.iter().any(|p| p.as_ref() == id))
            })
            .collect();
        Self {
            set: InstanceSet::new(Category::Switch, client, instances),
        }
    }

    pub fn state(&self, id: &str) -> Option<SwitchState> {
        self.set.state(id).copied()
    }

    pub async fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<bool, Error> {
        let v = self.set.set_one(id, ENABLED, enabled.into()).await?;
        expect_bool(ENABLED, &v)
    }

    pub async fn set_duty_cycle(&mut self, id: &str, duty: f64) -> Result<f64, Error> {
        let v = self.set.set_one(id, DUTY_CYCLE, duty.into()).await?;
        expect_f64(DUTY_CYCLE, &v)
    }

    pub async fn set_pwm_enabled(&mut self, id: &str, enabled: bool) -> Result<bool, Error> {
        let v = self.set.set_one(id, PWM_ENABLED, enabled.into()).await?;
        expect_bool(PWM_ENABLED, &v)
    }

    pub async fn set_pwm_frequency(&mut self, id: &str, hz: f64) -> Result<f64, Error> {
        let v = self.set.set_one(id, PWM_FREQUENCY, hz.into()).await?;
        expect_f64(PWM_FREQUENCY, &v)
    }
}

impl Subsystem for Switches {
    type State = SwitchState;

    const CATEGORY: Category = Category::Switch;

    fn instance_set(&self) -> &InstanceSet<SwitchState> {
        &self.set
    }

    fn instance_set_mut(&mut self) -> &mut InstanceSet<SwitchState> {
        &mut self.set
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::subsystem::decode_instances;

    #[test]
    fn decodes_default_switch_response() {
        let instances: Vec<Instance> = DEFAULT_SWITCHES
            .iter()
            .map(|id| switch_instance(id, true))
            .collect();
        let tokens: Vec<String> = "1;0;50.0;0.0;0;0;0.0;0.0;1;1;30.0;200.0"
            .split(';')
            .map(String::from)
            .collect();

        let out: IndexMap<String, SwitchState> = decode_instances(&instances, &tokens).unwrap();

        assert_eq!(
            out["12v"],
            SwitchState {
                enabled: true,
                duty_cycle: 50.0,
                pwm: Some(PwmState {
                    enabled: false,
                    frequency: 0.0
                }),
            }
        );
        assert_eq!(
            out["24v-a"],
            SwitchState {
                enabled: false,
                duty_cycle: 0.0,
                pwm: Some(PwmState::default()),
            }
        );
        assert_eq!(
            out["24v-b"],
            SwitchState {
                enabled: true,
                duty_cycle: 30.0,
                pwm: Some(PwmState {
                    enabled: true,
                    frequency: 200.0
                }),
            }
        );
    }

    #[test]
    fn non_pwm_switch_has_two_fields() {
        let inst = switch_instance("12v", false);
        let names: Vec<&str> = inst.fields.iter().map(|f| f.name).collect();
        assert_eq!(names, [ENABLED, DUTY_CYCLE]);
    }
}
