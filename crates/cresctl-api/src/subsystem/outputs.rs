// Analog outputs, `out-<id>:` prefix.
//
// PWM-capable outputs carry two extra fields after the common five.

use serde::Serialize;

use super::{InstanceSet, PwmState, Subsystem};
use crate::client::CresClient;
use crate::error::Error;
use crate::model::{
    Category, Field, FieldKind, Instance, InstanceState, Value, expect_bool, expect_f64,
};

pub const DEFAULT_OUTPUTS: [&str; 6] = ["a", "b", "c", "d", "e", "f"];
pub const DEFAULT_PWM_OUTPUTS: [&str; 2] = ["a", "b"];

pub const ENABLED: &str = "enabled";
pub const VOLTAGE: &str = "voltage";
pub const CALIB_OFFSET: &str = "calib-offset";
pub const CALIB_FACTOR: &str = "calib-factor";
pub const THRESHOLD: &str = "threshold";
pub const PWM_ENABLED: &str = "pwm-enabled";
pub const PWM_FREQUENCY: &str = "pwm-frequency";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OutputState {
    pub enabled: bool,
    pub voltage: f64,
    pub calib_offset: f64,
    pub calib_factor: f64,
    pub threshold: f64,
    pub pwm: Option<PwmState>,
}

impl InstanceState for OutputState {
    fn get(&self, field: &str) -> Option<Value> {
        match field {
            ENABLED => Some(self.enabled.into()),
            VOLTAGE => Some(self.voltage.into()),
            CALIB_OFFSET => Some(self.calib_offset.into()),
            CALIB_FACTOR => Some(self.calib_factor.into()),
            THRESHOLD => Some(self.threshold.into()),
            PWM_ENABLED => self.pwm.map(|p| p.enabled.into()),
            PWM_FREQUENCY => self.pwm.map(|p| p.frequency.into()),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), Error> {
        match field {
            ENABLED => self.enabled = expect_bool(field, &value)?,
            VOLTAGE => self.voltage = expect_f64(field, &value)?,
            CALIB_OFFSET => self.calib_offset = expect_f64(field, &value)?,
            CALIB_FACTOR => self.calib_factor = expect_f64(field, &value)?,
            THRESHOLD => self.threshold = expect_f64(field, &value)?,
            PWM_ENABLED => self.pwm.get_or_insert_default().enabled = expect_bool(field, &value)?,
            PWM_FREQUENCY => {
                self.pwm.get_or_insert_default().frequency = expect_f64(field, &value)?;
            }
            _ => {}
        }
        Ok(())
    }
}

pub fn output_instance(id: &str, pwm: bool) -> Instance {
    let mut fields = vec![
        Field::rw(ENABLED, FieldKind::Bool),
        Field::rw(VOLTAGE, FieldKind::Float),
        Field::rw(CALIB_OFFSET, FieldKind::Float),
        Field::rw(CALIB_FACTOR, FieldKind::Float),
        Field::rw(THRESHOLD, FieldKind::Float),
    ];
    if pwm {
        fields.push(Field::rw(PWM_ENABLED, FieldKind::Bool));
        fields.push(Field::rw(PWM_FREQUENCY, FieldKind::Float));
    }
    Instance::new(id, format!("out-{id}:"), fields)
}

#[derive(Debug, Clone)]
pub struct Outputs {
    set: InstanceSet<OutputState>,
}

impl Outputs {
    /// `pwm` lists the subset of `ids` that are PWM-capable.
    pub fn new<S: AsRef<str>>(client: CresClient, ids: &[S], pwm: &[S]) -> Self {
        let instances = ids
            .iter()
            .map(|id| {
                let id = id.as_ref();
                output_instance(id, pwm.iter().any(|p| p.as_ref() == id))
            })
            .collect();
        Self {
            set: InstanceSet::new(Category::Output, client, instances),
        }
    }

    pub fn state(&self, id: &str) -> Option<OutputState> {
        self.set.state(id).copied()
    }

    pub async fn voltage(&mut self, id: &str) -> Result<f64, Error> {
        let v = self.set.fetch_one(id, VOLTAGE).await?;
        expect_f64(VOLTAGE, &v)
    }

    pub async fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<bool, Error> {
        let v = self.set.set_one(id, ENABLED, enabled.into()).await?;
        expect_bool(ENABLED, &v)
    }

    pub async fn set_voltage(&mut self, id: &str, voltage: f64) -> Result<f64, Error> {
        let v = self.set.set_one(id, VOLTAGE, voltage.into()).await?;
        expect_f64(VOLTAGE, &v)
    }

    pub async fn set_threshold(&mut self, id: &str, threshold: f64) -> Result<f64, Error> {
        let v = self.set.set_one(id, THRESHOLD, threshold.into()).await?;
        expect_f64(THRESHOLD, &v)
    }

    /// Fails with `UnknownField` on outputs that are not PWM-capable.
    pub async fn set_pwm_enabled(&mut self, id: &str, enabled: bool) -> Result<bool, Error> {
        let v = self.set.set_one(id, PWM_ENABLED, enabled.into()).await?;
        expect_bool(PWM_ENABLED, &v)
    }

    pub async fn set_pwm_frequency(&mut self, id: &str, hz: f64) -> Result<f64, Error> {
        let v = self.set.set_one(id, PWM_FREQUENCY, hz.into()).await?;
        expect_f64(PWM_FREQUENCY, &v)
    }

    pub async fn apply(&mut self, id: &str, desired: OutputState) -> Result<OutputState, Error> {
        self.set.apply_instance(id, &desired).await
    }
}

impl Subsystem for Outputs {
    type State = OutputState;

    const CATEGORY: Category = Category::Output;

    fn instance_set(&self) -> &InstanceSet<OutputState> {
        &self.set
    }

    fn instance_set_mut(&mut self) -> &mut InstanceSet<OutputState> {
        &mut self.set
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn pwm_fields_only_on_pwm_outputs() {
        assert_eq!(output_instance("a", true).fields.len(), 7);
        assert_eq!(output_instance("c", false).fields.len(), 5);
        assert!(output_instance("c", false).field(PWM_ENABLED).is_none());
    }

    #[test]
    fn non_pwm_state_reports_no_pwm_attributes() {
        let state = OutputState {
            enabled: true,
            voltage: 3.3,
            ..OutputState::default()
        };
        let attrs = state.attributes(&output_instance("c", false));
        assert!(!attrs.contains_key(PWM_ENABLED));
        assert!(!attrs.contains_key(PWM_FREQUENCY));
        assert_eq!(attrs.len(), 5);
    }

    #[test]
    fn setting_pwm_field_creates_pwm_state() {
        let mut state = OutputState::default();
        state.set(PWM_FREQUENCY, Value::Float(500.0)).unwrap();
        assert_eq!(
            state.pwm,
            Some(PwmState {
                enabled: false,
                frequency: 500.0
            })
        );
    }
}
