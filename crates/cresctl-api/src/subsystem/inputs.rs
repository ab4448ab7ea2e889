// Analog inputs, `in-<id>:` prefix. Voltage is read-only.

use serde::Serialize;

use super::{InstanceSet, Subsystem};
use crate::client::CresClient;
use crate::error::Error;
use crate::model::{Category, Field, FieldKind, Instance, InstanceState, Value, expect_f64};

pub const DEFAULT_INPUTS: [&str; 2] = ["a", "b"];

pub const VOLTAGE: &str = "voltage";
pub const CALIB_OFFSET: &str = "calib-offset";
pub const CALIB_FACTOR: &str = "calib-factor";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct InputState {
    pub voltage: f64,
    pub calib_offset: f64,
    pub calib_factor: f64,
}

impl InstanceState for InputState {
    fn get(&self, field: &str) -> Option<Value> {
        match field {
            VOLTAGE => Some(self.voltage.into()),
            CALIB_OFFSET => Some(self.calib_offset.into()),
            CALIB_FACTOR => Some(self.calib_factor.into()),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), Error> {
        let v = expect_f64(field, &value)?;
        match field {
            VOLTAGE => self.voltage = v,
            CALIB_OFFSET => self.calib_offset = v,
            CALIB_FACTOR => self.calib_factor = v,
            _ => {}
        }
        Ok(())
    }
}

pub fn input_instance(id: &str) -> Instance {
    Instance::new(
        id,
        format!("in-{id}:"),
        vec![
            Field::ro(VOLTAGE, FieldKind::Float),
            Field::rw(CALIB_OFFSET, FieldKind::Float),
            Field::rw(CALIB_FACTOR, FieldKind::Float),
        ],
    )
}

#[derive(Debug, Clone)]
pub struct Inputs {
    set: InstanceSet<InputState>,
}

impl Inputs {
    pub fn new<S: AsRef<str>>(client: CresClient, ids: &[S]) -> Self {
        let instances = ids.iter().map(|id| input_instance(id.as_ref())).collect();
        Self {
            set: InstanceSet::new(Category::Input, client, instances),
        }
    }

    pub fn state(&self, id: &str) -> Option<InputState> {
        self.set.state(id).copied()
    }

    pub async fn voltage(&mut self, id: &str) -> Result<f64, Error> {
        let v = self.set.fetch_one(id, VOLTAGE).await?;
        expect_f64(VOLTAGE, &v)
    }

    pub async fn set_calib_offset(&mut self, id: &str, offset: f64) -> Result<f64, Error> {
        let v = self.set.set_one(id, CALIB_OFFSET, offset.into()).await?;
        expect_f64(CALIB_OFFSET, &v)
    }

    pub async fn set_calib_factor(&mut self, id: &str, factor: f64) -> Result<f64, Error> {
        let v = self.set.set_one(id, CALIB_FACTOR, factor.into()).await?;
        expect_f64(CALIB_FACTOR, &v)
    }
}

impl Subsystem for Inputs {
    type State = InputState;

    const CATEGORY: Category = Category::Input;

    fn instance_set(&self) -> &InstanceSet<InputState> {
        &self.set
    }

    fn instance_set_mut(&mut self) -> &mut InstanceSet<InputState> {
        &mut self.set
    }
}
