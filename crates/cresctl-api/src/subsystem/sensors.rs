// Extension sensors, discovered at runtime via `extension:get-all()`.
//
// Each sensor is fetched with its own batch under `extension:<id>:`.
// Unlike the fixed categories, individual readings are optional: an
// empty or non-numeric token leaves that reading absent.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use super::{InstanceSet, Subsystem};
use crate::client::CresClient;
use crate::codec::{self, Op};
use crate::error::Error;
use crate::model::{Category, Field, FieldKind, Instance, InstanceState, Value, expect_f64};

pub const DISCOVERY_QUERY: &str = "extension:get-all()";

pub const HUMIDITY: &str = "humidity";
pub const TEMPERATURE: &str = "temperature";
pub const VPD: &str = "vpd";
pub const CO2_CONCENTRATION: &str = "co2-concentration";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SensorReading {
    pub humidity: Option<f64>,
    pub temperature: Option<f64>,
    pub vpd: Option<f64>,
    pub co2_concentration: Option<f64>,
}

impl SensorReading {
    fn slot(&mut self, field: &str) -> Option<&mut Option<f64>> {
        match field {
            HUMIDITY => Some(&mut self.humidity),
            TEMPERATURE => Some(&mut self.temperature),
            VPD => Some(&mut self.vpd),
            CO2_CONCENTRATION => Some(&mut self.co2_concentration),
            _ => None,
        }
    }
}

impl InstanceState for SensorReading {
    fn get(&self, field: &str) -> Option<Value> {
        match field {
            HUMIDITY => self.humidity.map(Value::Float),
            TEMPERATURE => self.temperature.map(Value::Float),
            VPD => self.vpd.map(Value::Float),
            CO2_CONCENTRATION => self.co2_concentration.map(Value::Float),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), Error> {
        let v = expect_f64(field, &value)?;
        if let Some(slot) = self.slot(field) {
            *slot = Some(v);
        }
        Ok(())
    }
}

/// Sensor ids containing `co2` (any case) also report a CO₂ reading.
pub fn sensor_instance(id: &str) -> Instance {
    let mut fields = vec![
        Field::ro(HUMIDITY, FieldKind::Float),
        Field::ro(TEMPERATURE, FieldKind::Float),
        Field::ro(VPD, FieldKind::Float),
    ];
    if id.to_ascii_lowercase().contains("co2") {
        fields.push(Field::ro(CO2_CONCENTRATION, FieldKind::Float));
    }
    Instance::new(id, format!("extension:{id}:"), fields)
}

/// Decode one sensor's tokens, skipping readings that are empty or
/// malformed.
fn decode_reading(instance: &Instance, tokens: &[String]) -> SensorReading {
    let mut reading = SensorReading::default();
    for (field, token) in instance.fields.iter().zip(tokens) {
        if token.is_empty() {
            continue;
        }
        match (codec::parse_float(token), reading.slot(field.name)) {
            (Ok(v), Some(slot)) => *slot = Some(v),
            (Ok(_), None) => {}
            (Err(_), _) => {
                warn!(
                    sensor = %instance.id,
                    field = field.name,
                    token = %token,
                    "unparseable sensor reading"
                );
            }
        }
    }
    reading
}

#[derive(Debug, Clone)]
pub struct Sensors {
    set: InstanceSet<SensorReading>,
}

impl Sensors {
    /// An empty sensor set; call [`Sensors::discover`] to populate it.
    pub fn new(client: CresClient) -> Self {
        Self {
            set: InstanceSet::new(Category::Sensor, client, Vec::new()),
        }
    }

    /// Ask the device which extension sensors are attached and rebuild
    /// the instance list. An empty list (`[]`) is a valid answer.
    pub async fn discover(&mut self) -> Result<Vec<String>, Error> {
        let body = self.set.client().query(DISCOVERY_QUERY).await?;
        codec::check_device_error(&body)?;
        let ids = codec::parse_id_list(&body);
        debug!(count = ids.len(), "discovered sensors");
        self.set
            .reset_instances(ids.iter().map(|id| sensor_instance(id)).collect());
        Ok(ids)
    }

    pub fn ids(&self) -> Vec<String> {
        self.set.instances().iter().map(|i| i.id.clone()).collect()
    }

    pub fn reading(&self, id: &str) -> Option<SensorReading> {
        self.set.state(id).copied()
    }

    async fn fetch_readings(&mut self) -> Result<(), Error> {
        let mut fresh = IndexMap::with_capacity(self.set.instances().len());
        for inst in self.set.instances() {
            let ops: Vec<Op> = inst.fields.iter().map(|f| Op::get(inst.path(f.name))).collect();
            let tokens = self.set.client().query_batch(&ops).await?;
            fresh.insert(inst.id.clone(), decode_reading(inst, &tokens));
        }
        self.set.replace_state(fresh);
        Ok(())
    }
}

impl Subsystem for Sensors {
    type State = SensorReading;

    const CATEGORY: Category = Category::Sensor;

    fn instance_set(&self) -> &InstanceSet<SensorReading> {
        &self.set
    }

    fn instance_set_mut(&mut self) -> &mut InstanceSet<SensorReading> {
        &mut self.set
    }

    /// One request per sensor; any request failure fails the whole fetch
    /// and leaves the previous readings in place.
    fn fetch_all(&mut self) -> impl std::future::Future<Output = Result<(), Error>> + Send {
        self.fetch_readings()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn tokens(raw: &str) -> Vec<String> {
        raw.split(';').map(String::from).collect()
    }

    #[test]
    fn co2_field_only_for_co2_sensors() {
        assert_eq!(sensor_instance("sht-21").fields.len(), 3);
        assert_eq!(sensor_instance("SCD-CO2").fields.len(), 4);
        assert_eq!(
            sensor_instance("scd-co2").path(CO2_CONCENTRATION),
            "extension:scd-co2:co2-concentration"
        );
    }

    #[test]
    fn empty_and_bad_readings_are_skipped() {
        let inst = sensor_instance("scd-co2");
        let reading = decode_reading(&inst, &tokens(";23.4;n/a;812"));
        assert_eq!(
            reading,
            SensorReading {
                humidity: None,
                temperature: Some(23.4),
                vpd: None,
                co2_concentration: Some(812.0),
            }
        );
        let attrs = reading.attributes(&inst);
        let keys: Vec<&str> = attrs.keys().map(String::as_str).collect();
        assert_eq!(keys, [TEMPERATURE, CO2_CONCENTRATION]);
    }
}
