// ── Category dispatch ──
//
// Owns one client per category and routes category-addressed calls to
// the matching subsystem. Resolved once per category, not per instance.

use cresctl_api::{
    Attributes, Category, CresClient, Fan, Inputs, Outputs, Sensors, Subsystem, Switches, System,
    Value,
};

use crate::config::CoordinatorConfig;
use crate::error::CoreError;

/// Periodic refresh order.
pub const CYCLE_ORDER: [Category; 5] = [
    Category::Sensor,
    Category::Fan,
    Category::Input,
    Category::Output,
    Category::Switch,
];

/// Initial scan order.
pub const SCAN_ORDER: [Category; 5] = [
    Category::Sensor,
    Category::Fan,
    Category::Output,
    Category::Input,
    Category::Switch,
];

#[derive(Debug, Clone)]
pub struct Subsystems {
    pub sensors: Sensors,
    pub fan: Fan,
    pub outputs: Outputs,
    pub inputs: Inputs,
    pub switches: Switches,
    pub system: System,
}

async fn fetch_with<S: Subsystem>(
    subsystem: &mut S,
) -> Result<Vec<(String, Attributes)>, cresctl_api::Error> {
    subsystem.fetch_all().await?;
    Ok(subsystem.attributes())
}

fn no_subsystem(category: Category) -> CoreError {
    CoreError::InvalidState {
        message: format!("no subsystem handles category '{category}'"),
    }
}

impl Subsystems {
    pub fn new(client: &CresClient, config: &CoordinatorConfig) -> Self {
        Self {
            sensors: Sensors::new(client.clone()),
            fan: Fan::new(client.clone()),
            outputs: Outputs::new(client.clone(), &config.outputs, &config.pwm_outputs),
            inputs: Inputs::new(client.clone(), &config.inputs),
            switches: Switches::new(client.clone(), &config.switches, &config.pwm_switches),
            system: System::new(client.clone()),
        }
    }

    /// `FetchAll` for one category, returning the refreshed attribute maps.
    pub async fn fetch(
        &mut self,
        category: Category,
    ) -> Result<Vec<(String, Attributes)>, cresctl_api::Error> {
        match category {
            Category::Sensor => fetch_with(&mut self.sensors).await,
            Category::Fan => fetch_with(&mut self.fan).await,
            Category::Output => fetch_with(&mut self.outputs).await,
            Category::Input => fetch_with(&mut self.inputs).await,
            Category::Switch => fetch_with(&mut self.switches).await,
            Category::System => fetch_with(&mut self.system).await,
            Category::Other => Ok(Vec::new()),
        }
    }

    pub async fn fetch_one(
        &mut self,
        category: Category,
        instance: &str,
        field: &str,
    ) -> Result<Value, CoreError> {
        let value = match category {
            Category::Sensor => self.sensors.fetch_one(instance, field).await?,
            Category::Fan => self.fan.fetch_one(instance, field).await?,
            Category::Output => self.outputs.fetch_one(instance, field).await?,
            Category::Input => self.inputs.fetch_one(instance, field).await?,
            Category::Switch => self.switches.fetch_one(instance, field).await?,
            Category::System => self.system.fetch_one(instance, field).await?,
            Category::Other => return Err(no_subsystem(category)),
        };
        Ok(value)
    }

    pub async fn set_one(
        &mut self,
        category: Category,
        instance: &str,
        field: &str,
        value: Value,
    ) -> Result<Value, CoreError> {
        let value = match category {
            Category::Sensor => self.sensors.set_one(instance, field, value).await?,
            Category::Fan => self.fan.set_one(instance, field, value).await?,
            Category::Output => self.outputs.set_one(instance, field, value).await?,
            Category::Input => self.inputs.set_one(instance, field, value).await?,
            Category::Switch => self.switches.set_one(instance, field, value).await?,
            Category::System => self.system.set_one(instance, field, value).await?,
            Category::Other => return Err(no_subsystem(category)),
        };
        Ok(value)
    }

    /// Cached attribute maps of one category.
    pub fn attributes(&self, category: Category) -> Vec<(String, Attributes)> {
        match category {
            Category::Sensor => self.sensors.attributes(),
            Category::Fan => self.fan.attributes(),
            Category::Output => self.outputs.attributes(),
            Category::Input => self.inputs.attributes(),
            Category::Switch => self.switches.attributes(),
            Category::System => self.system.attributes(),
            Category::Other => Vec::new(),
        }
    }

    /// Field kind for user input parsing.
    pub fn field(
        &self,
        category: Category,
        instance: &str,
        field: &str,
    ) -> Option<cresctl_api::Field> {
        let instances = match category {
            Category::Sensor => self.sensors.instances(),
            Category::Fan => self.fan.instances(),
            Category::Output => self.outputs.instances(),
            Category::Input => self.inputs.instances(),
            Category::Switch => self.switches.instances(),
            Category::System => self.system.instances(),
            Category::Other => &[],
        };
        instances
            .iter()
            .find(|i| i.id == instance)
            .and_then(|i| i.field(field))
            .copied()
    }
}
