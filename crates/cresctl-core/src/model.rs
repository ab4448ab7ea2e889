// ── Domain model ──
//
// Device entries as held by the registry, and the immutable snapshot
// handed to consumers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use cresctl_api::{Attributes, Category};

/// One discovered instance of a category.
///
/// `id` is unique within its category; `unique_id` is unique across the
/// device and stable for the lifetime of the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceEntry {
    pub id: String,
    pub unique_id: String,
    pub category: Category,
    pub display_name: String,
    pub attributes: Attributes,
}

impl DeviceEntry {
    pub fn new(address: &str, category: Category, id: &str) -> Self {
        Self {
            id: id.to_owned(),
            unique_id: unique_id(address, category, id),
            category,
            display_name: display_name(category, id),
            attributes: Attributes::new(),
        }
    }
}

/// Human-facing name for an instance.
pub fn display_name(category: Category, id: &str) -> String {
    match category {
        Category::Output => format!("Output-{id}"),
        Category::Input => format!("Input-{id}"),
        Category::Switch => format!("Switch {}", id.to_uppercase()),
        Category::System => "System".to_owned(),
        Category::Sensor | Category::Fan | Category::Other => id.to_owned(),
    }
}

/// Device-wide identifier derived from the address, category and id.
pub fn unique_id(address: &str, category: Category, id: &str) -> String {
    match category {
        Category::Output => format!("{address}_O{id}"),
        Category::Input => format!("{address}_I{id}"),
        Category::Switch => format!("{address}_Switch_{id}"),
        Category::Sensor | Category::Fan | Category::System | Category::Other => {
            format!("{address}_{id}")
        }
    }
}

/// A subsystem that failed during a refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubsystemFailure {
    pub category: Category,
    pub message: String,
    /// The device was unreachable rather than answering badly.
    pub connection: bool,
}

/// Result of the most recent refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CycleOutcome {
    Ok,
    Failed { failures: Vec<SubsystemFailure> },
}

impl CycleOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Immutable copy of the registry: category → id → attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub categories: BTreeMap<Category, IndexMap<String, Attributes>>,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub last_cycle: Option<CycleOutcome>,
}

impl Snapshot {
    pub fn category(&self, category: Category) -> Option<&IndexMap<String, Attributes>> {
        self.categories.get(&category)
    }

    pub fn device(&self, category: Category, id: &str) -> Option<&Attributes> {
        self.categories.get(&category)?.get(id)
    }

    pub fn device_count(&self) -> usize {
        self.categories.values().map(IndexMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naming_per_category() {
        let addr = "192.168.1.50";
        let cases = [
            (Category::Sensor, "sht-21", "sht-21", "192.168.1.50_sht-21"),
            (Category::Fan, "fan", "fan", "192.168.1.50_fan"),
            (Category::Output, "a", "Output-a", "192.168.1.50_Oa"),
            (Category::Input, "b", "Input-b", "192.168.1.50_Ib"),
            (Category::Switch, "24v-a", "Switch 24V-A", "192.168.1.50_Switch_24v-a"),
        ];
        for (category, id, name, uid) in cases {
            let entry = DeviceEntry::new(addr, category, id);
            assert_eq!(entry.display_name, name);
            assert_eq!(entry.unique_id, uid);
        }
    }
}
