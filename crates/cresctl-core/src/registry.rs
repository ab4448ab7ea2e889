// ── Device registry ──
//
// In-memory catalogue of every discovered instance. Built once by
// `scan`, then mutated only through `apply_update` on the coordinator's
// serialized refresh path. Consumers read copies via `snapshot`.

use indexmap::IndexMap;
use tracing::{debug, info};

use cresctl_api::{Attributes, Category};

use crate::error::CoreError;
use crate::model::{CycleOutcome, DeviceEntry, Snapshot};
use crate::subsystems::{SCAN_ORDER, Subsystems};

#[derive(Debug, Clone)]
pub struct Registry {
    address: String,
    /// Keyed by `unique_id`, in scan order.
    entries: IndexMap<String, DeviceEntry>,
}

impl Registry {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            entries: IndexMap::new(),
        }
    }

    /// Discover sensors, fetch every mandatory category and build one
    /// entry per instance. Any category failure aborts the scan.
    pub async fn scan(address: &str, subsystems: &mut Subsystems) -> Result<Self, CoreError> {
        let mut registry = Self::new(address);

        subsystems
            .sensors
            .discover()
            .await
            .map_err(|source| CoreError::Initialization {
                category: Category::Sensor,
                source,
            })?;

        for category in SCAN_ORDER {
            let attrs = subsystems
                .fetch(category)
                .await
                .map_err(|source| CoreError::Initialization { category, source })?;
            registry.apply_update(category, attrs);
        }

        info!(
            address,
            devices = registry.entries.len(),
            "device scan complete"
        );
        Ok(registry)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &DeviceEntry> {
        self.entries.values()
    }

    /// Exact match on a category-scoped id.
    pub fn lookup(&self, category: Category, id: &str) -> Option<&DeviceEntry> {
        self.entries
            .values()
            .find(|e| e.category == category && e.id == id)
    }

    /// Resolve a unique id first, then the first plain id in scan order.
    pub fn find(&self, id: &str) -> Option<&DeviceEntry> {
        self.entries
            .get(id)
            .or_else(|| self.entries.values().find(|e| e.id == id))
    }

    /// Shallow-merge fetched attributes into existing entries. Keys
    /// missing from the update are left untouched.
    ///
    /// Instances without an entry get one; this only happens for
    /// on-demand categories that the scan does not cover.
    pub fn apply_update(&mut self, category: Category, update: Vec<(String, Attributes)>) {
        for (id, attrs) in update {
            let uid = crate::model::unique_id(&self.address, category, &id);
            let entry = self.entries.entry(uid).or_insert_with(|| {
                debug!(%category, id = %id, "registering device");
                DeviceEntry::new(&self.address, category, &id)
            });
            entry.attributes.extend(attrs);
        }
    }

    pub fn snapshot(
        &self,
        refreshed_at: Option<chrono::DateTime<chrono::Utc>>,
        last_cycle: Option<CycleOutcome>,
    ) -> Snapshot {
        let mut snapshot = Snapshot {
            refreshed_at,
            last_cycle,
            ..Snapshot::default()
        };
        for entry in self.entries.values() {
            snapshot
                .categories
                .entry(entry.category)
                .or_default()
                .insert(entry.id.clone(), entry.attributes.clone());
        }
        snapshot
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cresctl_api::Value;
    use pretty_assertions::assert_eq;

    use super::*;

    fn attrs(pairs: &[(&str, Value)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    fn seeded() -> Registry {
        let mut reg = Registry::new("10.0.0.2");
        reg.apply_update(
            Category::Sensor,
            vec![("a".into(), attrs(&[("temperature", Value::Float(21.0))]))],
        );
        reg.apply_update(
            Category::Output,
            vec![
                (
                    "a".into(),
                    attrs(&[
                        ("enabled", Value::Bool(true)),
                        ("voltage", Value::Float(5.0)),
                    ]),
                ),
                ("b".into(), attrs(&[("enabled", Value::Bool(false))])),
            ],
        );
        reg
    }

    #[test]
    fn lookup_is_category_scoped() {
        let reg = seeded();
        assert_eq!(reg.lookup(Category::Output, "b").unwrap().display_name, "Output-b");
        assert!(reg.lookup(Category::Input, "b").is_none());
    }

    #[test]
    fn find_prefers_unique_id_then_scan_order() {
        let reg = seeded();
        assert_eq!(reg.find("10.0.0.2_Oa").unwrap().category, Category::Output);
        assert_eq!(reg.find("a").unwrap().category, Category::Sensor);
        assert!(reg.find("zz").is_none());
    }

    #[test]
    fn apply_update_merges_shallowly() {
        let mut reg = seeded();
        reg.apply_update(
            Category::Output,
            vec![("a".into(), attrs(&[("voltage", Value::Float(7.5))]))],
        );
        let entry = reg.lookup(Category::Output, "a").unwrap();
        assert_eq!(entry.attributes["enabled"], Value::Bool(true));
        assert_eq!(entry.attributes["voltage"], Value::Float(7.5));
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn snapshot_is_a_detached_copy() {
        let mut reg = seeded();
        let snap = reg.snapshot(None, Some(CycleOutcome::Ok));
        reg.apply_update(
            Category::Output,
            vec![("a".into(), attrs(&[("voltage", Value::Float(0.0))]))],
        );
        assert_eq!(
            snap.device(Category::Output, "a").unwrap()["voltage"],
            Value::Float(5.0)
        );
        assert_eq!(snap.device_count(), 3);
    }
}
