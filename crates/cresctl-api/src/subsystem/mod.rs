// ── Subsystem clients ──
//
// Each category owns a fixed, ordered field schema per instance and a
// cached typed state. `InstanceSet` is the shared engine: it batches the
// whole schema into one request, decodes the response positionally, and
// swaps the cache only when every field decoded.

pub mod fan;
pub mod inputs;
pub mod outputs;
pub mod sensors;
pub mod switches;
pub mod system;

use std::future::Future;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::client::CresClient;
use crate::codec::Op;
use crate::error::Error;
use crate::model::{Attributes, Category, FieldKind, Instance, InstanceState, Value};

/// PWM settings of an output or switch. `None` on the owning state means
/// the instance is not PWM-capable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PwmState {
    pub enabled: bool,
    pub frequency: f64,
}

/// The capability set shared by every category.
///
/// `fetch_all` refreshes the cache for every instance in one logical
/// operation; `fetch_one` / `set_one` are single round trips that update
/// one cached field.
pub trait Subsystem: Send + Sync {
    type State: InstanceState;

    const CATEGORY: Category;

    fn instance_set(&self) -> &InstanceSet<Self::State>;

    fn instance_set_mut(&mut self) -> &mut InstanceSet<Self::State>;

    fn fetch_all(&mut self) -> impl Future<Output = Result<(), Error>> + Send {
        self.instance_set_mut().fetch_all()
    }

    fn fetch_one(
        &mut self,
        instance: &str,
        field: &str,
    ) -> impl Future<Output = Result<Value, Error>> + Send {
        self.instance_set_mut().fetch_one(instance, field)
    }

    fn set_one(
        &mut self,
        instance: &str,
        field: &str,
        value: Value,
    ) -> impl Future<Output = Result<Value, Error>> + Send {
        self.instance_set_mut().set_one(instance, field, value)
    }

    /// Declared instances in declaration order.
    fn instances(&self) -> &[Instance] {
        self.instance_set().instances()
    }

    /// Per-instance attribute maps of the cached state.
    fn attributes(&self) -> Vec<(String, Attributes)> {
        self.instance_set().attributes()
    }
}

/// Fixed instances of one category plus their cached state.
#[derive(Debug, Clone)]
pub struct InstanceSet<T> {
    category: Category,
    client: CresClient,
    instances: Vec<Instance>,
    state: IndexMap<String, T>,
}

impl<T: InstanceState> InstanceSet<T> {
    pub fn new(category: Category, client: CresClient, instances: Vec<Instance>) -> Self {
        let state = instances
            .iter()
            .map(|i| (i.id.clone(), T::default()))
            .collect();
        Self {
            category,
            client,
            instances,
            state,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn client(&self) -> &CresClient {
        &self.client
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn instance(&self, id: &str) -> Result<&Instance, Error> {
        self.instances
            .iter()
            .find(|i| i.id == id)
            .ok_or_else(|| Error::UnknownInstance {
                category: self.category,
                instance: id.to_owned(),
            })
    }

    pub fn state(&self, id: &str) -> Option<&T> {
        self.state.get(id)
    }

    pub fn states(&self) -> &IndexMap<String, T> {
        &self.state
    }

    pub fn attributes(&self) -> Vec<(String, Attributes)> {
        self.instances
            .iter()
            .map(|inst| {
                let attrs = self
                    .state
                    .get(&inst.id)
                    .map(|s| s.attributes(inst))
                    .unwrap_or_default();
                (inst.id.clone(), attrs)
            })
            .collect()
    }

    /// Replace the instance list (dynamic categories) and reset the cache.
    pub(crate) fn reset_instances(&mut self, instances: Vec<Instance>) {
        *self = Self::new(self.category, self.client.clone(), instances);
    }

    /// Replace the whole cache at once.
    pub(crate) fn replace_state(&mut self, state: IndexMap<String, T>) {
        self.state = state;
    }

    /// One get operation per field of every instance, in schema order.
    pub fn fetch_ops(&self) -> Vec<Op> {
        self.instances
            .iter()
            .flat_map(|inst| inst.fields.iter().map(|f| Op::get(inst.path(f.name))))
            .collect()
    }

    /// Fetch every field of every instance in one request.
    ///
    /// All-or-nothing: on any failure the previous cache is kept.
    pub async fn fetch_all(&mut self) -> Result<(), Error> {
        let ops = self.fetch_ops();
        if ops.is_empty() {
            return Ok(());
        }
        let tokens = self.client.query_batch(&ops).await?;
        let fresh = decode_instances(&self.instances, &tokens)?;
        debug!(category = %self.category, instances = fresh.len(), "fetched");
        self.state = fresh;
        Ok(())
    }

    fn resolve(&self, id: &str, field: &str) -> Result<(String, FieldKind, bool), Error> {
        let inst = self.instance(id)?;
        let f = inst.field(field).ok_or_else(|| Error::UnknownField {
            category: self.category,
            instance: id.to_owned(),
            field: field.to_owned(),
        })?;
        Ok((inst.path(field), f.kind, f.writable))
    }

    fn cache(&mut self, id: &str, field: &str, value: Value) -> Result<(), Error> {
        self.state
            .entry(id.to_owned())
            .or_default()
            .set(field, value)
    }

    /// Read one field and update its cached value.
    pub async fn fetch_one(&mut self, id: &str, field: &str) -> Result<Value, Error> {
        let (path, kind, _) = self.resolve(id, field)?;
        let token = self.client.query_one(Op::get(path)).await?;
        let value = kind.decode(&token)?;
        self.cache(id, field, value.clone())?;
        Ok(value)
    }

    /// Write one field.
    ///
    /// The cache takes the written value as soon as the device accepted
    /// the request, without a confirmatory read. The returned value is
    /// what the device echoed for the write.
    pub async fn set_one(
        &mut self,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<Value, Error> {
        let (kind, token) = self.write_one(id, field, value).await?;
        kind.decode(&token)
    }

    /// Send one write and cache the written value. Hands back the raw
    /// echo so callers can chain follow-up writes before decoding it.
    pub(crate) async fn write_one(
        &mut self,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<(FieldKind, String), Error> {
        let (path, kind, writable) = self.resolve(id, field)?;
        if !writable {
            return Err(Error::ReadOnlyField {
                field: path,
            });
        }
        let token = self
            .client
            .query_one(Op::set(path, value.to_wire()))
            .await?;
        self.cache(id, field, value)?;
        Ok((kind, token))
    }

    /// Write every writable field of `desired` for one instance in a
    /// single batched request. Returns the state as echoed by the device.
    pub async fn apply_instance(&mut self, id: &str, desired: &T) -> Result<T, Error> {
        let inst = self.instance(id)?.clone();
        let writes: Vec<(&str, FieldKind, Value)> = inst
            .fields
            .iter()
            .filter(|f| f.writable)
            .filter_map(|f| desired.get(f.name).map(|v| (f.name, f.kind, v)))
            .collect();
        let ops: Vec<Op> = writes
            .iter()
            .map(|(name, _, v)| Op::set(inst.path(name), v.to_wire()))
            .collect();

        let tokens = self.client.query_batch(&ops).await?;

        let mut cached = self.state.get(id).cloned().unwrap_or_default();
        let mut confirmed = cached.clone();
        for (name, _, v) in &writes {
            cached.set(name, v.clone())?;
        }
        self.state.insert(id.to_owned(), cached);

        for ((name, kind, _), token) in writes.iter().zip(&tokens) {
            confirmed.set(name, kind.decode(token)?)?;
        }
        Ok(confirmed)
    }
}

/// Fold a flat token list back into per-instance state, walking the
/// declared instances and fields in order.
pub(crate) fn decode_instances<T: InstanceState>(
    instances: &[Instance],
    tokens: &[String],
) -> Result<IndexMap<String, T>, Error> {
    let expected: usize = instances.iter().map(|i| i.fields.len()).sum();
    if expected != tokens.len() {
        return Err(Error::FieldCountMismatch {
            expected,
            actual: tokens.len(),
            body: tokens.join(";"),
        });
    }

    let mut tokens = tokens.iter();
    let mut out = IndexMap::with_capacity(instances.len());
    for inst in instances {
        let mut state = T::default();
        for (field, token) in inst.fields.iter().zip(tokens.by_ref()) {
            state.set(field.name, field.kind.decode(token)?)?;
        }
        out.insert(inst.id.clone(), state);
    }
    Ok(out)
}
