// ── Polling coordinator ──
//
// Lifecycle for one managed device: initial scan, periodic refresh,
// on-demand refresh and typed writes. Every path that touches the
// subsystem caches or the registry goes through one engine lock, so at
// most one refresh or write is in flight per device.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use strum::Display;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use cresctl_api::{Category, CresClient, SystemInfo, Value};

use crate::config::CoordinatorConfig;
use crate::error::CoreError;
use crate::model::{CycleOutcome, DeviceEntry, Snapshot, SubsystemFailure};
use crate::registry::Registry;
use crate::subsystems::{CYCLE_ORDER, Subsystems};

// ── State ────────────────────────────────────────────────────────

/// Coordinator lifecycle state, observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CoordinatorState {
    Uninitialized,
    Ready,
    Refreshing,
    /// Setup failed; terminal for this instance.
    Failed,
}

/// What a refresh request targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshScope {
    All,
    Category(Category),
    /// Unique id or plain instance id (see [`Registry::find`]).
    Device(String),
}

/// Result of a refresh request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Completed,
    /// Another refresh held the lock; nothing was done.
    Skipped,
}

// ── Coordinator ──────────────────────────────────────────────────

/// Entry point for consumers.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: CoordinatorConfig,
    engine: Mutex<Engine>,
    state: watch::Sender<CoordinatorState>,
    snapshot: watch::Sender<Arc<Snapshot>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

/// Everything the single-flight lock protects.
struct Engine {
    subsystems: Subsystems,
    registry: Option<Registry>,
    last_cycle: Option<CycleOutcome>,
}

impl Engine {
    fn registry_mut(&mut self) -> Result<&mut Registry, CoreError> {
        self.registry.as_mut().ok_or_else(not_started)
    }
}

fn not_started() -> CoreError {
    CoreError::InvalidState {
        message: "coordinator has not been started".into(),
    }
}

impl Coordinator {
    /// Build a coordinator. Does NOT contact the device; call
    /// [`start()`](Self::start) to scan and begin polling.
    pub fn new(config: CoordinatorConfig) -> Result<Self, CoreError> {
        let client = CresClient::new(&config.address, &config.transport())?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: CoordinatorConfig, client: CresClient) -> Self {
        let subsystems = Subsystems::new(&client, &config);
        let (state, _) = watch::channel(CoordinatorState::Uninitialized);
        let (snapshot, _) = watch::channel(Arc::new(Snapshot::default()));

        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                engine: Mutex::new(Engine {
                    subsystems,
                    registry: None,
                    last_cycle: None,
                }),
                state,
                snapshot,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Scan the device and, if a poll interval is configured, schedule
    /// periodic refreshes. A failed scan leaves the coordinator `Failed`;
    /// it is never retried.
    pub async fn start(&self) -> Result<(), CoreError> {
        self.ensure_startable(false)?;

        let mut engine = self.inner.engine.lock().await;
        // A concurrent start may have scanned while this one waited.
        self.ensure_startable(engine.registry.is_some())?;

        let scanned = Registry::scan(&self.inner.config.address, &mut engine.subsystems).await;
        let registry = match scanned {
            Ok(registry) => registry,
            Err(e) => {
                self.inner.state.send_replace(CoordinatorState::Failed);
                warn!(error = %e, "device scan failed");
                return Err(e);
            }
        };
        self.publish(&registry, None);
        engine.registry = Some(registry);
        drop(engine);

        self.inner.state.send_replace(CoordinatorState::Ready);

        let interval = self.inner.config.poll_interval;
        if !interval.is_zero() {
            let coordinator = self.clone();
            let cancel = self.inner.cancel.clone();
            self.inner
                .task_handles
                .lock()
                .await
                .push(tokio::spawn(refresh_task(coordinator, interval, cancel)));
        }

        info!(address = %self.inner.config.address, "coordinator started");
        Ok(())
    }

    fn ensure_startable(&self, scanned: bool) -> Result<(), CoreError> {
        if scanned {
            return Err(CoreError::InvalidState {
                message: "coordinator is already started".into(),
            });
        }
        let current = self.state();
        if current != CoordinatorState::Uninitialized {
            return Err(CoreError::InvalidState {
                message: format!("cannot start a coordinator in state '{current}'"),
            });
        }
        Ok(())
    }

    /// Cancel the periodic schedule and wait for the task to exit. A
    /// refresh already in flight is allowed to finish.
    pub async fn stop(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("coordinator stopped");
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Fetch every cycle category in order, applying each success.
    ///
    /// Returns `Skipped` without touching anything if another refresh or
    /// write holds the lock. Returns `UpdateFailed` if any subsystem
    /// failed; the others' data is applied regardless.
    pub async fn refresh_all(&self) -> Result<RefreshOutcome, CoreError> {
        let Ok(mut guard) = self.inner.engine.try_lock() else {
            debug!("refresh already in flight; skipping");
            return Ok(RefreshOutcome::Skipped);
        };
        let engine = &mut *guard;
        let registry = engine.registry.as_mut().ok_or_else(not_started)?;

        self.inner.state.send_replace(CoordinatorState::Refreshing);

        let mut failures = Vec::new();
        for category in CYCLE_ORDER {
            match engine.subsystems.fetch(category).await {
                Ok(attrs) => registry.apply_update(category, attrs),
                Err(e) => {
                    warn!(%category, error = %e, "subsystem refresh failed");
                    failures.push(SubsystemFailure {
                        category,
                        message: e.to_string(),
                        connection: e.is_connection(),
                    });
                }
            }
        }

        let outcome = if failures.is_empty() {
            CycleOutcome::Ok
        } else {
            CycleOutcome::Failed {
                failures: failures.clone(),
            }
        };
        engine.last_cycle = Some(outcome.clone());
        self.publish(registry, Some(outcome));
        self.inner.state.send_replace(CoordinatorState::Ready);

        if failures.is_empty() {
            debug!(devices = registry.len(), "refresh cycle complete");
            Ok(RefreshOutcome::Completed)
        } else {
            Err(CoreError::UpdateFailed { failures })
        }
    }

    /// Refresh one category (or the category of one device) and merge
    /// the result. Waits for the lock and propagates any failure.
    pub async fn refresh_one(&self, scope: RefreshScope) -> Result<RefreshOutcome, CoreError> {
        let mut guard = self.inner.engine.lock().await;
        let engine = &mut *guard;
        let registry = engine.registry.as_mut().ok_or_else(not_started)?;

        let category = match scope {
            RefreshScope::All => {
                drop(guard);
                return self.refresh_all().await;
            }
            RefreshScope::Category(category) => category,
            RefreshScope::Device(id) => {
                registry
                    .find(&id)
                    .ok_or(CoreError::DeviceNotFound { identifier: id })?
                    .category
            }
        };

        let attrs = engine.subsystems.fetch(category).await?;
        registry.apply_update(category, attrs);
        self.publish(registry, engine.last_cycle.clone());
        debug!(%category, "targeted refresh complete");
        Ok(RefreshOutcome::Completed)
    }

    pub async fn request_refresh(&self, scope: RefreshScope) -> Result<RefreshOutcome, CoreError> {
        match scope {
            RefreshScope::All => self.refresh_all().await,
            scope => self.refresh_one(scope).await,
        }
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Connectivity check; does not require `start()`.
    pub async fn test_connection(&self) -> bool {
        let engine = self.inner.engine.lock().await;
        engine.subsystems.system.test_connection().await
    }

    pub async fn device_type(&self) -> Result<String, CoreError> {
        let engine = self.inner.engine.lock().await;
        Ok(engine.subsystems.system.device_type().await?)
    }

    /// Fetch the system subsystem on demand. Merged into the registry
    /// when the coordinator has been started.
    pub async fn system_info(&self) -> Result<SystemInfo, CoreError> {
        let mut guard = self.inner.engine.lock().await;
        let engine = &mut *guard;
        let attrs = engine.subsystems.fetch(Category::System).await?;
        if let Some(registry) = engine.registry.as_mut() {
            registry.apply_update(Category::System, attrs);
            self.publish(registry, engine.last_cycle.clone());
        }
        Ok(engine.subsystems.system.info())
    }

    /// Read one field from the device and merge it into the registry.
    pub async fn get_value(
        &self,
        category: Category,
        instance: &str,
        field: &str,
    ) -> Result<Value, CoreError> {
        let mut guard = self.inner.engine.lock().await;
        let engine = &mut *guard;
        let value = engine.subsystems.fetch_one(category, instance, field).await?;
        self.merge_cached(engine, category);
        Ok(value)
    }

    /// Parse `raw` according to the field's declared kind.
    pub async fn parse_value(
        &self,
        category: Category,
        instance: &str,
        field: &str,
        raw: &str,
    ) -> Result<Value, CoreError> {
        let engine = self.inner.engine.lock().await;
        let declared = engine
            .subsystems
            .field(category, instance, field)
            .ok_or_else(|| CoreError::DeviceNotFound {
                identifier: format!("{category}/{instance}/{field}"),
            })?;
        Ok(Value::parse_as(declared.kind, raw)?)
    }

    pub fn state(&self) -> CoordinatorState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<CoordinatorState> {
        self.inner.state.subscribe()
    }

    /// Copy of the last published registry state.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.inner.snapshot.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.inner.snapshot.subscribe()
    }

    /// Copies of every registry entry in scan order.
    pub async fn devices(&self) -> Vec<DeviceEntry> {
        let engine = self.inner.engine.lock().await;
        engine
            .registry
            .as_ref()
            .map(|r| r.entries().cloned().collect())
            .unwrap_or_default()
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Generic single-field write. Returns the value echoed by the device.
    pub async fn set_value(
        &self,
        category: Category,
        instance: &str,
        field: &str,
        value: Value,
    ) -> Result<Value, CoreError> {
        let mut guard = self.inner.engine.lock().await;
        let engine = &mut *guard;
        let result = engine
            .subsystems
            .set_one(category, instance, field, value)
            .await;
        // a write the device accepted is cached even when its echo is bad
        self.merge_cached(engine, category);
        Ok(result?)
    }

    /// Disabling also forces the duty cycle to zero.
    pub async fn set_fan_enabled(&self, enabled: bool) -> Result<bool, CoreError> {
        let mut guard = self.inner.engine.lock().await;
        let engine = &mut *guard;
        let result = engine.subsystems.fan.set_enabled(enabled).await;
        // the enable write may have landed even if the duty write failed
        self.merge_cached(engine, Category::Fan);
        Ok(result?)
    }

    pub async fn set_fan_duty_cycle(&self, duty: f64) -> Result<f64, CoreError> {
        let mut guard = self.inner.engine.lock().await;
        let engine = &mut *guard;
        let confirmed = engine.subsystems.fan.set_duty_cycle(duty).await?;
        self.merge_cached(engine, Category::Fan);
        Ok(confirmed)
    }

    pub async fn set_fan_duty_cycle_min(&self, duty: f64) -> Result<f64, CoreError> {
        let mut guard = self.inner.engine.lock().await;
        let engine = &mut *guard;
        let confirmed = engine.subsystems.fan.set_duty_cycle_min(duty).await?;
        self.merge_cached(engine, Category::Fan);
        Ok(confirmed)
    }

    pub async fn set_output_enabled(&self, id: &str, enabled: bool) -> Result<bool, CoreError> {
        let mut guard = self.inner.engine.lock().await;
        let engine = &mut *guard;
        let confirmed = engine.subsystems.outputs.set_enabled(id, enabled).await?;
        self.merge_cached(engine, Category::Output);
        Ok(confirmed)
    }

    pub async fn set_output_voltage(&self, id: &str, voltage: f64) -> Result<f64, CoreError> {
        let mut guard = self.inner.engine.lock().await;
        let engine = &mut *guard;
        let confirmed = engine.subsystems.outputs.set_voltage(id, voltage).await?;
        self.merge_cached(engine, Category::Output);
        Ok(confirmed)
    }

    pub async fn set_switch_enabled(&self, id: &str, enabled: bool) -> Result<bool, CoreError> {
        let mut guard = self.inner.engine.lock().await;
        let engine = &mut *guard;
        let confirmed = engine.subsystems.switches.set_enabled(id, enabled).await?;
        self.merge_cached(engine, Category::Switch);
        Ok(confirmed)
    }

    pub async fn set_switch_duty_cycle(&self, id: &str, duty: f64) -> Result<f64, CoreError> {
        let mut guard = self.inner.engine.lock().await;
        let engine = &mut *guard;
        let confirmed = engine.subsystems.switches.set_duty_cycle(id, duty).await?;
        self.merge_cached(engine, Category::Switch);
        Ok(confirmed)
    }

    pub async fn reboot(&self) -> Result<(), CoreError> {
        let engine = self.inner.engine.lock().await;
        engine.subsystems.system.reboot().await?;
        info!(address = %self.inner.config.address, "reboot requested");
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────

    /// Push a category's cached subsystem state into the registry.
    fn merge_cached(&self, engine: &mut Engine, category: Category) {
        let attrs = engine.subsystems.attributes(category);
        let last_cycle = engine.last_cycle.clone();
        if let Ok(registry) = engine.registry_mut() {
            registry.apply_update(category, attrs);
            self.publish(registry, last_cycle);
        }
    }

    fn publish(&self, registry: &Registry, last_cycle: Option<CycleOutcome>) {
        let snapshot = registry.snapshot(Some(Utc::now()), last_cycle);
        self.inner.snapshot.send_replace(Arc::new(snapshot));
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Periodically run a refresh cycle until cancelled.
async fn refresh_task(coordinator: Coordinator, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                match coordinator.refresh_all().await {
                    Ok(RefreshOutcome::Completed) => {}
                    Ok(RefreshOutcome::Skipped) => debug!("tick dropped; refresh in flight"),
                    Err(e) => warn!(error = %e, "periodic refresh failed"),
                }
            }
        }
    }
}
