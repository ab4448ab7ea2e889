// cresctl-core: Device registry and polling coordinator between cresctl-api and consumers.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod registry;
pub mod subsystems;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{CoordinatorConfig, DEFAULT_POLL_INTERVAL};
pub use coordinator::{Coordinator, CoordinatorState, RefreshOutcome, RefreshScope};
pub use error::CoreError;
pub use model::{CycleOutcome, DeviceEntry, Snapshot, SubsystemFailure};
pub use registry::Registry;
pub use subsystems::Subsystems;

// Re-export the api types consumers need alongside snapshots.
pub use cresctl_api::{Attributes, Category, Error as ApiError, FieldKind, SystemInfo, Value};
