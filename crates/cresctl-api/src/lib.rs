// cresctl-api: Async client for CresControl controllers (plain-text command endpoint)

pub mod client;
pub mod codec;
pub mod error;
pub mod model;
pub mod subsystem;
pub mod transport;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::CresClient;
pub use codec::Op;
pub use error::Error;
pub use model::{Attributes, Category, Field, FieldKind, Instance, InstanceState, Value};
pub use subsystem::fan::{Fan, FanState};
pub use subsystem::inputs::{InputState, Inputs};
pub use subsystem::outputs::{OutputState, Outputs};
pub use subsystem::sensors::{SensorReading, Sensors};
pub use subsystem::switches::{SwitchState, Switches};
pub use subsystem::system::{System, SystemInfo};
pub use subsystem::{InstanceSet, PwmState, Subsystem};
pub use transport::TransportConfig;
