// ── Core error types ──
//
// Consumer-facing errors from cresctl-core. Transport and protocol
// failures from cresctl-api arrive wrapped as `Communication`; refresh
// cycles collapse per-subsystem failures into a single `UpdateFailed`.

use thiserror::Error;

use cresctl_api::Category;

use crate::model::SubsystemFailure;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Setup ────────────────────────────────────────────────────────
    /// The initial scan could not fetch a mandatory category.
    #[error("Device initialization failed while scanning {category}: {source}")]
    Initialization {
        category: Category,
        #[source]
        source: cresctl_api::Error,
    },

    /// Reserved: the device protocol carries no authentication signal,
    /// so nothing constructs this today.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Communication ────────────────────────────────────────────────
    #[error(transparent)]
    Communication(#[from] cresctl_api::Error),

    /// One or more subsystems failed during a refresh cycle. Data from
    /// the subsystems that succeeded has already been applied.
    #[error("Update failed for {}", summarize(failures))]
    UpdateFailed { failures: Vec<SubsystemFailure> },

    // ── Data ─────────────────────────────────────────────────────────
    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    #[error("Invalid coordinator state: {message}")]
    InvalidState { message: String },
}

impl CoreError {
    /// `true` when the device could not be reached at all.
    pub fn is_connection(&self) -> bool {
        match self {
            Self::Communication(e) | Self::Initialization { source: e, .. } => e.is_connection(),
            Self::UpdateFailed { failures } => failures.iter().all(|f| f.connection),
            _ => false,
        }
    }
}

fn summarize(failures: &[SubsystemFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.category, f.message))
        .collect::<Vec<_>>()
        .join(", ")
}
