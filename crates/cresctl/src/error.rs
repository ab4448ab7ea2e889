//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use cresctl_config::ConfigError;
use cresctl_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to device at {url}")]
    #[diagnostic(
        code(cresctl::connection_failed),
        help(
            "Check that the device is powered and on the same network.\n\
             Address: {url}"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Device at {address} did not answer")]
    #[diagnostic(
        code(cresctl::unreachable),
        help("Verify the host with: cresctl config show")
    )]
    Unreachable { address: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(cresctl::timeout),
        help("Increase timeout with --timeout or check device responsiveness.")
    )]
    Timeout { seconds: u64 },

    #[error("Authentication failed: {message}")]
    #[diagnostic(code(cresctl::auth_failed))]
    AuthFailed { message: String },

    // ── Device ───────────────────────────────────────────────────────
    #[error("Scanning {category} failed: {message}")]
    #[diagnostic(
        code(cresctl::scan_failed),
        help("The device did not answer the initial scan; check the profile's instance lists.")
    )]
    ScanFailed {
        category: String,
        message: String,
        connection: bool,
    },

    #[error("Device error: {message}")]
    #[diagnostic(code(cresctl::device_error))]
    Device { message: String },

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(cresctl::not_found),
        help("Run: cresctl status to see available instances")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(cresctl::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(cresctl::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: cresctl config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No device configured")]
    #[diagnostic(
        code(cresctl::no_config),
        help(
            "Create a profile with: cresctl config init\n\
             Or pass --host / set CRESCTL_HOST.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(cresctl::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(cresctl::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(cresctl::output))]
    Output(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Unreachable { .. } => exit_code::CONNECTION,
            Self::ScanFailed {
                connection: true, ..
            } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<cresctl_core::ApiError> for CliError {
    fn from(err: cresctl_core::ApiError) -> Self {
        use cresctl_core::ApiError;

        match err {
            ApiError::Connection { url, reason } => Self::ConnectionFailed {
                url,
                source: reason.into(),
            },
            ApiError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            ApiError::UnknownInstance { category, instance } => Self::NotFound {
                resource_type: category.to_string(),
                identifier: instance,
            },
            ApiError::UnknownField {
                category,
                instance,
                field,
            } => Self::NotFound {
                resource_type: "field".into(),
                identifier: format!("{category}/{instance}/{field}"),
            },
            ApiError::ReadOnlyField { field } => Self::Validation {
                field,
                reason: "field is read-only".into(),
            },
            ApiError::Type { token, expected } => Self::Validation {
                field: "value".into(),
                reason: format!("expected {expected}, got {token:?}"),
            },
            ApiError::InvalidUrl(e) => Self::Validation {
                field: "host".into(),
                reason: e.to_string(),
            },
            other => Self::Device {
                message: other.to_string(),
            },
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Communication(api) => api.into(),

            CoreError::Initialization { category, source } => Self::ScanFailed {
                category: category.to_string(),
                connection: source.is_connection(),
                message: source.to_string(),
            },

            CoreError::Authentication { message } => Self::AuthFailed { message },

            CoreError::DeviceNotFound { identifier } => Self::NotFound {
                resource_type: "device".into(),
                identifier,
            },

            e @ (CoreError::UpdateFailed { .. } | CoreError::InvalidState { .. }) => {
                Self::Device {
                    message: e.to_string(),
                }
            }
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}
