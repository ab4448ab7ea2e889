use thiserror::Error;

use crate::model::Category;

/// Top-level error type for the `cresctl-api` crate.
///
/// Covers every failure mode between a typed subsystem call and the
/// device: transport, HTTP, the plain-text protocol, and value decoding.
/// `cresctl-core` wraps these into its communication/update errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// Host unreachable, connection refused, or the body could not be read.
    #[error("Cannot reach device at {url}: {reason}")]
    Connection { url: String, reason: String },

    /// Request exceeded the configured transport timeout.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Invalid device address.
    #[error("Invalid device address: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── HTTP ────────────────────────────────────────────────────────
    /// Device answered with a non-success status code.
    #[error("HTTP {status} from device")]
    Http { status: u16 },

    /// Device answered with a body that is neither plain nor structured text.
    #[error("Unsupported content type: {content_type}")]
    UnsupportedContentType { content_type: String },

    // ── Protocol ────────────────────────────────────────────────────
    /// Response body carried the device's `error` convention.
    #[error("Device reported an error: {body}")]
    DeviceError { body: String },

    /// Number of `;`-separated tokens did not match the request's schema.
    #[error("Expected {expected} fields in response, got {actual}: {body:?}")]
    FieldCountMismatch {
        expected: usize,
        actual: usize,
        body: String,
    },

    /// A batched request with no operations.
    #[error("Cannot encode an empty batch: {message}")]
    Encoding { message: String },

    // ── Values ──────────────────────────────────────────────────────
    /// A token could not be converted into the field's declared type.
    #[error("Invalid {expected} value {token:?}")]
    Type {
        token: String,
        expected: &'static str,
    },

    /// Instance id not declared for this category.
    #[error("Unknown {category} instance '{instance}'")]
    UnknownInstance { category: Category, instance: String },

    /// Field not part of the instance's schema (e.g. PWM on a non-PWM output).
    #[error("{category} instance '{instance}' has no field '{field}'")]
    UnknownField {
        category: Category,
        instance: String,
        field: String,
    },

    /// Field is declared but cannot be written.
    #[error("Field '{field}' is read-only")]
    ReadOnlyField { field: String },
}

impl Error {
    /// Returns `true` for failures that never reached a device response
    /// (unreachable host, refused connection, timeout).
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }

    /// Returns `true` for protocol-level failures: a device-reported error
    /// or a response whose shape does not match the request.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Self::DeviceError { .. } | Self::FieldCountMismatch { .. }
        )
    }

    /// Classify a `reqwest` failure against the configured timeout.
    pub(crate) fn from_reqwest(err: &reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            return Self::Timeout { timeout_secs };
        }
        if let Some(status) = err.status() {
            return Self::Http {
                status: status.as_u16(),
            };
        }
        Self::Connection {
            url: err
                .url()
                .map_or_else(|| "<unknown>".into(), ToString::to_string),
            reason: err.to_string(),
        }
    }
}
