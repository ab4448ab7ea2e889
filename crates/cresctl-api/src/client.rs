// CresControl HTTP client
//
// Wraps `reqwest::Client` with the device's single command endpoint:
// `GET /command?query=<batched-command-string>`. Every subsystem client
// shares one `CresClient`; it is cheap to clone.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tracing::{debug, trace, warn};
use url::Url;

use crate::codec::{self, Op};
use crate::error::Error;
use crate::transport::TransportConfig;

/// Raw client for the device's plain-text command endpoint.
///
/// Performs exactly one request-response exchange per call. No retries,
/// no pooling guarantees beyond what `reqwest` does by default.
#[derive(Debug, Clone)]
pub struct CresClient {
    http: reqwest::Client,
    address: String,
    base_url: Url,
    timeout: Duration,
}

impl CresClient {
    /// Create a client for `address` (`host`, `host:port`, or a full
    /// `http://` URL).
    pub fn new(address: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let mut client = Self::with_client(http, address)?;
        client.timeout = transport.timeout;
        Ok(client)
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, address: &str) -> Result<Self, Error> {
        let base_url = if address.contains("://") {
            Url::parse(address)?
        } else {
            Url::parse(&format!("http://{address}"))?
        };
        Ok(Self {
            http,
            address: address.to_owned(),
            base_url,
            timeout: crate::transport::DEFAULT_TIMEOUT,
        })
    }

    /// The device address as given at construction.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Build `{base}/command?query={query}`.
    ///
    /// `;`, `:` and `=` are left unescaped; the device expects them verbatim.
    pub(crate) fn command_url(&self, query: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path("/command");
        url.set_query(Some(&format!("query={query}")));
        url
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send one query string and return the raw response body.
    pub async fn query(&self, query: &str) -> Result<String, Error> {
        let url = self.command_url(query);
        debug!(query, "GET /command");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(&e, self.timeout.as_secs()))?;

        let status = resp.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), query, "device returned error status");
            return Err(Error::Http {
                status: status.as_u16(),
            });
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_ascii_lowercase);

        let body = resp
            .text()
            .await
            .map_err(|e| Error::from_reqwest(&e, self.timeout.as_secs()))?;
        trace!(body = %body, "response");

        match content_type.as_deref() {
            Some(ct) if ct.contains("text/plain") || ct.contains("application/json") => Ok(body),
            None if body.is_empty() => Ok(body),
            other => Err(Error::UnsupportedContentType {
                content_type: other.unwrap_or("<none>").to_owned(),
            }),
        }
    }

    /// Encode `ops`, send them as one request, and decode exactly one
    /// token per operation.
    pub async fn query_batch(&self, ops: &[Op]) -> Result<Vec<String>, Error> {
        let query = codec::encode_batch(ops)?;
        let body = self.query(&query).await?;
        codec::decode_batch(&body, ops.len())
    }

    /// Single get or set round trip returning the one response token.
    pub async fn query_one(&self, op: Op) -> Result<String, Error> {
        let mut tokens = self.query_batch(std::slice::from_ref(&op)).await?;
        Ok(tokens.pop().unwrap_or_default())
    }
}
