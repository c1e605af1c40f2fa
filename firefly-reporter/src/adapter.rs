use std::net::UdpSocket;
use std::time::Duration;

use async_trait::async_trait;
use firefly_core::StatusRecord;
use tracing::{debug, info};

/// Transport-class failure: the link itself is broken. Triggers the state
/// machine's reset path, unlike an application-class rejection which is
/// tolerated.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("request timed out")]
    Timeout,
    #[error("adapter reset failed: {0}")]
    Reset(String),
    #[error("transport i/o error: {0}")]
    Io(String),
}

/// Application-level result of one delivery attempt. A rejection means the
/// relay answered but refused the record; the link is fine and the duty
/// cycle continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Accepted,
    Rejected(u16),
}

/// The unreliable network beneath the reporter.
///
/// Everything the state machine knows about the outside world goes through
/// this seam, so recovery behavior can be exercised against a scripted
/// implementation and real hardware can slot in behind it.
#[async_trait]
pub trait Adapter: Send {
    /// Associate with the configured access point / relay. Returns the
    /// address the reporter should stamp on its records.
    async fn associate(&mut self) -> Result<String, TransportError>;

    /// Bounded hardware reset of the network adapter. No retries inside.
    async fn reset(&mut self) -> Result<(), TransportError>;

    /// Drop the current association.
    async fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Attempt to deliver one status record to the relay's ingest endpoint.
    async fn deliver(&mut self, record: &StatusRecord) -> Result<DeliveryOutcome, TransportError>;
}

/// Credentials for the access point the reporter associates with. Opaque to
/// the core; a hardware adapter would hand them to its radio.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct AccessPoint {
    pub ssid: String,
    pub passphrase: String,
}

/// HTTP implementation of [`Adapter`] posting to the relay's `POST /status`
/// endpoint.
pub struct HttpAdapter {
    http: reqwest::Client,
    base_url: String,
    access_point: AccessPoint,
    request_timeout: Duration,
}

impl HttpAdapter {
    pub fn new(
        base_url: impl Into<String>,
        access_point: AccessPoint,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        Ok(Self {
            http: build_client(request_timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_point,
            request_timeout,
        })
    }
}

#[async_trait]
impl Adapter for HttpAdapter {
    async fn associate(&mut self) -> Result<String, TransportError> {
        info!(ssid = %self.access_point.ssid, "joining access point");

        // Probe the relay's liveness endpoint to confirm the link is up.
        let url = format!("{}/status", self.base_url);
        let response = self.http.get(&url).send().await.map_err(classify)?;
        debug!(status = %response.status(), "relay liveness probe answered");

        Ok(local_address().unwrap_or_else(|| "unknown".to_string()))
    }

    async fn reset(&mut self) -> Result<(), TransportError> {
        info!("resetting network adapter");
        // Closest host-side analog of a hardware reset: tear down the
        // client and its connection pool and start clean.
        self.http = build_client(self.request_timeout)?;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        debug!("disassociating");
        Ok(())
    }

    async fn deliver(&mut self, record: &StatusRecord) -> Result<DeliveryOutcome, TransportError> {
        let url = format!("{}/status", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(record)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if status.is_success() {
            Ok(DeliveryOutcome::Accepted)
        } else {
            Ok(DeliveryOutcome::Rejected(status.as_u16()))
        }
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, TransportError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| TransportError::Reset(e.to_string()))
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Io(e.to_string())
    }
}

// Local interface address, discovered by "connecting" a UDP socket outward
// (no packet is sent). Informational only.
fn local_address() -> Option<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    Some(socket.local_addr().ok()?.ip().to_string())
}
