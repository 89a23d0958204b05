use core::fmt;

use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    config::EndpointConfig,
    payload::{DevicePayload, ProvisionReply},
    wifi::Station,
};

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const API_KEY_HEADER: &str = "X-API-Key";
pub const MAX_RESPONSE_BODY: usize = 4096;

/// A completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Collects a response body in chunks, keeping at most `cap` bytes.
/// Bytes past the cap are counted, not stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBody {
    bytes: Vec<u8>,
    cap: usize,
    dropped: usize,
}

impl Default for ResponseBody {
    fn default() -> Self {
        Self::with_cap(MAX_RESPONSE_BODY)
    }
}

impl ResponseBody {
    pub fn with_cap(cap: usize) -> Self {
        Self {
            bytes: Vec::new(),
            cap,
            dropped: 0,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        let room = self.cap.saturating_sub(self.bytes.len());
        let kept = room.min(chunk.len());
        self.bytes.extend_from_slice(&chunk[..kept]);
        self.dropped += chunk.len() - kept;
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn is_truncated(&self) -> bool {
        self.dropped > 0
    }

    pub fn into_response(self, status: u16) -> HttpResponse {
        if self.is_truncated() {
            warn!(
                "response body truncated to {} bytes ({} bytes dropped)",
                self.cap, self.dropped
            );
        }
        HttpResponse {
            status,
            body: String::from_utf8_lossy(&self.bytes).into_owned(),
        }
    }
}

/// Failure below HTTP, reported as the transport's negative result code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection refused")]
    ConnectionRefused,
    #[error("failed to send headers")]
    SendHeaderFailed,
    #[error("failed to send payload")]
    SendPayloadFailed,
    #[error("not connected")]
    NotConnected,
    #[error("connection lost")]
    ConnectionLost,
    #[error("read timeout")]
    ReadTimeout,
    #[error("transport error {code}: {message}")]
    Platform { code: i32, message: String },
}

impl TransportError {
    pub fn code(&self) -> i32 {
        match self {
            Self::ConnectionRefused => -1,
            Self::SendHeaderFailed => -2,
            Self::SendPayloadFailed => -3,
            Self::NotConnected => -4,
            Self::ConnectionLost => -5,
            Self::ReadTimeout => -11,
            Self::Platform { code, .. } => -code.saturating_abs(),
        }
    }
}

/// Blocking HTTP client used by the reporter.
pub trait Transport {
    fn post_json(
        &mut self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> Result<HttpResponse, TransportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Provision,
    Ping,
}

impl ReportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Provision => "provision",
            Self::Ping => "ping",
        }
    }

    fn announce(self) -> &'static str {
        match self {
            Self::Provision => "Provisioning with MAC",
            Self::Ping => "Pinging server with MAC",
        }
    }

    fn disconnected(self) -> &'static str {
        match self {
            Self::Provision => "WiFi Disconnected. Cannot provision.",
            Self::Ping => "WiFi Disconnected. Cannot ping.",
        }
    }

    fn status_label(self) -> &'static str {
        match self {
            Self::Provision => "HTTP Response code",
            Self::Ping => "Ping response code",
        }
    }

    fn error_label(self) -> &'static str {
        match self {
            Self::Provision => "Error on sending POST",
            Self::Ping => "Error on ping",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    Delivered {
        kind: ReportKind,
        status: u16,
        body: String,
    },
    TransportFailed {
        kind: ReportKind,
        code: i32,
    },
    Disconnected {
        kind: ReportKind,
    },
    Skipped {
        kind: ReportKind,
        reason: String,
    },
}

impl ReportOutcome {
    pub fn kind(&self) -> ReportKind {
        match self {
            Self::Delivered { kind, .. }
            | Self::TransportFailed { kind, .. }
            | Self::Disconnected { kind }
            | Self::Skipped { kind, .. } => *kind,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

impl fmt::Display for ReportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered { kind, status, body } => {
                write!(f, "{}: {status}\n{body}", kind.status_label())
            }
            Self::TransportFailed { kind, code } => {
                write!(f, "{}: {code}", kind.error_label())
            }
            Self::Disconnected { kind } => f.write_str(kind.disconnected()),
            Self::Skipped { kind, reason } => {
                write!(f, "Cannot {}: {reason}", kind.as_str())
            }
        }
    }
}

/// Fires one POST per call and logs what came back. No retries.
#[derive(Debug, Clone)]
pub struct Reporter {
    endpoints: EndpointConfig,
}

impl Reporter {
    pub fn new(endpoints: EndpointConfig) -> Self {
        Self { endpoints }
    }

    pub fn url(&self, kind: ReportKind) -> &str {
        match kind {
            ReportKind::Provision => &self.endpoints.provision_url,
            ReportKind::Ping => &self.endpoints.ping_url,
        }
    }

    pub fn headers(&self, kind: ReportKind) -> Vec<(&'static str, &str)> {
        let mut headers = vec![("Content-Type", CONTENT_TYPE_JSON)];
        if kind == ReportKind::Provision {
            if let Some(key) = self.endpoints.api_key.as_deref() {
                headers.push((API_KEY_HEADER, key));
            }
        }
        headers
    }

    pub fn report<S, T>(&self, kind: ReportKind, station: &S, transport: &mut T) -> ReportOutcome
    where
        S: Station + ?Sized,
        T: Transport + ?Sized,
    {
        if !station.is_connected() {
            let outcome = ReportOutcome::Disconnected { kind };
            warn!("{outcome}");
            return outcome;
        }

        let payload = match station.mac_address() {
            Ok(mac) => DevicePayload::new(mac),
            Err(err) => {
                let outcome = ReportOutcome::Skipped {
                    kind,
                    reason: err.to_string(),
                };
                warn!("{outcome}");
                return outcome;
            }
        };

        let body = match payload.to_json() {
            Ok(body) => body,
            Err(err) => {
                let outcome = ReportOutcome::Skipped {
                    kind,
                    reason: format!("payload encoding failed: {err}"),
                };
                warn!("{outcome}");
                return outcome;
            }
        };

        info!("{}: {}", kind.announce(), payload.mac);

        let headers = self.headers(kind);
        let outcome = match transport.post_json(self.url(kind), &headers, &body) {
            Ok(response) => ReportOutcome::Delivered {
                kind,
                status: response.status,
                body: response.body,
            },
            Err(err) => {
                debug!("{} transport error: {err}", kind.as_str());
                ReportOutcome::TransportFailed {
                    kind,
                    code: err.code(),
                }
            }
        };

        match &outcome {
            ReportOutcome::Delivered { body, .. } => {
                info!("{outcome}");
                if kind == ReportKind::Provision {
                    if let Some(id) = ProvisionReply::parse(body)
                        .as_ref()
                        .and_then(ProvisionReply::device_id_string)
                    {
                        info!("device id: {id}");
                    }
                }
            }
            _ => warn!("{outcome}"),
        }

        outcome
    }
}
