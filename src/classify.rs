//! Error classification: raw attempt failures → normalised [`Classification`].
//!
//! The classifier only states facts (timed out? connection-level? which status?).
//! Whether those facts warrant a retry is decided by the client's policy engine.

use crate::error_code::ErrorKind;
use crate::request::Response;
use crate::transport::{TransportError, TransportErrorCode};
use std::collections::HashSet;
use std::time::Duration;

/// Largest slice of a failed response body kept for diagnostics.
const MAX_BODY_CHARS: usize = 2_048;

/// What went wrong in one attempt, before classification.
#[derive(Debug)]
pub enum RawFailure {
    /// The transport itself failed (DNS, connect, reset, ...).
    Transport(TransportError),
    /// The exchange completed with a non-2xx status.
    Status(Response),
    /// The attempt's deadline fired before the transport returned.
    DeadlineExceeded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub is_timeout: bool,
    pub is_network_error: bool,
    pub status_code: Option<u16>,
}

impl Classification {
    /// Timeout or connection-level failure.
    pub fn is_transient(&self) -> bool {
        self.is_timeout || self.is_network_error
    }

    pub fn kind(&self) -> ErrorKind {
        if self.is_timeout {
            ErrorKind::Timeout
        } else if self.is_network_error {
            ErrorKind::Network
        } else if let Some(status) = self.status_code {
            ErrorKind::from_http_status(status)
        } else {
            ErrorKind::Unknown
        }
    }
}

/// A classified failed attempt, as handed to predicates and observers.
#[derive(Debug, Clone)]
pub struct AttemptFailure {
    pub classification: Classification,
    pub transport_code: Option<TransportErrorCode>,
    pub message: String,
    pub elapsed: Duration,
    pub response_body: Option<String>,
}

impl AttemptFailure {
    /// Failure for a completed response with `status` (no body).
    pub fn for_status(status: u16, elapsed: Duration) -> Self {
        Self {
            classification: Classification {
                is_timeout: false,
                is_network_error: false,
                status_code: Some(status),
            },
            transport_code: None,
            message: format!("Request failed with status {}", status),
            elapsed,
            response_body: None,
        }
    }
}

pub struct ErrorClassifier {
    network_codes: HashSet<TransportErrorCode>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(TransportErrorCode::NETWORK.iter().cloned())
    }
}

impl ErrorClassifier {
    /// `network_codes` is the connection-failure set treated as network errors.
    pub fn new(network_codes: impl IntoIterator<Item = TransportErrorCode>) -> Self {
        Self {
            network_codes: network_codes.into_iter().collect(),
        }
    }

    pub fn classify(
        &self,
        failure: &RawFailure,
        elapsed: Duration,
        timeout: Duration,
    ) -> Classification {
        let over_deadline = elapsed >= timeout;
        match failure {
            RawFailure::DeadlineExceeded => Classification {
                is_timeout: true,
                is_network_error: false,
                status_code: None,
            },
            RawFailure::Transport(e) => Classification {
                is_timeout: over_deadline || e.code().is_timeout(),
                is_network_error: self.network_codes.contains(e.code()),
                status_code: None,
            },
            // The exchange finished inside the deadline future, so a late clock reading is not a timeout.
            RawFailure::Status(resp) => Classification {
                is_timeout: false,
                is_network_error: false,
                status_code: Some(resp.status()),
            },
        }
    }

    /// Classify and package the details predicates and observers need.
    pub fn describe(
        &self,
        failure: &RawFailure,
        elapsed: Duration,
        timeout: Duration,
    ) -> AttemptFailure {
        let classification = self.classify(failure, elapsed, timeout);
        match failure {
            RawFailure::DeadlineExceeded => AttemptFailure {
                classification,
                transport_code: None,
                message: format!("Request timed out after {}ms", timeout.as_millis()),
                elapsed,
                response_body: None,
            },
            RawFailure::Transport(e) => AttemptFailure {
                message: if classification.is_network_error {
                    format!("Network error: {}", e)
                } else {
                    e.to_string()
                },
                classification,
                transport_code: Some(e.code().clone()),
                elapsed,
                response_body: None,
            },
            RawFailure::Status(resp) => {
                let mut body = resp.text();
                if body.chars().count() > MAX_BODY_CHARS {
                    body = body.chars().take(MAX_BODY_CHARS).collect();
                }
                AttemptFailure {
                    classification,
                    transport_code: None,
                    message: format!("Request failed with status {}", resp.status()),
                    elapsed,
                    response_body: if body.is_empty() { None } else { Some(body) },
                }
            }
        }
    }
}
