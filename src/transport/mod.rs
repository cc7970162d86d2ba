//! Transport seam: perform exactly one HTTP request under a deadline.
//!
//! The resilience layer never opens sockets itself. It drives a [`Transport`],
//! which is [`HttpTransport`] (reqwest) in production and a scripted fake in tests.

pub mod http;

pub use http::HttpTransport;

use crate::request::{RequestDescriptor, Response};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// One request, one response (or one transport failure). No retries here.
///
/// Implementations should honour `deadline` themselves where they can; the client
/// also enforces it from the outside and drops the future when it expires.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: &RequestDescriptor,
        deadline: Duration,
    ) -> std::result::Result<Response, TransportError>;
}

/// Transport-level error identifier, spelled the way socket libraries report them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransportErrorCode {
    /// ECONNRESET
    ConnectionReset,
    /// ENOTFOUND
    DnsNotFound,
    /// ECONNREFUSED
    ConnectionRefused,
    /// ETIMEDOUT
    ConnectTimeout,
    /// ESOCKETTIMEDOUT
    SocketTimeout,
    /// ESOCKET
    Socket,
    /// EAI_AGAIN
    DnsTemporary,
    /// Anything else the transport reports (e.g. `EDECODE`).
    Other(String),
}

impl TransportErrorCode {
    /// The connection-failure set classified as network errors by default.
    pub const NETWORK: [TransportErrorCode; 7] = [
        TransportErrorCode::ConnectionReset,
        TransportErrorCode::DnsNotFound,
        TransportErrorCode::ConnectionRefused,
        TransportErrorCode::ConnectTimeout,
        TransportErrorCode::SocketTimeout,
        TransportErrorCode::Socket,
        TransportErrorCode::DnsTemporary,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::ConnectionReset => "ECONNRESET",
            Self::DnsNotFound => "ENOTFOUND",
            Self::ConnectionRefused => "ECONNREFUSED",
            Self::ConnectTimeout => "ETIMEDOUT",
            Self::SocketTimeout => "ESOCKETTIMEDOUT",
            Self::Socket => "ESOCKET",
            Self::DnsTemporary => "EAI_AGAIN",
            Self::Other(code) => code.as_str(),
        }
    }

    /// Codes that by themselves mean "the deadline was hit".
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectTimeout | Self::SocketTimeout)
    }

    pub fn parse(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "ECONNRESET" => Self::ConnectionReset,
            "ENOTFOUND" => Self::DnsNotFound,
            "ECONNREFUSED" => Self::ConnectionRefused,
            "ETIMEDOUT" => Self::ConnectTimeout,
            "ESOCKETTIMEDOUT" => Self::SocketTimeout,
            "ESOCKET" => Self::Socket,
            "EAI_AGAIN" => Self::DnsTemporary,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for TransportErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for TransportErrorCode {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<TransportErrorCode> for String {
    fn from(code: TransportErrorCode) -> Self {
        code.as_str().to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error ({code}): {source}")]
    Http {
        code: TransportErrorCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Transport error ({code}): {message}")]
    Other {
        code: TransportErrorCode,
        message: String,
    },
}

impl TransportError {
    pub fn new(code: TransportErrorCode, message: impl Into<String>) -> Self {
        TransportError::Other {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> &TransportErrorCode {
        match self {
            TransportError::Http { code, .. } | TransportError::Other { code, .. } => code,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::Http {
            code: http::code_for(&e),
            source: e,
        }
    }
}
