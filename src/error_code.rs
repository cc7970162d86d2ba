//! Terminal error taxonomy.
//!
//! Every error that crosses the client boundary maps onto one [`ErrorKind`].
//! Integrations use the kind (or its stable code) to decide whether to alert,
//! queue the work for later, or drop it silently.
//!
//! ## Codes
//!
//! | Prefix | Category    | Description                          |
//! |--------|-------------|--------------------------------------|
//! | E1xxx  | client      | The remote rejected the request      |
//! | E2xxx  | network     | DNS / connect / socket failures      |
//! | E3xxx  | server      | Remote failures worth retrying later |
//! | E4xxx  | operational | Breaker rejections and cancellations |
//! | E9xxx  | unknown     | Catch-all / unclassified             |
//!
//! ## Example
//!
//! ```rust
//! use outbound_resilience::ErrorKind;
//!
//! let kind = ErrorKind::from_http_status(503);
//! assert_eq!(kind.code(), "E3001");
//! assert!(kind.transient());
//! assert_eq!(kind.category(), "server");
//! ```

use std::fmt;

/// Normalised class of a terminal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// E1001: Non-retryable status (typically 4xx)
    Client,
    /// E1002: Invalid request descriptor or policy
    Configuration,
    /// E2001: DNS or connect-level failure
    Network,
    /// E3001: Retryable status (typically 5xx, 408, 429)
    Server,
    /// E3002: Deadline exceeded
    Timeout,
    /// E4001: Call preemptively blocked by an open circuit
    CircuitOpen,
    /// E4002: Call aborted by the caller
    Cancelled,
    /// E9999: Transport failure that could not be classified
    Unknown,
}

impl ErrorKind {
    /// Returns the canonical code string (e.g., `"E3001"`).
    #[inline]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Client => "E1001",
            Self::Configuration => "E1002",
            Self::Network => "E2001",
            Self::Server => "E3001",
            Self::Timeout => "E3002",
            Self::CircuitOpen => "E4001",
            Self::Cancelled => "E4002",
            Self::Unknown => "E9999",
        }
    }

    /// Returns the standard name (e.g., `"circuit_open"`).
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Client => "client_error",
            Self::Configuration => "configuration",
            Self::Network => "network_error",
            Self::Server => "server_error",
            Self::Timeout => "timeout",
            Self::CircuitOpen => "circuit_open",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the same call could plausibly succeed later (worth queueing).
    #[inline]
    pub fn transient(&self) -> bool {
        matches!(
            self,
            Self::Network | Self::Server | Self::Timeout | Self::CircuitOpen
        )
    }

    /// Returns the category: `"client"`, `"network"`, `"server"`, `"operational"`, or `"unknown"`.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Client | Self::Configuration => "client",
            Self::Network => "network",
            Self::Server | Self::Timeout => "server",
            Self::CircuitOpen | Self::Cancelled => "operational",
            Self::Unknown => "unknown",
        }
    }

    /// Maps a completed response status onto the taxonomy.
    ///
    /// 5xx, 408 and 429 are server-side conditions; every other status is a client error.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            408 | 429 => Self::Server,
            500..=599 => Self::Server,
            _ => Self::Client,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ErrorKind::from_http_status(500), ErrorKind::Server);
        assert_eq!(ErrorKind::from_http_status(503), ErrorKind::Server);
        assert_eq!(ErrorKind::from_http_status(429), ErrorKind::Server);
        assert_eq!(ErrorKind::from_http_status(408), ErrorKind::Server);
        assert_eq!(ErrorKind::from_http_status(402), ErrorKind::Client);
        assert_eq!(ErrorKind::from_http_status(404), ErrorKind::Client);
    }

    #[test]
    fn codes_are_unique() {
        let all = [
            ErrorKind::Client,
            ErrorKind::Configuration,
            ErrorKind::Network,
            ErrorKind::Server,
            ErrorKind::Timeout,
            ErrorKind::CircuitOpen,
            ErrorKind::Cancelled,
            ErrorKind::Unknown,
        ];
        let codes: std::collections::HashSet<_> = all.iter().map(|k| k.code()).collect();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn cancellation_is_not_transient() {
        assert!(!ErrorKind::Cancelled.transient());
        assert!(!ErrorKind::Client.transient());
        assert!(ErrorKind::CircuitOpen.transient());
    }
}
