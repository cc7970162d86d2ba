use crate::client::AttemptRecord;
use crate::error_code::ErrorKind;
use crate::transport::TransportError;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "policy.backoff_multiplier", "request.url")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected range, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "policy_validator", "config_env")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Terminal error of one logical call that reached the remote (or tried to).
///
/// Raised when retries are exhausted or the last failure was classified as
/// non-retryable. `attempts` is always in `1..=max_retries + 1`.
#[derive(Debug, Error)]
#[error("{message} (attempts: {attempts})")]
pub struct HttpRequestError {
    pub message: String,
    pub status_code: Option<u16>,
    pub attempts: u32,
    pub is_timeout: bool,
    pub is_network_error: bool,
    pub kind: ErrorKind,
    /// True when the loop stopped because the attempt budget ran out.
    pub retries_exhausted: bool,
    /// Body of the last failed response, if any (truncated).
    pub response_body: Option<String>,
    pub client_request_id: String,
    pub history: Vec<AttemptRecord>,
    #[source]
    pub cause: Option<TransportError>,
}

/// Unified error type for the resilient client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Request failed: {0}")]
    Request(#[from] HttpRequestError),

    #[error("Circuit open for {destination}: call rejected without attempting")]
    CircuitOpen {
        destination: String,
        /// Time until the breaker admits a probe, if known.
        retry_in_ms: Option<u64>,
    },

    #[error("Request cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration format error: {0}")]
    ConfigFormat(#[from] serde_yaml::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Position of this error in the terminal taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Request(e) => e.kind,
            Error::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            Error::Cancelled { .. } => ErrorKind::Cancelled,
            Error::Configuration { .. } | Error::ConfigFormat(_) | Error::Serialization(_) => {
                ErrorKind::Configuration
            }
            Error::Transport(_) | Error::Io(_) => ErrorKind::Unknown,
        }
    }

    /// Number of attempts actually made. Zero for breaker rejections.
    pub fn attempts(&self) -> u32 {
        match self {
            Error::Request(e) => e.attempts,
            Error::Cancelled { attempts } => *attempts,
            _ => 0,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Request(e) if e.is_timeout)
    }

    pub fn is_network_error(&self) -> bool {
        matches!(self, Error::Request(e) if e.is_network_error)
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Request(e) => e.status_code,
            _ => None,
        }
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Error::CircuitOpen { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }

    /// Whether a circuit breaker should count this outcome as a failure.
    ///
    /// Cancellations and breaker rejections never touch failure accounting.
    pub fn counts_as_breaker_failure(&self) -> bool {
        !matches!(self, Error::Cancelled { .. } | Error::CircuitOpen { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_error(status: Option<u16>, attempts: u32) -> HttpRequestError {
        HttpRequestError {
            message: "Request failed with status 500".into(),
            status_code: status,
            attempts,
            is_timeout: false,
            is_network_error: false,
            kind: ErrorKind::Server,
            retries_exhausted: true,
            response_body: None,
            client_request_id: "req-1".into(),
            history: Vec::new(),
            cause: None,
        }
    }

    #[test]
    fn circuit_open_reports_zero_attempts() {
        let err = Error::CircuitOpen {
            destination: "api.partner.test:443".into(),
            retry_in_ms: Some(1_000),
        };
        assert_eq!(err.attempts(), 0);
        assert_eq!(err.kind(), ErrorKind::CircuitOpen);
        assert!(!err.counts_as_breaker_failure());
    }

    #[test]
    fn cancellation_is_not_a_breaker_failure() {
        let err = Error::Cancelled { attempts: 2 };
        assert!(!err.counts_as_breaker_failure());
        assert_eq!(err.attempts(), 2);
        assert!(err.is_cancelled());
    }

    #[test]
    fn request_error_exposes_structured_detail() {
        let err = Error::from(request_error(Some(500), 3));
        assert_eq!(err.attempts(), 3);
        assert_eq!(err.status_code(), Some(500));
        assert!(!err.is_timeout());
        assert!(err.counts_as_breaker_failure());
        assert!(err.to_string().contains("attempts: 3"));
    }

    #[test]
    fn configuration_context_is_rendered() {
        let err = Error::configuration_with_context(
            "backoff multiplier must be >= 1.0",
            ErrorContext::new()
                .with_field_path("policy.backoff_multiplier")
                .with_source("policy_validator"),
        );
        let text = err.to_string();
        assert!(text.contains("field: policy.backoff_multiplier"));
        assert!(text.contains("source: policy_validator"));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
