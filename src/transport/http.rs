use crate::request::{Method, RequestDescriptor, Response};
use crate::transport::{Transport, TransportError, TransportErrorCode};
use crate::Result;
use async_trait::async_trait;
use reqwest::Proxy;
use std::collections::HashMap;
use std::env;
use std::error::Error as StdError;
use std::time::Duration;

/// reqwest-backed transport. Per-attempt deadlines are applied per request,
/// so one client is shared by every destination.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        // Minimal production-friendly defaults (env-overridable).
        let connect_timeout_ms = env::var("OUTBOUND_HTTP_CONNECT_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(10_000);

        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(connect_timeout_ms))
            .pool_max_idle_per_host(
                env::var("OUTBOUND_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(16),
            )
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Ok(proxy_url) = env::var("OUTBOUND_PROXY_URL") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        let client = builder.build().map_err(TransportError::from)?;

        Ok(Self { client })
    }

    /// Wrap an already configured reqwest client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: &RequestDescriptor,
        deadline: Duration,
    ) -> std::result::Result<Response, TransportError> {
        let method = match request.method() {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
            Method::Head => reqwest::Method::HEAD,
        };

        let mut req = self
            .client
            .request(method, request.url().clone())
            .timeout(deadline);

        for (k, v) in request.headers() {
            req = req.header(k, v);
        }

        if let Some(body) = request.body() {
            req = req.body(body.clone());
        }

        let resp = req.send().await?;

        let status = resp.status().as_u16();
        let headers: HashMap<String, String> = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = resp.bytes().await?;

        Ok(Response::new(status, headers, body))
    }
}

/// Map a reqwest failure onto the socket-style error codes used for classification.
pub(crate) fn code_for(err: &reqwest::Error) -> TransportErrorCode {
    if let Some(io) = find_io_error(err) {
        match io.kind() {
            std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe => return TransportErrorCode::ConnectionReset,
            std::io::ErrorKind::ConnectionRefused => return TransportErrorCode::ConnectionRefused,
            std::io::ErrorKind::TimedOut => {
                return if err.is_connect() {
                    TransportErrorCode::ConnectTimeout
                } else {
                    TransportErrorCode::SocketTimeout
                };
            }
            _ => {}
        }
    }

    if err.is_timeout() {
        return if err.is_connect() {
            TransportErrorCode::ConnectTimeout
        } else {
            TransportErrorCode::SocketTimeout
        };
    }

    // Resolver failures only surface as text in the error chain.
    let text = chain_text(err).to_lowercase();
    if text.contains("temporary failure in name resolution") || text.contains("try again") {
        return TransportErrorCode::DnsTemporary;
    }
    if text.contains("dns error")
        || text.contains("failed to lookup address")
        || text.contains("name or service not known")
        || text.contains("no such host")
    {
        return TransportErrorCode::DnsNotFound;
    }

    if err.is_connect() || err.is_request() {
        return TransportErrorCode::Socket;
    }
    if err.is_body() || err.is_decode() {
        return TransportErrorCode::Other("EBODY".to_string());
    }
    if err.is_builder() {
        return TransportErrorCode::Other("EREQUEST".to_string());
    }
    TransportErrorCode::Other("EUNKNOWN".to_string())
}

fn find_io_error<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a std::io::Error> {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            return Some(io);
        }
        current = e.source();
    }
    None
}

fn chain_text(err: &(dyn StdError + 'static)) -> String {
    let mut parts = Vec::new();
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        parts.push(e.to_string());
        current = e.source();
    }
    parts.join(": ")
}
