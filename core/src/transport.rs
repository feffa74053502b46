//! The network seam.
//!
//! # Design
//! `PortalConnection` never talks to a socket itself; it hands a finished
//! `HttpRequest` to a `Transport`. The production transport wraps a
//! `ureq::Agent`, whose connection pool lives as long as the transport and
//! is released by `close`. Tests plug in a recording transport instead.
//!
//! `ureq` is blocking, so each call holds the calling thread until the
//! exchange completes. An `Agent` is safe to share between threads.

use tracing::{debug, warn};

use crate::config::ConnectionConfig;
use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

const UNKNOWN_REASON: &str = "Unknown Status";

/// Executes requests against the remote service.
pub trait Transport {
    /// Perform one exchange. Non-2xx statuses are returned as responses,
    /// never as errors.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Release pooled connections. Later calls to `execute` fail with
    /// `TransportError::Closed`.
    fn close(&mut self);
}

/// Run `attempt` once, then again for every retryable failure, at most
/// `max_retries` more times.
pub fn retry_transport<T>(
    max_retries: u32,
    mut attempt: impl FnMut() -> Result<T, TransportError>,
) -> Result<T, TransportError> {
    let mut retries = 0;
    loop {
        match attempt() {
            Err(e) if e.is_retryable() && retries < max_retries => {
                retries += 1;
                warn!(attempt = retries, max_retries, error = %e, "retrying request");
            }
            result => return result,
        }
    }
}

/// `Transport` backed by a long-lived `ureq::Agent`.
pub struct UreqTransport {
    agent: Option<ureq::Agent>,
    max_retries: u32,
}

impl UreqTransport {
    pub fn new(config: &ConnectionConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout))
            .timeout_connect(Some(config.connect_timeout))
            .build()
            .new_agent();

        Self {
            agent: Some(agent),
            max_retries: config.max_retries,
        }
    }

    pub fn is_open(&self) -> bool {
        self.agent.is_some()
    }

    fn send_once(agent: &ureq::Agent, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.as_str();
        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => with_headers(agent.get(url), &request.headers).call(),
            (HttpMethod::Delete, _) => with_headers(agent.delete(url), &request.headers).call(),
            (HttpMethod::Post, Some(body)) => with_headers(agent.post(url), &request.headers).send(body.as_bytes()),
            (HttpMethod::Post, None) => with_headers(agent.post(url), &request.headers).send_empty(),
            (HttpMethod::Put, Some(body)) => with_headers(agent.put(url), &request.headers).send(body.as_bytes()),
            (HttpMethod::Put, None) => with_headers(agent.put(url), &request.headers).send_empty(),
        };
        let mut response = result.map_err(map_ureq_error)?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect();
        let body = response.body_mut().read_to_vec().map_err(map_ureq_error)?;

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: reason_phrase(status),
            headers,
            body,
        })
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let agent = self.agent.as_ref().ok_or(TransportError::Closed)?;
        retry_transport(self.max_retries, || Self::send_once(agent, request))
    }

    fn close(&mut self) {
        if self.agent.take().is_some() {
            debug!("transport closed");
        }
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &[(String, String)]) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

/// `ureq` does not expose the phrase the server sent, so use the canonical one.
fn reason_phrase(status: ureq::http::StatusCode) -> String {
    status.canonical_reason().unwrap_or(UNKNOWN_REASON).to_string()
}

fn map_ureq_error(err: ureq::Error) -> TransportError {
    let before_send = match &err {
        ureq::Error::ConnectionFailed | ureq::Error::HostNotFound | ureq::Error::Timeout(ureq::Timeout::Connect) => {
            true
        }
        ureq::Error::Io(io) => matches!(
            io.kind(),
            std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::AddrNotAvailable
        ),
        _ => false,
    };
    if before_send {
        TransportError::Connection(err.to_string())
    } else {
        TransportError::Io(err.to_string())
    }
}
