//! Connection to the remote service.
//!
//! # Design
//! `Connection` is the interface domain clients are written against. It has
//! one required method, `send`; `get`, `post`, `put` and `delete` are thin
//! sugar over it. `PortalConnection` is the real implementation and
//! `testing::MockPortalConnection` the scripted double.
//!
//! A `PortalConnection` composes, per call: `RequestBuilder` (URL, audit id,
//! body, `User-Agent`), `Credential::attach`, the `Transport`, and
//! `classify_response`. It owns its transport and closes it exactly once,
//! either through `close` or when dropped, so pooled sockets are released on
//! every exit path.
//!
//! Methods take `&mut self`: one owner issues calls one after another.
//! Share a connection between threads behind a `Mutex`.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::auth::Credential;
use crate::config::ConnectionConfig;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::query::QueryArgs;
use crate::request::{encode_body, RequestBuilder};
use crate::response::classify_response;
use crate::transport::{Transport, UreqTransport};

/// Request/response interface to the remote service.
///
/// Every method returns the decoded JSON body, or `None` when the response
/// carries no payload.
pub trait Connection {
    fn send(
        &mut self,
        method: HttpMethod,
        path: &str,
        query_args: Option<&QueryArgs>,
        body: Option<Value>,
    ) -> Result<Option<Value>, ApiError>;

    fn get(&mut self, path: &str, query_args: Option<&QueryArgs>) -> Result<Option<Value>, ApiError> {
        self.send(HttpMethod::Get, path, query_args, None)
    }

    fn post<B: Serialize + ?Sized>(&mut self, path: &str, body: &B) -> Result<Option<Value>, ApiError>
    where
        Self: Sized,
    {
        let body = encode_body(body)?;
        self.send(HttpMethod::Post, path, None, body)
    }

    fn put<B: Serialize + ?Sized>(&mut self, path: &str, body: &B) -> Result<Option<Value>, ApiError>
    where
        Self: Sized,
    {
        let body = encode_body(body)?;
        self.send(HttpMethod::Put, path, None, body)
    }

    fn delete(&mut self, path: &str) -> Result<Option<Value>, ApiError> {
        self.send(HttpMethod::Delete, path, None, None)
    }
}

/// Authenticated connection to the remote service.
pub struct PortalConnection<T: Transport = UreqTransport> {
    credential: Credential,
    builder: RequestBuilder,
    transport: T,
    closed: bool,
}

impl PortalConnection<UreqTransport> {
    /// Connect with the default configuration.
    pub fn new(credential: Credential, change_source: impl Into<String>) -> Self {
        Self::with_config(credential, change_source, ConnectionConfig::default())
    }

    pub fn with_config(credential: Credential, change_source: impl Into<String>, config: ConnectionConfig) -> Self {
        let transport = UreqTransport::new(&config);
        Self::with_transport(credential, change_source, &config, transport)
    }
}

impl<T: Transport> PortalConnection<T> {
    /// Connect through a caller-provided transport. `config.max_retries`
    /// and the timeouts are the transport's business; only `base_url` and
    /// `user_agent` are read here.
    pub fn with_transport(
        credential: Credential,
        change_source: impl Into<String>,
        config: &ConnectionConfig,
        transport: T,
    ) -> Self {
        Self {
            credential,
            builder: RequestBuilder::new(&config.base_url, change_source, config.user_agent.as_str()),
            transport,
            closed: false,
        }
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn change_source(&self) -> &str {
        self.builder.change_source()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Release the transport now instead of at drop.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if !self.closed {
            self.closed = true;
            self.transport.close();
            debug!("portal connection closed");
        }
    }
}

impl<T: Transport> Connection for PortalConnection<T> {
    fn send(
        &mut self,
        method: HttpMethod,
        path: &str,
        query_args: Option<&QueryArgs>,
        body: Option<Value>,
    ) -> Result<Option<Value>, ApiError> {
        let mut request = self.builder.build(method, path, query_args, body.as_ref())?;
        request.url = self.credential.attach(request.url);

        debug!(method = %method, path, "sending request");
        let response = self.transport.execute(&request)?;
        classify_response(&response)
    }
}

impl<T: Transport> Drop for PortalConnection<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::json;

    use super::*;
    use crate::error::TransportError;
    use crate::http::{HttpRequest, HttpResponse};

    #[derive(Default)]
    struct Recorder {
        requests: Vec<HttpRequest>,
        closes: usize,
    }

    struct FakeTransport {
        recorder: Rc<RefCell<Recorder>>,
        response: HttpResponse,
    }

    impl Transport for FakeTransport {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.recorder.borrow_mut().requests.push(request.clone());
            Ok(self.response.clone())
        }

        fn close(&mut self) {
            self.recorder.borrow_mut().closes += 1;
        }
    }

    fn connection(response: HttpResponse) -> (PortalConnection<FakeTransport>, Rc<RefCell<Recorder>>) {
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let transport = FakeTransport {
            recorder: Rc::clone(&recorder),
            response,
        };
        let config = ConnectionConfig::new().base_url("https://api.example.com");
        let conn = PortalConnection::with_transport(Credential::ApiKey("key".to_string()), "source", &config, transport);
        (conn, recorder)
    }

    fn no_content() -> HttpResponse {
        HttpResponse {
            status: 204,
            reason: "No Content".to_string(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    #[test]
    fn get_attaches_credential_and_audit_id() {
        let (mut conn, recorder) = connection(no_content());
        assert_eq!(conn.get("/foo", None).unwrap(), None);

        let recorder = recorder.borrow();
        let url = &recorder.requests[0].url;
        assert_eq!(url.path(), "/foo");
        assert!(url.query_pairs().any(|(k, v)| k == "hapikey" && v == "key"));
        assert!(url.query_pairs().any(|(k, v)| k == "auditId" && v == "source"));
    }

    #[test]
    fn post_sends_json_body() {
        let (mut conn, recorder) = connection(no_content());
        conn.post("/foo", &json!({"foo": "bar"})).unwrap();

        let recorder = recorder.borrow();
        let request = &recorder.requests[0];
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.body.as_deref(), Some(r#"{"foo":"bar"}"#));
        assert_eq!(request.header("content-type"), Some("application/json"));
    }

    #[test]
    fn close_happens_once() {
        let (conn, recorder) = connection(no_content());
        conn.close();
        assert_eq!(recorder.borrow().closes, 1);
    }

    #[test]
    fn drop_closes_transport() {
        let (conn, recorder) = connection(no_content());
        drop(conn);
        assert_eq!(recorder.borrow().closes, 1);
    }
}
