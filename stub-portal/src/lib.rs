//! Stand-in for the remote portal API, used by end-to-end tests.
//!
//! Every request is recorded and answered from a FIFO queue of canned
//! responses. With an empty queue the stub answers `204 No Content`.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{self, header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use uuid::Uuid;

/// A request as the stub received it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    /// All values sent for query parameter `key`.
    pub fn query_values(&self, key: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response the stub will send back.
#[derive(Clone, Debug, PartialEq)]
pub struct CannedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl CannedResponse {
    /// `status` with a JSON body and `application/json; charset=UTF-8`.
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            content_type: Some("application/json; charset=UTF-8".to_string()),
            body: body.to_string(),
        }
    }

    /// Error body in the portal's format with a fresh request id.
    pub fn error(status: u16, message: &str) -> Self {
        let body = json!({
            "status": "error",
            "message": message,
            "requestId": Uuid::new_v4().to_string(),
        });
        Self::json(status, &body)
    }

    pub fn raw(status: u16, content_type: Option<&str>, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: content_type.map(str::to_string),
            body: body.into(),
        }
    }

    pub fn no_content() -> Self {
        Self::raw(204, None, "")
    }
}

#[derive(Debug, Default)]
struct PortalState {
    responses: VecDeque<CannedResponse>,
    requests: Vec<RecordedRequest>,
}

/// Shared handle on the stub's queue and request log. Clones share state.
#[derive(Clone, Debug, Default)]
pub struct StubPortal {
    state: Arc<Mutex<PortalState>>,
}

impl StubPortal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the response for the next unanswered request.
    pub fn enqueue(&self, response: CannedResponse) {
        self.lock().responses.push_back(response);
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, PortalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub fn app(portal: StubPortal) -> Router {
    Router::new().fallback(handle).with_state(portal)
}

pub async fn run(listener: TcpListener, portal: StubPortal) -> Result<(), std::io::Error> {
    axum::serve(listener, app(portal)).await
}

async fn handle(
    State(portal): State<StubPortal>,
    method: Method,
    uri: Uri,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let recorded = RecordedRequest {
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        query,
        headers: headers
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect(),
        body: String::from_utf8_lossy(&body).into_owned(),
    };

    let canned = {
        let mut state = portal.lock();
        state.requests.push(recorded);
        state.responses.pop_front()
    }
    .unwrap_or_else(CannedResponse::no_content);

    into_response(canned)
}

fn into_response(canned: CannedResponse) -> Response {
    let Ok(status) = StatusCode::from_u16(canned.status) else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    let mut builder = http::Response::builder().status(status);
    if let Some(content_type) = &canned.content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type.as_str());
    }
    builder
        .body(Body::from(canned.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
