//! Connection layer for the portal's REST API.
//!
//! # Overview
//! Every call to the remote service goes through a `Connection`. The real
//! implementation, `PortalConnection`, authenticates the request through the
//! query string, tags it with the connection's change source (`auditId`),
//! encodes the body as JSON, and turns the response into either the decoded
//! payload or a precise `ApiError`.
//!
//! # Design
//! - Request building, authentication and response classification are pure
//!   functions over plain `HttpRequest` / `HttpResponse` data.
//! - I/O sits behind the `Transport` trait; `UreqTransport` is the blocking
//!   production transport with a bounded retry for connection failures.
//! - `testing::MockPortalConnection` implements the same `Connection` trait
//!   from a script of expected calls, so domain clients can be tested
//!   without a network.

pub mod auth;
pub mod config;
pub mod connection;
pub mod error;
pub mod http;
pub mod query;
pub mod request;
pub mod response;
pub mod testing;
pub mod transport;

pub use auth::Credential;
pub use config::ConnectionConfig;
pub use connection::{Connection, PortalConnection};
pub use error::{ApiError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use query::QueryArgs;
pub use request::RequestBuilder;
pub use response::classify_response;
pub use transport::{Transport, UreqTransport};
