//! Scripted test double for code built on `Connection`.
//!
//! # Design
//! A `MockPortalConnection` is loaded with the calls the code under test is
//! expected to make, in order. Each `send` takes the next expected call,
//! checks path, method, query arguments and body against it, and replays
//! the scripted outcome. Deviations are test failures, so they panic the way
//! `assert_eq!` does rather than returning an `ApiError`.
//!
//! When the double goes out of scope it checks that the script was used up.
//! That check is skipped while the thread is already panicking, so the
//! original failure is the one that gets reported. `MockPortalConnection::run`
//! scopes the double around a closure and also skips the check when the
//! closure returns `Err`, so an error passed up with `?` reaches the caller.

use std::collections::VecDeque;

use serde_json::Value;

use crate::connection::Connection;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::query::QueryArgs;

/// What an expected call returns once it has been matched.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCallOutcome {
    Success(Option<Value>),
    Failure(ApiError),
}

/// One call the code under test is expected to make.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedApiCall {
    pub path: String,
    pub method: HttpMethod,
    pub query_args: Option<QueryArgs>,
    pub request_body: Option<Value>,
    pub outcome: ApiCallOutcome,
}

impl ExpectedApiCall {
    /// A call answered with no payload; chain `with_response_body` to
    /// return one.
    pub fn successful(path: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            path: path.into(),
            method,
            query_args: None,
            request_body: None,
            outcome: ApiCallOutcome::Success(None),
        }
    }

    /// A call answered with `error`.
    pub fn unsuccessful(path: impl Into<String>, method: HttpMethod, error: ApiError) -> Self {
        Self {
            path: path.into(),
            method,
            query_args: None,
            request_body: None,
            outcome: ApiCallOutcome::Failure(error),
        }
    }

    pub fn with_query_args(mut self, query_args: QueryArgs) -> Self {
        self.query_args = Some(query_args);
        self
    }

    pub fn with_request_body(mut self, body: Value) -> Self {
        self.request_body = Some(body);
        self
    }

    pub fn with_response_body(mut self, body: Value) -> Self {
        self.outcome = ApiCallOutcome::Success(Some(body));
        self
    }
}

/// Drop-in `Connection` that replays a script of expected calls.
#[derive(Debug, Default)]
pub struct MockPortalConnection {
    expected: VecDeque<ExpectedApiCall>,
    api_calls: Vec<ExpectedApiCall>,
}

impl MockPortalConnection {
    pub fn new(expected_api_calls: impl IntoIterator<Item = ExpectedApiCall>) -> Self {
        Self {
            expected: expected_api_calls.into_iter().collect(),
            api_calls: Vec::new(),
        }
    }

    /// Build the script from several simulators, each an ordered sequence
    /// of calls. Simulators run one after the other.
    pub fn from_simulators<S>(simulators: impl IntoIterator<Item = S>) -> Self
    where
        S: IntoIterator<Item = ExpectedApiCall>,
    {
        Self::new(simulators.into_iter().flatten())
    }

    /// Expected calls that have been made so far.
    pub fn api_calls(&self) -> &[ExpectedApiCall] {
        &self.api_calls
    }

    /// Number of expected calls not yet made.
    pub fn remaining(&self) -> usize {
        self.expected.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.expected.is_empty()
    }

    /// End the scope explicitly. Panics if expected calls are left.
    pub fn close(self) {
        drop(self);
    }

    /// Run `f` against a double loaded with `expected_api_calls`.
    ///
    /// On `Ok` the script must have been used up, as with `close`. On `Err`
    /// the leftover check is skipped and the error is returned unchanged.
    pub fn run<T, E>(
        expected_api_calls: impl IntoIterator<Item = ExpectedApiCall>,
        f: impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut conn = Self::new(expected_api_calls);
        let result = f(&mut conn);
        if result.is_err() {
            conn.expected.clear();
        }
        conn.close();
        result
    }
}

impl Connection for MockPortalConnection {
    fn send(
        &mut self,
        method: HttpMethod,
        path: &str,
        query_args: Option<&QueryArgs>,
        body: Option<Value>,
    ) -> Result<Option<Value>, ApiError> {
        let Some(expected) = self.expected.pop_front() else {
            panic!("Not enough API calls for new requests (requested {path:?})");
        };

        assert!(
            expected.path == path,
            "Expected URL path {:?}, got {:?}",
            expected.path,
            path
        );
        assert!(
            expected.method == method,
            "Expected HTTP method {}, got {}",
            expected.method,
            method
        );
        assert!(
            expected.query_args.as_ref() == query_args,
            "Expected query string arguments {:?}, got {:?}",
            expected.query_args,
            query_args
        );
        assert!(
            expected.request_body == body,
            "Expected request body {:?}, got {:?}",
            expected.request_body,
            body
        );

        let outcome = expected.outcome.clone();
        self.api_calls.push(expected);
        match outcome {
            ApiCallOutcome::Success(response_body) => Ok(response_body),
            ApiCallOutcome::Failure(error) => Err(error),
        }
    }
}

impl Drop for MockPortalConnection {
    fn drop(&mut self) {
        if !self.expected.is_empty() && !std::thread::panicking() {
            panic!("{} more requests were expected", self.expected.len());
        }
    }
}
