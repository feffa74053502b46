//! Request construction: URL, merged query string, headers and JSON body.

use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};
use crate::query::QueryArgs;

/// Query-string parameter carrying the change source.
pub const AUDIT_ID_KEY: &str = "auditId";

/// Builds `HttpRequest` values for one connection.
///
/// Holds what stays fixed for the connection's lifetime: base URL, change
/// source and `User-Agent`. Authentication is not applied here; the
/// connection attaches the credential to the finished URL.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_url: String,
    change_source: String,
    user_agent: String,
}

impl RequestBuilder {
    pub fn new(base_url: &str, change_source: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            change_source: change_source.into(),
            user_agent: user_agent.into(),
        }
    }

    pub fn change_source(&self) -> &str {
        &self.change_source
    }

    /// Compose the request for `path`.
    ///
    /// The query string is the caller's arguments plus `auditId`; a caller
    /// supplied `auditId` is dropped in favour of the change source. A JSON
    /// `null` body is treated like no body at all.
    pub fn build(
        &self,
        method: HttpMethod,
        path: &str,
        query_args: Option<&QueryArgs>,
        body: Option<&Value>,
    ) -> Result<HttpRequest, ApiError> {
        let raw = format!("{}{path}", self.base_url);
        let mut url = Url::parse(&raw).map_err(|e| ApiError::InvalidUrl(format!("{raw}: {e}")))?;

        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != AUDIT_ID_KEY)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        if let Some(args) = query_args {
            pairs.extend(
                args.pairs()
                    .filter(|(key, _)| *key != AUDIT_ID_KEY)
                    .map(|(key, value)| (key.to_string(), value.to_string())),
            );
        }
        pairs.push((AUDIT_ID_KEY.to_string(), self.change_source.clone()));
        url.query_pairs_mut().clear().extend_pairs(pairs);

        let mut headers = vec![("User-Agent".to_string(), self.user_agent.clone())];
        let body = match body.filter(|value| !value.is_null()) {
            Some(value) => {
                headers.push(("content-type".to_string(), "application/json".to_string()));
                Some(serde_json::to_string(value).map_err(|e| ApiError::Serialization(e.to_string()))?)
            }
            None => None,
        };

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }
}

/// Convert a request body into the JSON value handed to `Connection::send`.
/// `null` means "no body"; an empty object or array is still sent.
pub fn encode_body<B: Serialize + ?Sized>(body: &B) -> Result<Option<Value>, ApiError> {
    let value = serde_json::to_value(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
    Ok((!value.is_null()).then_some(value))
}
