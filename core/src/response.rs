//! Response classification.
//!
//! # Design
//! The status code decides first: 4xx and 5xx are errors no matter what the
//! headers say. Only a 200 is required to declare `application/json`, and
//! only a 200 body is decoded as a payload. 202 and 204 carry no payload and
//! their bodies are never looked at. Anything else is unsupported.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::ApiError;
use crate::http::HttpResponse;

const STATUS_OK: u16 = 200;
const STATUS_UNAUTHORIZED: u16 = 401;

/// Success statuses whose body is ignored.
const STATUSES_WITH_EMPTY_BODIES: [u16; 2] = [202, 204];

const CORRUPT_JSON_MESSAGE: &str = "Corrupt JSON in response body";

/// Shape of the remote service's 4xx bodies. Extra fields are ignored.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    status: String,
    message: String,
    #[serde(rename = "requestId")]
    request_id: String,
}

/// Turn a response into the decoded payload, `None`, or an error.
///
/// Only a zero-length 200 body is `None`; `{}` and `[]` come back as values.
pub fn classify_response(response: &HttpResponse) -> Result<Option<Value>, ApiError> {
    debug!(status = response.status, "classifying response");
    require_successful_response(response)?;

    if response.status == STATUS_OK {
        require_json_response(response)?;
        decode_body(&response.body)
    } else if STATUSES_WITH_EMPTY_BODIES.contains(&response.status) {
        Ok(None)
    } else {
        Err(ApiError::UnsupportedResponse(format!(
            "Unsupported response status {}",
            response.status
        )))
    }
}

fn require_successful_response(response: &HttpResponse) -> Result<(), ApiError> {
    match response.status {
        400..=499 => Err(client_error(response)),
        500..=599 => Err(ApiError::Server {
            reason: response.reason.clone(),
            http_status_code: response.status,
        }),
        _ => Ok(()),
    }
}

fn client_error(response: &HttpResponse) -> ApiError {
    let error_data: Value = match serde_json::from_slice(&response.body) {
        Ok(value) => value,
        Err(_) => return ApiError::CorruptedResponse(CORRUPT_JSON_MESSAGE.to_string()),
    };
    let body = match ErrorBody::deserialize(&error_data) {
        Ok(body) => body,
        Err(e) => return ApiError::CorruptedResponse(format!("Malformed error response body: {e}")),
    };
    if body.status != "error" {
        return ApiError::CorruptedResponse(format!(
            "Malformed error response body: status is {:?}, expected \"error\"",
            body.status
        ));
    }

    if response.status == STATUS_UNAUTHORIZED {
        ApiError::Authentication {
            message: body.message,
            request_id: body.request_id,
            error_data,
        }
    } else {
        ApiError::Client {
            message: body.message,
            request_id: body.request_id,
            status: response.status,
            error_data,
        }
    }
}

fn require_json_response(response: &HttpResponse) -> Result<(), ApiError> {
    let header_value = match response.header("Content-Type") {
        Some(value) if !value.trim().is_empty() => value,
        _ => {
            return Err(ApiError::UnsupportedResponse(
                "Response does not specify a Content-Type".to_string(),
            ))
        }
    };

    let content_type = header_value.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    if content_type != "application/json" {
        return Err(ApiError::UnsupportedResponse(format!(
            "Unsupported response content type {content_type}"
        )));
    }
    Ok(())
}

fn decode_body(body: &[u8]) -> Result<Option<Value>, ApiError> {
    if body.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|_| ApiError::CorruptedResponse(CORRUPT_JSON_MESSAGE.to_string()))
}
