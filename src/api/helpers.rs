//! Response builders shared by the API handlers.

use serde::Serialize;
use serde_json::{Value, json};
use tracing::error;

use crate::errors::SlackError;

/// Returns a 200 OK response with an empty JSON body.
#[must_use]
pub fn ok_empty() -> Value {
    json!({ "statusCode": 200, "body": "{}" })
}

/// Returns a 200 OK response with `body` serialized as JSON.
#[must_use]
pub fn ok_json<T: Serialize>(body: &T) -> Value {
    match serde_json::to_string(body) {
        Ok(body) => json!({ "statusCode": 200, "body": body }),
        Err(e) => {
            error!("Failed to serialize response body: {}", e);
            err_response(500, "Failed to serialize response")
        }
    }
}

/// Returns an error response with the given status code and message.
#[must_use]
pub fn err_response(status_code: u16, message: &str) -> Value {
    json!({
        "statusCode": status_code,
        "body": json!({ "error": message }).to_string()
    })
}

/// Maps a `SlackError` onto an error response.
#[must_use]
pub fn error_response(err: &SlackError) -> Value {
    err_response(err.status_code(), &err.to_string())
}
