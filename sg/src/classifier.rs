//! Scrobble reply classification
//!
//! Only a top-level `error` member identifies a failure. Anything else,
//! including undecodable bodies, counts as success.

use serde_json::{Map, Value};
use tracing::debug;

/// Why an `error` member could not be turned into a protocol error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    /// `error` is present but is not an object
    NotAnObject,

    /// `error` is an object without a numeric `code` and a string `message`
    MissingCodeOrMessage,
}

impl MalformedReason {
    /// Message recorded in the error log for this shape problem
    pub fn message(&self) -> &'static str {
        match self {
            MalformedReason::NotAnObject => "Json error is not an object.",
            MalformedReason::MissingCodeOrMessage => "Json error object is missing code or message.",
        }
    }
}

/// Outcome of classifying one reply body
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Empty body, the nominal success reply
    Empty,

    /// Body could not be decoded to an object, or decoded to an empty one.
    /// Counted as success even though nothing was confirmed.
    Undecodable,

    /// Decoded object without an `error` member
    Success,

    /// Well-formed `{code, message}` error reported by the server
    ProtocolError { code: i64, message: String },

    /// `error` member present with an unusable shape
    MalformedError { reason: MalformedReason, payload: Value },
}

impl Classification {
    /// True for every outcome that records nothing
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Classification::Empty | Classification::Undecodable | Classification::Success
        )
    }

    /// Error log line for this outcome, if it is an error
    pub fn error_message(&self) -> Option<String> {
        match self {
            Classification::ProtocolError { code, message } => Some(format!("{} ({})", message, code)),
            Classification::MalformedError { reason, .. } => Some(reason.message().to_string()),
            _ => None,
        }
    }

    /// Diagnostic payload attached to malformed errors
    pub fn diagnostic(&self) -> Option<&Value> {
        match self {
            Classification::MalformedError { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

/// Classify the raw body of a completed scrobble call
pub fn classify(body: &[u8]) -> Classification {
    debug!(body_len = body.len(), "classify: called");
    if body.is_empty() {
        debug!("classify: empty body");
        return Classification::Empty;
    }

    let object = match decode_object(body) {
        Some(object) if !object.is_empty() => object,
        _ => {
            debug!("classify: undecodable or empty object");
            return Classification::Undecodable;
        }
    };

    classify_object(object)
}

fn decode_object(body: &[u8]) -> Option<Map<String, Value>> {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "decode_object: json parse failed");
            return None;
        }
    };

    match value {
        Value::Object(object) => Some(object),
        _ => {
            debug!("decode_object: top-level value is not an object");
            None
        }
    }
}

fn classify_object(object: Map<String, Value>) -> Classification {
    let Some(error) = object.get("error") else {
        debug!("classify_object: no error member");
        return Classification::Success;
    };

    let Value::Object(error_object) = error else {
        debug!("classify_object: error is not an object");
        return Classification::MalformedError {
            reason: MalformedReason::NotAnObject,
            payload: Value::Object(object),
        };
    };

    let code = error_object.get("code").and_then(numeric_code);
    let message = error_object.get("message").and_then(Value::as_str);

    match (code, message) {
        (Some(code), Some(message)) => {
            debug!(code, %message, "classify_object: protocol error");
            Classification::ProtocolError {
                code,
                message: message.to_string(),
            }
        }
        _ => {
            debug!("classify_object: error object missing code or message");
            Classification::MalformedError {
                reason: MalformedReason::MissingCodeOrMessage,
                payload: Value::Object(error_object.clone()),
            }
        }
    }
}

fn numeric_code(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|f| f.trunc() as i64))
}
