//! Response classification at the transport boundary.
//!
//! The Commcell web service reports failures in several shapes: legacy HTML
//! error pages, non-200 statuses with plain text, and 200 responses whose
//! JSON body carries a non-zero `errorCode`. [`classify`] folds all of them
//! into one [`ResponseClass`] so call sites handle a single type.

use bytes::Bytes;
use reqwest::StatusCode;
use serde_json::Value;

use crate::error::{Error, ErrorDomain, Result};

/// Raw response as returned by the dispatcher.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Value of the `Content-Type` header, if any.
    pub content_type: Option<String>,
    /// Response body.
    pub body: Bytes,
}

impl RawResponse {
    /// Returns the body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parses the body as JSON.
    ///
    /// An empty body, or a body that is JSON `null`, yields `None`.
    pub fn json(&self) -> Result<Option<Value>> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        match serde_json::from_slice::<Value>(&self.body)? {
            Value::Null => Ok(None),
            value => Ok(Some(value)),
        }
    }

    /// Returns true if the server declared a JSON body.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json"))
    }
}

/// Outcome of inspecting a response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseClass {
    /// 200 with a well formed JSON body and no embedded error.
    Success(Value),
    /// Non-200 status.
    HttpError {
        /// HTTP status code.
        status: u16,
        /// HTML title or raw body text.
        message: String,
    },
    /// 200 with a non-zero error code embedded in the body.
    ApiError {
        /// Server error code, if numeric.
        code: Option<i64>,
        /// Server message, verbatim.
        message: String,
    },
    /// 200 with an empty or non-JSON body.
    MalformedBody,
}

/// Classifies a dispatcher result.
#[must_use]
pub fn classify(ok: bool, response: &RawResponse) -> ResponseClass {
    if !ok {
        return ResponseClass::HttpError {
            status: response.status.as_u16(),
            message: extract_title(&response.text()),
        };
    }

    match response.json() {
        Ok(Some(value)) => match embedded_error(&value) {
            Some((code, message)) => ResponseClass::ApiError { code, message },
            None => ResponseClass::Success(value),
        },
        Ok(None) | Err(_) => ResponseClass::MalformedBody,
    }
}

/// Returns the text between `<title>` and `</title>`, or the whole input.
#[must_use]
pub fn extract_title(text: &str) -> String {
    if let (Some(start), Some(end)) = (text.find("<title>"), text.find("</title>")) {
        let start = start + "<title>".len();
        if start <= end {
            return text[start..end].to_string();
        }
    }
    text.to_string()
}

/// Looks for a non-zero error code in the known error shapes.
///
/// Returns the code (when numeric) and the accompanying message.
#[must_use]
pub fn embedded_error(value: &Value) -> Option<(Option<i64>, String)> {
    let candidates = [
        Some(value),
        value.get("error"),
        value.get("errList").and_then(|l| l.get(0)),
        value.get("response").and_then(|l| l.get(0)),
    ];

    candidates
        .into_iter()
        .flatten()
        .find_map(error_in_object)
}

fn error_in_object(obj: &Value) -> Option<(Option<i64>, String)> {
    let code = obj.get("errorCode")?;
    let numeric = error_code_value(code);
    if numeric == Some(0) {
        return None;
    }

    let message = ["errorMessage", "errLogMessage", "errorString"]
        .iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str))
        .map_or_else(|| format!("Error code: {code}"), str::to_string);

    Some((numeric, message))
}

/// Reads an `errorCode` that may be sent as a number or a numeric string.
#[must_use]
pub fn error_code_value(code: &Value) -> Option<i64> {
    match code {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reads an id sent as a number or a numeric string.
#[must_use]
pub fn as_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Converts a classified response into the JSON value or an error.
///
/// `ApiError` becomes an [`Error::Api`] in `domain` with the server message.
pub fn into_json(class: ResponseClass, domain: ErrorDomain) -> Result<Value> {
    match class {
        ResponseClass::Success(value) => Ok(value),
        ResponseClass::HttpError { status, message } => Err(Error::response(status, message)),
        ResponseClass::ApiError { code, message } => Err(Error::api(domain, code, message)),
        ResponseClass::MalformedBody => Err(Error::EmptyResponse { detail: None }),
    }
}

/// Fetches a required key from a JSON object.
pub fn require<'a>(value: &'a Value, key: &str) -> Result<&'a Value> {
    value
        .get(key)
        .ok_or_else(|| Error::empty(format!("missing key '{key}'")))
}
