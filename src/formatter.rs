use crate::snapshot::{RequestSnapshot, ResponseSnapshot};
use axum::http::{header, HeaderMap};
use serde_json::Value;
use std::borrow::Cow;
use std::cell::OnceCell;
use std::collections::HashMap;

const JSON_CONTENT_TYPE: &str = "application/json";

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|val| val.to_str().ok())
        .map(|val| {
            let mime = val.split(';').next().unwrap_or("").trim();
            mime.eq_ignore_ascii_case(JSON_CONTENT_TYPE)
        })
        .unwrap_or(false)
}

fn headers_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|val| (name.as_str().to_string(), val.to_string()))
        })
        .collect()
}

/// Convenience accessors over a request snapshot: raw payload, parsed JSON
/// payload and a compact JSON rendering. The parse result is cached after the
/// first use.
pub struct RequestFormatter<'a> {
    snapshot: &'a RequestSnapshot,
    payload_json: OnceCell<Option<Value>>,
}

impl<'a> RequestFormatter<'a> {
    pub fn new(snapshot: &'a RequestSnapshot) -> Self {
        Self {
            snapshot,
            payload_json: OnceCell::new(),
        }
    }

    pub fn query_string(&self) -> &str {
        self.snapshot.query_string()
    }

    /// Headers as a plain key -> value map. Values that are not valid UTF-8
    /// are skipped.
    pub fn headers(&self) -> HashMap<String, String> {
        headers_map(self.snapshot.headers())
    }

    pub fn payload_raw(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.snapshot.body())
    }

    pub fn payload_json(&self) -> Option<&Value> {
        self.payload_json
            .get_or_init(|| serde_json::from_slice(self.snapshot.body()).ok())
            .as_ref()
    }

    /// Compact (no-whitespace separators) rendering of the JSON payload, or
    /// `None` when the body is not JSON.
    pub fn payload_json_compact(&self) -> Option<String> {
        self.payload_json().map(Value::to_string)
    }

    /// True when the request declares `Content-Type: application/json` and
    /// the body actually parses as JSON.
    pub fn payload_is_json(&self) -> bool {
        is_json_content_type(self.snapshot.headers()) && self.payload_json().is_some()
    }
}

/// Convenience accessors over a response snapshot, mirroring
/// [`RequestFormatter`].
pub struct ResponseFormatter<'a> {
    snapshot: &'a ResponseSnapshot,
    response_json: OnceCell<Option<Value>>,
}

impl<'a> ResponseFormatter<'a> {
    pub fn new(snapshot: &'a ResponseSnapshot) -> Self {
        Self {
            snapshot,
            response_json: OnceCell::new(),
        }
    }

    pub fn headers(&self) -> HashMap<String, String> {
        headers_map(self.snapshot.headers())
    }

    pub fn response_raw(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.snapshot.body())
    }

    pub fn response_json(&self) -> Option<&Value> {
        self.response_json
            .get_or_init(|| serde_json::from_slice(self.snapshot.body()).ok())
            .as_ref()
    }

    pub fn response_json_compact(&self) -> Option<String> {
        self.response_json().map(Value::to_string)
    }

    pub fn response_is_json(&self) -> bool {
        is_json_content_type(self.snapshot.headers()) && self.response_json().is_some()
    }
}
