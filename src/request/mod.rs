//! Request parsing.
//!
//! # Responsibilities
//! - Convert a raw transport request into a normalized data bag, per the
//!   route's declared parsing mode
//! - Leave large bodies unbuffered when the route asks for passthrough
//! - Provide the mandatory-field check services apply to parsed bags
//!
//! # Design Decisions
//! - A small closed set of parsing strategies selected per route, not a
//!   type hierarchy
//! - An empty body where one was expected is an empty bag, not an error;
//!   only malformed input fails
//! - Mandatory-field checking belongs to the service, via `mandatory_check`

use std::collections::BTreeMap;

use axum::body::Body;
use axum::http::request::Parts;
use axum::http::header;
use serde_json::Value;

use crate::error::HttpError;
use crate::session::SessionHandle;

// Bodies buffered for structured parsing are capped; routes expecting
// more declare RawStream or Multipart and read the stream themselves.
const MAX_BUFFERED_BODY: usize = 1024 * 1024;

/// How a route wants its request turned into a data bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Query-string parameters only (GET, DELETE).
    Query,
    /// JSON object body; empty body reads as an empty bag.
    Json,
    /// URL-encoded form body.
    Form,
    /// No parsing; the body is handed to the handler untouched.
    RawStream,
    /// Multipart metadata (content type, boundary) into the bag, body
    /// handed over untouched for streaming consumption.
    Multipart,
}

/// Normalized request data: string keys to JSON values.
#[derive(Debug, Clone, Default)]
pub struct DataBag {
    entries: BTreeMap<String, Value>,
}

impl DataBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// String view of a value, for bags built from query/form input.
    pub fn str(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Value::as_str)
    }

    /// String value that must be present, failing like a missing
    /// mandatory parameter.
    pub fn require_str(&self, key: &str) -> Result<&str, HttpError> {
        self.str(key).ok_or_else(|| missing_parameter(key))
    }

    /// Boolean with a default, tolerating absent keys.
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.entries
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// The bag as a JSON object, handy for echo-style handlers.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

/// Everything a handler receives: parsed data, its session, the request
/// head, and the raw body for passthrough modes.
pub struct RequestContext {
    pub data: DataBag,
    pub session: SessionHandle,
    pub head: Parts,
    pub raw_body: Option<Body>,
}

/// Fail with 400 naming the first missing key.
pub fn mandatory_check(data: &DataBag, keys: &[&str]) -> Result<(), HttpError> {
    for key in keys {
        if !data.contains_key(key) {
            return Err(missing_parameter(key));
        }
    }
    Ok(())
}

fn missing_parameter(key: &str) -> HttpError {
    HttpError::BadRequest(format!("Mandatory parameter \"{key}\" does not found"))
}

/// Run the route's declared parsing strategy.
pub(crate) async fn parse_request(
    mode: ParseMode,
    parts: &Parts,
    body: Body,
) -> Result<(DataBag, Option<Body>), HttpError> {
    match mode {
        ParseMode::Query => Ok((query_bag(parts), None)),
        ParseMode::Json => {
            let bytes = read_body(body).await?;
            if bytes.is_empty() {
                return Ok((DataBag::new(), None));
            }
            let value: Value = serde_json::from_slice(&bytes)
                .map_err(|_| HttpError::BadRequest("Malformed JSON body".into()))?;
            let Value::Object(object) = value else {
                return Err(HttpError::BadRequest("Malformed JSON body".into()));
            };
            let mut bag = DataBag::new();
            for (key, value) in object {
                bag.insert(key, value);
            }
            Ok((bag, None))
        }
        ParseMode::Form => {
            let bytes = read_body(body).await?;
            if bytes.is_empty() {
                return Ok((DataBag::new(), None));
            }
            let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(&bytes)
                .map_err(|_| HttpError::BadRequest("Malformed form body".into()))?;
            let mut bag = DataBag::new();
            for (key, value) in pairs {
                bag.insert(key, value);
            }
            Ok((bag, None))
        }
        ParseMode::RawStream => Ok((query_bag(parts), Some(body))),
        ParseMode::Multipart => {
            let content_type = parts
                .headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            let boundary = multipart_boundary(content_type).ok_or_else(|| {
                HttpError::BadRequest("Malformed multipart request".into())
            })?;
            let mut bag = query_bag(parts);
            bag.insert("content_type", content_type);
            bag.insert("boundary", boundary);
            Ok((bag, Some(body)))
        }
    }
}

fn query_bag(parts: &Parts) -> DataBag {
    let mut bag = DataBag::new();
    if let Some(query) = parts.uri.query() {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            bag.insert(key.into_owned(), value.into_owned());
        }
    }
    bag
}

async fn read_body(body: Body) -> Result<axum::body::Bytes, HttpError> {
    axum::body::to_bytes(body, MAX_BUFFERED_BODY)
        .await
        .map_err(|_| HttpError::BadRequest("Malformed request body".into()))
}

fn multipart_boundary(content_type: &str) -> Option<String> {
    let (kind, params) = content_type.split_once(';')?;
    if !kind.trim().eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }
    params.split(';').find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("boundary") {
            Some(value.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })
}
