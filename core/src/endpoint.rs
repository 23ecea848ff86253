//! Endpoint descriptors: method, path segments, query parameters and body.
//!
//! An `Endpoint` carries no base address. `Endpoint::to_request` renders it
//! against one, which keeps the catalog functions pure and lets the same
//! descriptor be checked in tests without a client.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::http::{HttpMethod, HttpRequest};
use crate::uri;

pub const JSON: &str = "application/json";
pub const NDJSON: &str = "application/x-ndjson";

/// Query options appended to the URL verbatim, plus an optional per-call
/// timeout that is forwarded to the transport.
///
/// Keys the client does not know about are passed through to the server
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pairs: BTreeMap<String, String>,
    timeout: Option<Duration>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of `set`.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pairs.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn timeout_value(&self) -> Option<Duration> {
        self.timeout
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.set(k, v);
        }
        params
    }
}

/// An encoded request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Json(String),
    NdJson(String),
}

impl Body {
    pub fn content_type(&self) -> &'static str {
        match self {
            Body::Json(_) => JSON,
            Body::NdJson(_) => NDJSON,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Body::Json(text) | Body::NdJson(text) => text,
        }
    }
}

/// One REST call, independent of any base address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: HttpMethod,
    pub segments: Vec<String>,
    pub params: Params,
    pub body: Option<Body>,
}

impl Endpoint {
    pub fn new<I, S>(method: HttpMethod, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            params: Params::new(),
            body: None,
        }
    }

    /// Merge caller options over any parameters the endpoint already set.
    pub fn with_params(mut self, params: &Params) -> Self {
        for (k, v) in params.iter() {
            self.params.set(k, v);
        }
        if let Some(timeout) = params.timeout_value() {
            self.params = self.params.timeout(timeout);
        }
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Encoded path and query, e.g. `/orders/_doc/1?refresh=true`.
    pub fn path(&self) -> String {
        let mut path = uri::join_path("", &self.segments);
        if path.is_empty() {
            path.push('/');
        }
        if let Some(query) = uri::query_string(self.params.iter()) {
            path.push('?');
            path.push_str(&query);
        }
        path
    }

    /// Render against a base address. The endpoint's own timeout wins over
    /// `default_timeout`.
    pub fn to_request(&self, base_url: &str, default_timeout: Option<Duration>) -> HttpRequest {
        let content_type = self.body.as_ref().map_or(JSON, Body::content_type);
        HttpRequest {
            method: self.method,
            url: format!("{}{}", uri::normalize_base(base_url), self.path()),
            headers: vec![
                ("Content-Type".to_string(), content_type.to_string()),
                ("Accept".to_string(), JSON.to_string()),
            ],
            body: self.body.as_ref().map(|b| b.as_str().to_string()),
            timeout: self.params.timeout_value().or(default_timeout),
        }
    }
}
