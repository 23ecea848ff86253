//! Error types for the Elasticsearch client.
//!
//! # Design
//! `NotFound` gets a dedicated variant because callers frequently distinguish
//! "the resource does not exist" from "the server rejected the request." All
//! other non-2xx responses land in `Status` with the exact status code. A
//! failure that never produced a status line is a `Transport` error and
//! reports the sentinel status 500 through `EsError::status`.

use serde_json::Value;

/// Status reported for failures that never reached the server.
pub const TRANSPORT_FAILURE_STATUS: u16 = 500;

/// Raw error bodies are cut to this many bytes when they cannot be parsed.
const RAW_BODY_LIMIT: usize = 512;

/// Failure of the injected transport before a response was obtained.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors returned by `Client` operations.
#[derive(Debug, thiserror::Error)]
pub enum EsError {
    /// The server returned 404.
    #[error("{}", describe(&404, .body))]
    NotFound { body: String, data: Option<Value> },

    /// The server returned a non-2xx status other than 404.
    #[error("{}", describe(.status, .body))]
    Status {
        status: u16,
        body: String,
        data: Option<Value>,
    },

    /// No response was obtained. `request_body` is kept for diagnostics.
    #[error("An error occurred. Response code: 500 (transport failure: {source})")]
    Transport {
        #[source]
        source: TransportError,
        request_body: Option<String>,
    },

    /// A required path argument (index, id, alias, task id) was empty. The
    /// request was never sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A successful response carried a body that is not JSON.
    #[error("deserialization failed for response with status {status}: {source}")]
    Deserialization {
        status: u16,
        body: String,
        #[source]
        source: serde_json::Error,
    },
}

impl EsError {
    /// Build the error for a non-2xx response.
    ///
    /// Never fails: a body that is not JSON leaves `data` empty and the raw
    /// text is still kept.
    pub fn from_response(status: u16, body: String) -> Self {
        let data = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|mut parsed| parsed.get_mut("error").map(Value::take));
        if status == 404 {
            EsError::NotFound { body, data }
        } else {
            EsError::Status { status, body, data }
        }
    }

    pub fn transport(source: TransportError, request_body: Option<String>) -> Self {
        EsError::Transport {
            source,
            request_body,
        }
    }

    /// HTTP status of the failure, or 500 when no response was obtained
    /// (including requests rejected before sending).
    pub fn status(&self) -> u16 {
        match self {
            EsError::NotFound { .. } => 404,
            EsError::Status { status, .. } => *status,
            EsError::Deserialization { status, .. } => *status,
            EsError::Transport { .. } | EsError::InvalidArgument(_) | EsError::Serialization(_) => {
                TRANSPORT_FAILURE_STATUS
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EsError::NotFound { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, EsError::Transport { .. })
    }

    /// The `error` member of the response body, if it parsed.
    pub fn data(&self) -> Option<&Value> {
        match self {
            EsError::NotFound { data, .. } | EsError::Status { data, .. } => data.as_ref(),
            _ => None,
        }
    }

    /// Raw response body, if a response was obtained.
    pub fn body(&self) -> Option<&str> {
        match self {
            EsError::NotFound { body, .. }
            | EsError::Status { body, .. }
            | EsError::Deserialization { body, .. } => Some(body),
            _ => None,
        }
    }

    /// `error.type` from the body, e.g. `index_not_found_exception`.
    pub fn error_type(&self) -> Option<&str> {
        self.data()?.get("type")?.as_str()
    }

    /// `error.reason` from the body. Older servers send `error` as a plain
    /// string, which is returned as the reason.
    pub fn reason(&self) -> Option<&str> {
        let data = self.data()?;
        match data {
            Value::String(reason) => Some(reason),
            _ => data.get("reason")?.as_str(),
        }
    }
}

fn describe(status: &u16, body: &str) -> String {
    let mut message = format!("An error occurred. Response code: {status}");
    if body.trim().is_empty() {
        return message;
    }
    message.push('\n');
    match serde_json::from_str::<Value>(body).and_then(|v| serde_json::to_string_pretty(&v)) {
        Ok(pretty) => message.push_str(&pretty),
        Err(_) => message.push_str(truncate(body, RAW_BODY_LIMIT)),
    }
    message
}

fn truncate(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
