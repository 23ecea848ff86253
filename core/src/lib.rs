//! Blocking client for the Elasticsearch REST API.
//!
//! # Overview
//! Maps index management, document CRUD, search, bulk, alias and reindex
//! operations onto Elasticsearch's REST endpoints. Bodies and results are
//! `serde_json::Value`; the HTTP round trip goes through an injected
//! `Transport`.
//!
//! # Design
//! - `catalog` functions are pure: they build an `Endpoint` (method, path
//!   segments, query, body) and never touch the network.
//! - `Client` renders endpoints against its base address, sends them through
//!   the transport and classifies the response: 2xx decodes, anything else is
//!   an `EsError` with the exact status, and a transport failure reports the
//!   sentinel status 500.
//! - Exists operations return `bool`; a 404 is `false`, not an error.
//! - The transport is a constructor argument. `UreqTransport` (feature
//!   `ureq`, on by default) is the provided implementation.

pub mod catalog;
pub mod client;
pub mod codec;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
#[cfg(feature = "ureq")]
pub mod transport;
pub mod uri;

pub use client::{parse_exists, parse_response, Client, EsResult};
pub use codec::BulkAction;
pub use config::{ClientConfig, ConfigError};
pub use endpoint::{Body, Endpoint, Params};
pub use error::{EsError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
