//! Elasticsearch client: dispatch and response classification.
//!
//! # Design
//! `Client` holds only the base address, a default timeout and a shared
//! handle to the injected `Transport`; it carries no mutable state between
//! calls. Every operation builds an `Endpoint` with a `catalog` function,
//! renders it to an `HttpRequest`, sends it once, and classifies the
//! response with `parse_response`. Nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::catalog::{self, DEFAULT_TYPE};
use crate::codec::{self, BulkAction};
use crate::config::ClientConfig;
use crate::endpoint::{Endpoint, Params};
use crate::error::EsError;
use crate::http::{HttpRequest, HttpResponse, Transport};

/// Decoded JSON body, or `None` for an empty successful response.
pub type EsResult = Result<Option<Value>, EsError>;

/// Classify a response: 2xx decodes the body, anything else is an error
/// carrying the exact status.
pub fn parse_response(response: HttpResponse) -> EsResult {
    if response.is_success() {
        return codec::decode_body(response.status, &response.body);
    }
    Err(EsError::from_response(response.status, response.body))
}

/// Classify a HEAD response: 2xx is `true`, 404 is `false`, anything else
/// is an error.
pub fn parse_exists(response: HttpResponse) -> Result<bool, EsError> {
    match response.status {
        200..=299 => Ok(true),
        404 => Ok(false),
        status => Err(EsError::from_response(status, response.body)),
    }
}

pub struct Client<T> {
    base_url: String,
    timeout: Option<Duration>,
    transport: Arc<T>,
}

impl<T> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            timeout: self.timeout,
            transport: Arc::clone(&self.transport),
        }
    }
}

#[cfg(feature = "ureq")]
impl Client<crate::transport::UreqTransport> {
    /// Client over a `ureq` transport with default settings.
    pub fn connect(base_url: &str) -> Self {
        let config = ClientConfig::new(base_url);
        let transport = crate::transport::UreqTransport::new(&config);
        Self::new(config, transport)
    }
}

impl<T: Transport> Client<T> {
    pub fn new(config: ClientConfig, transport: T) -> Self {
        Self::with_shared_transport(config, Arc::new(transport))
    }

    /// Share one transport (and its connection pool) between clients.
    pub fn with_shared_transport(config: ClientConfig, transport: Arc<T>) -> Self {
        Self {
            base_url: config.base_url,
            timeout: config.timeout,
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Render an endpoint against this client's base address.
    pub fn request(&self, endpoint: &Endpoint) -> HttpRequest {
        endpoint.to_request(&self.base_url, self.timeout)
    }

    fn dispatch(&self, endpoint: &Endpoint) -> Result<HttpResponse, EsError> {
        let request = self.request(endpoint);
        tracing::debug!(method = %request.method, url = %request.url, "sending request");
        match self.transport.send(&request) {
            Ok(response) => {
                tracing::debug!(
                    method = %request.method,
                    url = %request.url,
                    status = response.status,
                    "received response"
                );
                Ok(response)
            }
            Err(err) => {
                tracing::warn!(method = %request.method, url = %request.url, error = %err, "transport failure");
                Err(EsError::transport(err, request.body))
            }
        }
    }

    /// Send an endpoint and decode the response.
    pub fn execute(&self, endpoint: &Endpoint) -> EsResult {
        parse_response(self.dispatch(endpoint)?)
    }

    /// Send a HEAD-style endpoint and map 404 to `false`.
    pub fn execute_exists(&self, endpoint: &Endpoint) -> Result<bool, EsError> {
        parse_exists(self.dispatch(endpoint)?)
    }

    /// `body` may carry `settings`, `mappings` and `aliases`.
    pub fn create_index(&self, index: &str, body: Option<&Value>, params: &Params) -> EsResult {
        self.execute(&catalog::create_index(index, body, params)?)
    }

    pub fn exists_index(&self, index: &str, params: &Params) -> Result<bool, EsError> {
        self.execute_exists(&catalog::exists_index(index, params)?)
    }

    pub fn get_index(&self, index: &str, params: &Params) -> EsResult {
        self.execute(&catalog::get_index(index, params)?)
    }

    pub fn delete_index(&self, index: &str, params: &Params) -> EsResult {
        self.execute(&catalog::delete_index(index, params)?)
    }

    pub fn open_index(&self, index: &str, params: &Params) -> EsResult {
        self.execute(&catalog::open_index(index, params)?)
    }

    pub fn close_index(&self, index: &str, params: &Params) -> EsResult {
        self.execute(&catalog::close_index(index, params)?)
    }

    pub fn index_stats(&self, index: &str, metric: Option<&str>, params: &Params) -> EsResult {
        self.execute(&catalog::index_stats(index, metric, params)?)
    }

    pub fn put_mapping(&self, index: &str, properties: &Value, params: &Params) -> EsResult {
        self.execute(&catalog::put_mapping(index, properties, params)?)
    }

    pub fn put_settings(&self, index: &str, settings: &Value, params: &Params) -> EsResult {
        self.execute(&catalog::put_settings(index, settings, params)?)
    }

    /// Refresh the given indices, or every index when the slice is empty.
    pub fn refresh(&self, indices: &[&str], params: &Params) -> EsResult {
        self.execute(&catalog::refresh(indices, params)?)
    }

    pub fn put_script(&self, id: &str, script: &Value, params: &Params) -> EsResult {
        self.execute(&catalog::put_script(id, script, params)?)
    }

    pub fn get_task(&self, task_id: &str, params: &Params) -> EsResult {
        self.execute(&catalog::get_task(task_id, params)?)
    }

    /// Index under `id`, or let the server assign one when `id` is empty.
    pub fn index_document<D: Serialize + ?Sized>(
        &self,
        index: &str,
        id: &str,
        document: &D,
        params: &Params,
    ) -> EsResult {
        self.index_document_with_type(index, DEFAULT_TYPE, id, document, params)
    }

    pub fn index_document_with_type<D: Serialize + ?Sized>(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        document: &D,
        params: &Params,
    ) -> EsResult {
        self.execute(&catalog::index_document(index, doc_type, id, document, params)?)
    }

    pub fn exists_document(&self, index: &str, id: &str, params: &Params) -> Result<bool, EsError> {
        self.exists_document_with_type(index, DEFAULT_TYPE, id, params)
    }

    pub fn exists_document_with_type(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        params: &Params,
    ) -> Result<bool, EsError> {
        self.execute_exists(&catalog::exists_document(index, doc_type, id, params)?)
    }

    pub fn get_document(&self, index: &str, id: &str, params: &Params) -> EsResult {
        self.get_document_with_type(index, DEFAULT_TYPE, id, params)
    }

    pub fn get_document_with_type(&self, index: &str, doc_type: &str, id: &str, params: &Params) -> EsResult {
        self.execute(&catalog::get_document(index, doc_type, id, params)?)
    }

    /// Just the `_source` of a document.
    pub fn get_source(&self, index: &str, id: &str, params: &Params) -> EsResult {
        self.execute(&catalog::get_source(index, id, params)?)
    }

    pub fn delete_document(&self, index: &str, id: &str, params: &Params) -> EsResult {
        self.delete_document_with_type(index, DEFAULT_TYPE, id, params)
    }

    pub fn delete_document_with_type(&self, index: &str, doc_type: &str, id: &str, params: &Params) -> EsResult {
        self.execute(&catalog::delete_document(index, doc_type, id, params)?)
    }

    pub fn update_document(&self, index: &str, id: &str, body: &Value, params: &Params) -> EsResult {
        self.execute(&catalog::update_document(index, id, body, params)?)
    }

    pub fn uri_search_one_index(&self, index: &str, query: &str, params: &Params) -> EsResult {
        self.execute(&catalog::uri_search(&[index], query, params)?)
    }

    pub fn uri_search_many_indices(&self, indices: &[&str], query: &str, params: &Params) -> EsResult {
        self.execute(&catalog::uri_search(indices, query, params)?)
    }

    pub fn uri_search_all_indices(&self, query: &str, params: &Params) -> EsResult {
        self.execute(&catalog::uri_search(&["_all"], query, params)?)
    }

    /// Search with a full request body (`query`, `size`, `sort`, ...).
    pub fn search(&self, indices: &[&str], body: &Value, params: &Params) -> EsResult {
        self.execute(&catalog::search(indices, body, params)?)
    }

    /// Search with `query` wrapped as `{"query": ...}`.
    pub fn search_query(&self, indices: &[&str], query: &Value, params: &Params) -> EsResult {
        self.execute(&catalog::search_query(indices, query, params)?)
    }

    pub fn count(&self, indices: &[&str], query: Option<&Value>, params: &Params) -> EsResult {
        self.execute(&catalog::count(indices, query, params)?)
    }

    /// Fetch the next page of a scroll. The caller owns the cursor.
    pub fn scroll(&self, scroll_id: &str, scroll: &str, params: &Params) -> EsResult {
        self.execute(&catalog::scroll(scroll_id, scroll, params)?)
    }

    pub fn clear_scroll(&self, scroll_ids: &[&str], params: &Params) -> EsResult {
        self.execute(&catalog::clear_scroll(scroll_ids, params)?)
    }

    pub fn bulk(&self, index: Option<&str>, actions: &[BulkAction], params: &Params) -> EsResult {
        self.execute(&catalog::bulk(index, actions, params)?)
    }

    pub fn bulk_lines(&self, index: Option<&str>, lines: &[Value], params: &Params) -> EsResult {
        self.execute(&catalog::bulk_lines(index, lines, params)?)
    }

    pub fn reindex(&self, body: &Value, params: &Params) -> EsResult {
        self.execute(&catalog::reindex(body, params)?)
    }

    pub fn update_by_query(&self, indices: &[&str], body: &Value, params: &Params) -> EsResult {
        self.execute(&catalog::update_by_query(indices, body, params)?)
    }

    pub fn update_aliases(&self, actions: &Value, params: &Params) -> EsResult {
        self.execute(&catalog::update_aliases(actions, params)?)
    }

    pub fn put_alias(&self, index: &str, alias: &str, body: Option<&Value>, params: &Params) -> EsResult {
        self.execute(&catalog::put_alias(index, alias, body, params)?)
    }

    /// Aliases of `index`; a 404 yields an empty object.
    pub fn get_aliases(&self, index: &str, params: &Params) -> Result<Value, EsError> {
        match self.execute(&catalog::get_aliases(index, params)?) {
            Ok(value) => Ok(value.unwrap_or_else(|| Value::Object(Map::new()))),
            Err(err) if err.is_not_found() => Ok(Value::Object(Map::new())),
            Err(err) => Err(err),
        }
    }

    pub fn exists_alias(&self, name: &str, params: &Params) -> Result<bool, EsError> {
        self.execute_exists(&catalog::exists_alias(name, params)?)
    }

    pub fn cat_indices(&self, pattern: Option<&str>, params: &Params) -> EsResult {
        self.execute(&catalog::cat_indices(pattern, params)?)
    }

    pub fn cat_health(&self, params: &Params) -> EsResult {
        self.execute(&catalog::cat_health(params)?)
    }

    pub fn cluster_health(&self, index: Option<&str>, params: &Params) -> EsResult {
        self.execute(&catalog::cluster_health(index, params)?)
    }
}
