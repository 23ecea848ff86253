//! The operation catalog: one pure function per REST endpoint.
//!
//! Each function returns the `Endpoint` for an operation without touching the
//! network. Path arguments an endpoint cannot do without are checked here: an
//! empty index, id, alias or task id is an `EsError::InvalidArgument`, never a
//! shorter path that would hit a different endpoint. Optional segments are
//! `Option`s and drop out of the path when absent. `Client` composes these
//! with dispatch; they are public so a host that does its own I/O can use
//! them directly.

use serde::Serialize;
use serde_json::{json, Value};

use crate::codec::{self, BulkAction};
use crate::endpoint::{Body, Endpoint, Params};
use crate::error::EsError;
use crate::http::HttpMethod;

/// Mapping type used when the caller does not name one.
pub const DEFAULT_TYPE: &str = "_doc";

fn required<'a>(name: &str, value: &'a str) -> Result<&'a str, EsError> {
    if value.is_empty() {
        return Err(EsError::InvalidArgument(format!("{name} must not be empty")));
    }
    Ok(value)
}

/// `Some("")` counts as absent.
fn optional(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Comma-joined index names, or `None` for an empty list.
fn index_list(indices: &[&str]) -> Result<Option<String>, EsError> {
    if indices.is_empty() {
        return Ok(None);
    }
    if indices.iter().any(|name| name.is_empty()) {
        return Err(EsError::InvalidArgument("index names must not be empty".to_string()));
    }
    Ok(Some(indices.join(",")))
}

/// Comma-join index names; an empty list means every index.
pub fn join_indices(indices: &[&str]) -> Result<String, EsError> {
    Ok(index_list(indices)?.unwrap_or_else(|| "_all".to_string()))
}

fn json_body<T: Serialize + ?Sized>(body: &T) -> Result<Body, EsError> {
    Ok(Body::Json(codec::encode_json(body)?))
}

fn with_optional_body(endpoint: Endpoint, body: Option<&Value>) -> Result<Endpoint, EsError> {
    match body {
        Some(body) => Ok(endpoint.with_body(json_body(body)?)),
        None => Ok(endpoint),
    }
}

// Indices

pub fn create_index(index: &str, body: Option<&Value>, params: &Params) -> Result<Endpoint, EsError> {
    let endpoint = Endpoint::new(HttpMethod::Put, [required("index", index)?]).with_params(params);
    with_optional_body(endpoint, body)
}

pub fn exists_index(index: &str, params: &Params) -> Result<Endpoint, EsError> {
    Ok(Endpoint::new(HttpMethod::Head, [required("index", index)?]).with_params(params))
}

pub fn get_index(index: &str, params: &Params) -> Result<Endpoint, EsError> {
    Ok(Endpoint::new(HttpMethod::Get, [required("index", index)?]).with_params(params))
}

pub fn delete_index(index: &str, params: &Params) -> Result<Endpoint, EsError> {
    Ok(Endpoint::new(HttpMethod::Delete, [required("index", index)?]).with_params(params))
}

pub fn open_index(index: &str, params: &Params) -> Result<Endpoint, EsError> {
    Ok(Endpoint::new(HttpMethod::Post, [required("index", index)?, "_open"]).with_params(params))
}

pub fn close_index(index: &str, params: &Params) -> Result<Endpoint, EsError> {
    Ok(Endpoint::new(HttpMethod::Post, [required("index", index)?, "_close"]).with_params(params))
}

pub fn index_stats(index: &str, metric: Option<&str>, params: &Params) -> Result<Endpoint, EsError> {
    let segments = [Some(required("index", index)?), Some("_stats"), optional(metric)];
    Ok(Endpoint::new(HttpMethod::Get, segments.into_iter().flatten()).with_params(params))
}

/// `properties` is wrapped as `{"properties": ...}`.
pub fn put_mapping(index: &str, properties: &Value, params: &Params) -> Result<Endpoint, EsError> {
    Ok(Endpoint::new(HttpMethod::Put, [required("index", index)?, "_mapping"])
        .with_params(params)
        .with_body(json_body(&json!({ "properties": properties }))?))
}

pub fn put_settings(index: &str, settings: &Value, params: &Params) -> Result<Endpoint, EsError> {
    Ok(Endpoint::new(HttpMethod::Put, [required("index", index)?, "_settings"])
        .with_params(params)
        .with_body(json_body(settings)?))
}

pub fn refresh(indices: &[&str], params: &Params) -> Result<Endpoint, EsError> {
    let segments = [index_list(indices)?, Some("_refresh".to_string())];
    Ok(Endpoint::new(HttpMethod::Post, segments.into_iter().flatten()).with_params(params))
}

// Scripts and tasks

pub fn put_script(id: &str, script: &Value, params: &Params) -> Result<Endpoint, EsError> {
    Ok(Endpoint::new(HttpMethod::Put, ["_scripts", required("script id", id)?])
        .with_params(params)
        .with_body(json_body(script)?))
}

pub fn get_task(task_id: &str, params: &Params) -> Result<Endpoint, EsError> {
    Ok(Endpoint::new(HttpMethod::Get, ["_tasks", required("task id", task_id)?]).with_params(params))
}

// Documents

fn document_path<'a>(index: &'a str, doc_type: &'a str, id: &'a str) -> Result<[&'a str; 3], EsError> {
    Ok([
        required("index", index)?,
        required("document type", doc_type)?,
        required("document id", id)?,
    ])
}

/// PUT with the given id, or POST so the server assigns one when `id` is
/// empty.
pub fn index_document<T: Serialize + ?Sized>(
    index: &str,
    doc_type: &str,
    id: &str,
    document: &T,
    params: &Params,
) -> Result<Endpoint, EsError> {
    let index = required("index", index)?;
    let doc_type = required("document type", doc_type)?;
    let endpoint = match optional(Some(id)) {
        Some(id) => Endpoint::new(HttpMethod::Put, [index, doc_type, id]),
        None => Endpoint::new(HttpMethod::Post, [index, doc_type]),
    };
    Ok(endpoint.with_params(params).with_body(json_body(document)?))
}

pub fn exists_document(index: &str, doc_type: &str, id: &str, params: &Params) -> Result<Endpoint, EsError> {
    Ok(Endpoint::new(HttpMethod::Head, document_path(index, doc_type, id)?).with_params(params))
}

pub fn get_document(index: &str, doc_type: &str, id: &str, params: &Params) -> Result<Endpoint, EsError> {
    Ok(Endpoint::new(HttpMethod::Get, document_path(index, doc_type, id)?).with_params(params))
}

pub fn get_source(index: &str, id: &str, params: &Params) -> Result<Endpoint, EsError> {
    Ok(Endpoint::new(HttpMethod::Get, document_path(index, "_source", id)?).with_params(params))
}

pub fn delete_document(index: &str, doc_type: &str, id: &str, params: &Params) -> Result<Endpoint, EsError> {
    Ok(Endpoint::new(HttpMethod::Delete, document_path(index, doc_type, id)?).with_params(params))
}

/// `body` is sent as is: `{"doc": ...}`, `{"script": ...}` or an upsert.
pub fn update_document(index: &str, id: &str, body: &Value, params: &Params) -> Result<Endpoint, EsError> {
    Ok(Endpoint::new(HttpMethod::Post, document_path(index, "_update", id)?)
        .with_params(params)
        .with_body(json_body(body)?))
}

// Search

/// `GET /{indices}/_search?q=...`. An empty index list searches `_all`.
pub fn uri_search(indices: &[&str], query: &str, params: &Params) -> Result<Endpoint, EsError> {
    let mut endpoint =
        Endpoint::new(HttpMethod::Get, [join_indices(indices)?, "_search".to_string()]).with_params(params);
    endpoint.params.set("q", query);
    Ok(endpoint)
}

/// `POST /[{indices}/]_search` with a full request body.
pub fn search(indices: &[&str], body: &Value, params: &Params) -> Result<Endpoint, EsError> {
    let segments = [index_list(indices)?, Some("_search".to_string())];
    Ok(Endpoint::new(HttpMethod::Post, segments.into_iter().flatten())
        .with_params(params)
        .with_body(json_body(body)?))
}

/// Structured search with the query wrapped as `{"query": ...}`.
pub fn search_query(indices: &[&str], query: &Value, params: &Params) -> Result<Endpoint, EsError> {
    search(indices, &json!({ "query": query }), params)
}

pub fn count(indices: &[&str], query: Option<&Value>, params: &Params) -> Result<Endpoint, EsError> {
    let segments = [index_list(indices)?, Some("_count".to_string())];
    let endpoint = Endpoint::new(HttpMethod::Get, segments.into_iter().flatten()).with_params(params);
    match query {
        Some(query) => Ok(endpoint.with_body(json_body(&json!({ "query": query }))?)),
        None => Ok(endpoint),
    }
}

pub fn scroll(scroll_id: &str, scroll: &str, params: &Params) -> Result<Endpoint, EsError> {
    Ok(Endpoint::new(HttpMethod::Post, ["_search", "scroll"])
        .with_params(params)
        .with_body(json_body(&json!({ "scroll_id": scroll_id, "scroll": scroll }))?))
}

pub fn clear_scroll(scroll_ids: &[&str], params: &Params) -> Result<Endpoint, EsError> {
    Ok(Endpoint::new(HttpMethod::Delete, ["_search", "scroll"])
        .with_params(params)
        .with_body(json_body(&json!({ "scroll_id": scroll_ids }))?))
}

// Bulk, reindex, update by query

fn bulk_endpoint(index: Option<&str>, ndjson: String, params: &Params) -> Endpoint {
    Endpoint::new(HttpMethod::Post, [optional(index), Some("_bulk")].into_iter().flatten())
        .with_params(params)
        .with_body(Body::NdJson(ndjson))
}

pub fn bulk(index: Option<&str>, actions: &[BulkAction], params: &Params) -> Result<Endpoint, EsError> {
    Ok(bulk_endpoint(index, codec::encode_bulk(actions)?, params))
}

/// Bulk with caller-framed lines, for action types `BulkAction` does not model.
pub fn bulk_lines(index: Option<&str>, lines: &[Value], params: &Params) -> Result<Endpoint, EsError> {
    Ok(bulk_endpoint(index, codec::encode_ndjson(lines)?, params))
}

pub fn reindex(body: &Value, params: &Params) -> Result<Endpoint, EsError> {
    Ok(Endpoint::new(HttpMethod::Post, ["_reindex"])
        .with_params(params)
        .with_body(json_body(body)?))
}

pub fn update_by_query(indices: &[&str], body: &Value, params: &Params) -> Result<Endpoint, EsError> {
    let segments = [index_list(indices)?, Some("_update_by_query".to_string())];
    Ok(Endpoint::new(HttpMethod::Post, segments.into_iter().flatten())
        .with_params(params)
        .with_body(json_body(body)?))
}

// Aliases

/// Batch add/remove; `actions` is the array under `{"actions": ...}`.
pub fn update_aliases(actions: &Value, params: &Params) -> Result<Endpoint, EsError> {
    Ok(Endpoint::new(HttpMethod::Post, ["_aliases"])
        .with_params(params)
        .with_body(json_body(&json!({ "actions": actions }))?))
}

pub fn put_alias(index: &str, alias: &str, body: Option<&Value>, params: &Params) -> Result<Endpoint, EsError> {
    let segments = [required("index", index)?, "_aliases", required("alias", alias)?];
    with_optional_body(Endpoint::new(HttpMethod::Put, segments).with_params(params), body)
}

pub fn get_aliases(index: &str, params: &Params) -> Result<Endpoint, EsError> {
    Ok(Endpoint::new(HttpMethod::Get, ["_alias", required("index", index)?]).with_params(params))
}

pub fn exists_alias(name: &str, params: &Params) -> Result<Endpoint, EsError> {
    Ok(Endpoint::new(HttpMethod::Head, ["_alias", required("alias", name)?]).with_params(params))
}

// Cat and cluster

/// Cat endpoints answer in JSON unless the caller asks for another format.
fn cat(segments: [Option<&str>; 3], params: &Params) -> Endpoint {
    Endpoint::new(HttpMethod::Get, segments.into_iter().flatten())
        .with_params(&Params::new().param("format", "json"))
        .with_params(params)
}

pub fn cat_indices(pattern: Option<&str>, params: &Params) -> Result<Endpoint, EsError> {
    Ok(cat([Some("_cat"), Some("indices"), optional(pattern)], params))
}

pub fn cat_health(params: &Params) -> Result<Endpoint, EsError> {
    Ok(cat([Some("_cat"), Some("health"), None], params))
}

pub fn cluster_health(index: Option<&str>, params: &Params) -> Result<Endpoint, EsError> {
    let segments = [Some("_cluster"), Some("health"), optional(index)];
    Ok(Endpoint::new(HttpMethod::Get, segments.into_iter().flatten()).with_params(params))
}
