use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};

use crate::store::{self, empty_object, merge, shards, Index, ScrollCursor, Store};
use crate::{Db, EsFailure};

type Params = Query<HashMap<String, String>>;
type Reply = Result<Json<Value>, EsFailure>;

const CLUSTER_NAME: &str = "mock-cluster";
const DEFAULT_PAGE_SIZE: usize = 10;

fn bad_request(kind: &str, reason: impl Into<String>) -> EsFailure {
    EsFailure::new(StatusCode::BAD_REQUEST, kind, reason.into())
}

fn parse_json(text: &str) -> Result<Value, EsFailure> {
    serde_json::from_str(text).map_err(|e| bad_request("parse_exception", e.to_string()))
}

fn parse_body(body: &str) -> Result<Option<Value>, EsFailure> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    parse_json(body).map(Some)
}

fn required_body(body: &str) -> Result<Value, EsFailure> {
    parse_body(body)?.ok_or_else(|| bad_request("action_request_validation_exception", "request body is required"))
}

fn acknowledged() -> Json<Value> {
    Json(json!({ "acknowledged": true }))
}

fn usize_param(params: &HashMap<String, String>, body: Option<&Value>, key: &str) -> Option<usize> {
    params
        .get(key)
        .and_then(|v| v.parse().ok())
        .or_else(|| body.and_then(|b| b.get(key)).and_then(Value::as_u64).map(|n| n as usize))
}

fn waits_for_completion(params: &HashMap<String, String>) -> bool {
    params.get("wait_for_completion").map(String::as_str) != Some("false")
}

fn single_entry(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

// Indices

pub async fn create_index(State(db): State<Db>, Path(index): Path<String>, body: String) -> Reply {
    store::validate_index_name(&index)?;
    let body = parse_body(&body)?.unwrap_or_else(empty_object);
    let mut store = db.write().await;
    if store.indices.contains_key(&index) {
        return Err(bad_request(
            "resource_already_exists_exception",
            format!("index [{index}/{}] already exists", store.indices[&index].uuid),
        ));
    }
    store.indices.insert(index.clone(), Index::new(&body));
    Ok(Json(json!({ "acknowledged": true, "shards_acknowledged": true, "index": index })))
}

pub async fn exists_index(State(db): State<Db>, Path(index): Path<String>) -> StatusCode {
    let store = db.read().await;
    match store.resolve(&index) {
        Ok(names) if !names.is_empty() => StatusCode::OK,
        _ => StatusCode::NOT_FOUND,
    }
}

pub async fn get_index(State(db): State<Db>, Path(index): Path<String>) -> Reply {
    let store = db.read().await;
    let mut out = Map::new();
    for name in store.resolve(&index)? {
        let index = store.index(&name)?;
        out.insert(
            name,
            json!({
                "aliases": index.aliases,
                "mappings": index.mappings,
                "settings": { "index": index.settings, "uuid": index.uuid },
            }),
        );
    }
    Ok(Json(Value::Object(out)))
}

pub async fn delete_index(State(db): State<Db>, Path(index): Path<String>) -> Reply {
    let mut store = db.write().await;
    for name in store.resolve(&index)? {
        store.indices.remove(&name);
    }
    Ok(acknowledged())
}

async fn set_open(db: &Db, target: &str, open: bool) -> Reply {
    let mut store = db.write().await;
    for name in store.resolve(target)? {
        store.index_mut(&name)?.open = open;
    }
    Ok(acknowledged())
}

pub async fn open_index(State(db): State<Db>, Path(index): Path<String>) -> Reply {
    set_open(&db, &index, true).await
}

pub async fn close_index(State(db): State<Db>, Path(index): Path<String>) -> Reply {
    set_open(&db, &index, false).await
}

async fn stats(db: &Db, target: &str, metric: Option<&str>) -> Reply {
    let store = db.read().await;
    let names = store.resolve(target)?;
    let section = |count: usize| match metric {
        None | Some("_all") | Some("docs") => json!({ "docs": { "count": count, "deleted": 0 } }),
        Some(other) => single_entry(other, empty_object()),
    };
    let mut indices = Map::new();
    let mut total = 0;
    for name in &names {
        let index = store.index(name)?;
        total += index.docs.len();
        indices.insert(
            name.clone(),
            json!({
                "uuid": index.uuid,
                "primaries": section(index.docs.len()),
                "total": section(index.docs.len()),
            }),
        );
    }
    Ok(Json(json!({
        "_shards": shards(names.len()),
        "_all": { "primaries": section(total), "total": section(total) },
        "indices": indices,
    })))
}

pub async fn index_stats_all(State(db): State<Db>, Path(index): Path<String>) -> Reply {
    stats(&db, &index, None).await
}

pub async fn index_stats(State(db): State<Db>, Path((index, metric)): Path<(String, String)>) -> Reply {
    stats(&db, &index, Some(&metric)).await
}

pub async fn put_mapping(State(db): State<Db>, Path(index): Path<String>, body: String) -> Reply {
    let body = required_body(&body)?;
    let mut store = db.write().await;
    for name in store.resolve(&index)? {
        merge(&mut store.index_mut(&name)?.mappings, &body);
    }
    Ok(acknowledged())
}

pub async fn get_mapping(State(db): State<Db>, Path(index): Path<String>) -> Reply {
    let store = db.read().await;
    let mut out = Map::new();
    for name in store.resolve(&index)? {
        let mappings = store.index(&name)?.mappings.clone();
        out.insert(name, json!({ "mappings": mappings }));
    }
    Ok(Json(Value::Object(out)))
}

pub async fn put_settings(State(db): State<Db>, Path(index): Path<String>, body: String) -> Reply {
    let body = required_body(&body)?;
    let patch = body.get("index").cloned().unwrap_or(body);
    let mut store = db.write().await;
    for name in store.resolve(&index)? {
        merge(&mut store.index_mut(&name)?.settings, &patch);
    }
    Ok(acknowledged())
}

pub async fn get_settings(State(db): State<Db>, Path(index): Path<String>) -> Reply {
    let store = db.read().await;
    let mut out = Map::new();
    for name in store.resolve(&index)? {
        let settings = store.index(&name)?.settings.clone();
        out.insert(name, json!({ "settings": { "index": settings } }));
    }
    Ok(Json(Value::Object(out)))
}

async fn run_refresh(db: &Db, target: &str) -> Reply {
    let store = db.read().await;
    let names = store.resolve(target)?;
    Ok(Json(json!({ "_shards": shards(names.len()) })))
}

pub async fn refresh_all(State(db): State<Db>) -> Reply {
    run_refresh(&db, "_all").await
}

pub async fn refresh(State(db): State<Db>, Path(index): Path<String>) -> Reply {
    run_refresh(&db, &index).await
}

// Documents

fn write_response(index: &str, id: &str, doc: &store::Doc, result: &str) -> Value {
    json!({
        "_index": index,
        "_id": id,
        "_version": doc.version,
        "result": result,
        "_shards": { "total": 1, "successful": 1, "failed": 0 },
        "_seq_no": doc.seq_no,
        "_primary_term": 1,
    })
}

fn store_document(
    store: &mut Store,
    index: &str,
    id: &str,
    source: Value,
    create_only: bool,
) -> Result<(StatusCode, Value), EsFailure> {
    let target = store.index_or_create(index)?;
    if create_only && target.docs.contains_key(id) {
        return Err(EsFailure::new(
            StatusCode::CONFLICT,
            "version_conflict_engine_exception",
            format!("[{id}]: version conflict, document already exists"),
        ));
    }
    let (doc, created) = target.put(id, source);
    let (status, result) = if created {
        (StatusCode::CREATED, "created")
    } else {
        (StatusCode::OK, "updated")
    };
    Ok((status, write_response(index, id, &doc, result)))
}

pub async fn index_document(
    State(db): State<Db>,
    Path((index, _doc_type, id)): Path<(String, String, String)>,
    Query(params): Params,
    body: String,
) -> Result<(StatusCode, Json<Value>), EsFailure> {
    let source = required_body(&body)?;
    let create_only = params.get("op_type").map(String::as_str) == Some("create");
    let mut store = db.write().await;
    let (status, response) = store_document(&mut store, &index, &id, source, create_only)?;
    Ok((status, Json(response)))
}

pub async fn create_document_auto_id(
    State(db): State<Db>,
    Path((index, _doc_type)): Path<(String, String)>,
    body: String,
) -> Result<(StatusCode, Json<Value>), EsFailure> {
    let source = required_body(&body)?;
    let id = uuid::Uuid::new_v4().simple().to_string();
    let mut store = db.write().await;
    let (status, response) = store_document(&mut store, &index, &id, source, true)?;
    Ok((status, Json(response)))
}

pub async fn exists_document(
    State(db): State<Db>,
    Path((index, _doc_type, id)): Path<(String, String, String)>,
) -> StatusCode {
    let store = db.read().await;
    match store.open_index(&index) {
        Ok(target) if target.docs.contains_key(&id) => StatusCode::OK,
        _ => StatusCode::NOT_FOUND,
    }
}

pub async fn get_document(
    State(db): State<Db>,
    Path((index, _doc_type, id)): Path<(String, String, String)>,
    Query(params): Params,
) -> Reply {
    let store = db.read().await;
    let target = store.open_index(&index)?;
    let Some(doc) = target.docs.get(&id) else {
        return Err(EsFailure::raw(
            StatusCode::NOT_FOUND,
            json!({ "_index": index, "_id": id, "found": false }),
        ));
    };
    let mut response = json!({
        "_index": index,
        "_id": id,
        "_version": doc.version,
        "_seq_no": doc.seq_no,
        "_primary_term": 1,
        "found": true,
    });
    if params.get("_source").map(String::as_str) != Some("false") {
        response["_source"] = doc.source.clone();
    }
    Ok(Json(response))
}

pub async fn get_source(State(db): State<Db>, Path((index, id)): Path<(String, String)>) -> Reply {
    let store = db.read().await;
    let target = store.open_index(&index)?;
    target.docs.get(&id).map(|doc| Json(doc.source.clone())).ok_or_else(|| {
        EsFailure::new(
            StatusCode::NOT_FOUND,
            "resource_not_found_exception",
            format!("Document not found [{index}]/[{id}]"),
        )
    })
}

pub async fn delete_document(
    State(db): State<Db>,
    Path((index, _doc_type, id)): Path<(String, String, String)>,
) -> Reply {
    let mut store = db.write().await;
    let target = store.index_mut(&index)?;
    match target.docs.remove(&id) {
        Some(doc) => Ok(Json(write_response(&index, &id, &doc, "deleted"))),
        None => Err(EsFailure::raw(
            StatusCode::NOT_FOUND,
            json!({ "_index": index, "_id": id, "result": "not_found" }),
        )),
    }
}

pub async fn update_document(
    State(db): State<Db>,
    Path((index, id)): Path<(String, String)>,
    body: String,
) -> Reply {
    let body = required_body(&body)?;
    let mut store = db.write().await;
    let target = store.index_or_create(&index)?;
    let patch = body.get("doc");
    match target.docs.get(&id).cloned() {
        Some(existing) => {
            let Some(patch) = patch else {
                return Err(bad_request("action_request_validation_exception", "script or doc is missing"));
            };
            let mut source = existing.source;
            merge(&mut source, patch);
            let (doc, _) = target.put(&id, source);
            Ok(Json(write_response(&index, &id, &doc, "updated")))
        }
        None => {
            let upsert = match (body.get("upsert"), patch) {
                (Some(upsert), _) => upsert.clone(),
                (None, Some(doc)) if body.get("doc_as_upsert") == Some(&Value::Bool(true)) => doc.clone(),
                _ => {
                    return Err(EsFailure::new(
                        StatusCode::NOT_FOUND,
                        "document_missing_exception",
                        format!("[{id}]: document missing"),
                    ))
                }
            };
            let (doc, _) = target.put(&id, upsert);
            Ok(Json(write_response(&index, &id, &doc, "created")))
        }
    }
}

// Search, count, scroll

fn search_response(total: usize, hits: Vec<Value>, shard_count: usize) -> Value {
    let max_score = if hits.is_empty() { Value::Null } else { json!(1.0) };
    json!({
        "took": 1,
        "timed_out": false,
        "_shards": shards(shard_count),
        "hits": {
            "total": { "value": total, "relation": "eq" },
            "max_score": max_score,
            "hits": hits,
        },
    })
}

fn query_of(params: &HashMap<String, String>, body: Option<&Value>) -> Result<store::Query, EsFailure> {
    match params.get("q") {
        Some(q) => Ok(store::Query::from_uri(q)),
        None => store::Query::from_dsl(body.and_then(|b| b.get("query"))),
    }
}

async fn run_search(db: &Db, target: &str, params: &HashMap<String, String>, body: &str) -> Reply {
    let body = parse_body(body)?;
    let query = query_of(params, body.as_ref())?;
    let size = usize_param(params, body.as_ref(), "size").unwrap_or(DEFAULT_PAGE_SIZE);
    let from = usize_param(params, body.as_ref(), "from").unwrap_or(0);

    let mut store = db.write().await;
    let names = store.resolve(target)?;
    let hits = store.matching_hits(&names, &query)?;
    let total = hits.len();
    let mut page: Vec<Value> = hits.into_iter().skip(from).collect();
    let rest = page.split_off(size.min(page.len()));

    let mut response = search_response(total, page, names.len());
    if params.contains_key("scroll") {
        let scroll_id = uuid::Uuid::new_v4().simple().to_string();
        store.scrolls.insert(
            scroll_id.clone(),
            ScrollCursor {
                remaining: rest,
                size,
                total,
            },
        );
        response["_scroll_id"] = json!(scroll_id);
    }
    Ok(Json(response))
}

pub async fn search_all(State(db): State<Db>, Query(params): Params, body: String) -> Reply {
    run_search(&db, "_all", &params, &body).await
}

pub async fn search(State(db): State<Db>, Path(index): Path<String>, Query(params): Params, body: String) -> Reply {
    run_search(&db, &index, &params, &body).await
}

async fn run_count(db: &Db, target: &str, params: &HashMap<String, String>, body: &str) -> Reply {
    let body = parse_body(body)?;
    let query = query_of(params, body.as_ref())?;
    let store = db.read().await;
    let names = store.resolve(target)?;
    let count = store.matching_hits(&names, &query)?.len();
    Ok(Json(json!({ "count": count, "_shards": shards(names.len()) })))
}

pub async fn count_all(State(db): State<Db>, Query(params): Params, body: String) -> Reply {
    run_count(&db, "_all", &params, &body).await
}

pub async fn count(State(db): State<Db>, Path(index): Path<String>, Query(params): Params, body: String) -> Reply {
    run_count(&db, &index, &params, &body).await
}

pub async fn scroll(State(db): State<Db>, Query(params): Params, body: String) -> Reply {
    let body = parse_body(&body)?.unwrap_or_else(empty_object);
    let scroll_id = body
        .get("scroll_id")
        .and_then(Value::as_str)
        .or_else(|| params.get("scroll_id").map(String::as_str))
        .ok_or_else(|| bad_request("action_request_validation_exception", "scrollId is missing"))?
        .to_string();
    let mut store = db.write().await;
    let Some(cursor) = store.scrolls.get_mut(&scroll_id) else {
        return Err(EsFailure::new(
            StatusCode::NOT_FOUND,
            "search_context_missing_exception",
            format!("No search context found for id [{scroll_id}]"),
        ));
    };
    let take = cursor.size.min(cursor.remaining.len());
    let page: Vec<Value> = cursor.remaining.drain(..take).collect();
    let mut response = search_response(cursor.total, page, 1);
    response["_scroll_id"] = json!(scroll_id);
    Ok(Json(response))
}

pub async fn clear_scroll(State(db): State<Db>, body: String) -> Reply {
    let body = parse_body(&body)?.unwrap_or_else(empty_object);
    let ids: Vec<String> = match body.get("scroll_id") {
        Some(Value::String(id)) => vec![id.clone()],
        Some(Value::Array(ids)) => ids.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        _ => Vec::new(),
    };
    let mut store = db.write().await;
    let freed = ids.iter().filter(|id| store.scrolls.remove(*id).is_some()).count();
    Ok(Json(json!({ "succeeded": true, "num_freed": freed })))
}

// Bulk

fn bulk_item(store: &mut Store, op: &str, index: &str, id: Option<String>, source: Option<Value>) -> Value {
    let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
    let outcome = match (op, source) {
        ("index", Some(source)) => store_document(store, index, &id, source, false),
        ("create", Some(source)) => store_document(store, index, &id, source, true),
        ("update", Some(update)) => store.index_or_create(index).and_then(|target| {
            let Some(existing) = target.docs.get(&id).cloned() else {
                return Err(EsFailure::new(
                    StatusCode::NOT_FOUND,
                    "document_missing_exception",
                    format!("[{id}]: document missing"),
                ));
            };
            let mut merged = existing.source;
            merge(&mut merged, update.get("doc").unwrap_or(&Value::Null));
            let (doc, _) = target.put(&id, merged);
            Ok((StatusCode::OK, write_response(index, &id, &doc, "updated")))
        }),
        ("delete", None) => store.index_mut(index).map(|target| match target.docs.remove(&id) {
            Some(doc) => (StatusCode::OK, write_response(index, &id, &doc, "deleted")),
            None => (
                StatusCode::NOT_FOUND,
                json!({ "_index": index, "_id": id, "result": "not_found" }),
            ),
        }),
        _ => Err(bad_request("illegal_argument_exception", format!("Malformed action [{op}]"))),
    };
    match outcome {
        Ok((status, mut item)) => {
            item["status"] = json!(status.as_u16());
            item
        }
        Err(err) => json!({
            "_index": index,
            "_id": id,
            "status": err.status.as_u16(),
            "error": err.body.get("error").cloned().unwrap_or(Value::Null),
        }),
    }
}

async fn run_bulk(db: &Db, default_index: Option<&str>, body: &str) -> Reply {
    let mut lines = body.lines().filter(|line| !line.trim().is_empty());
    let mut store = db.write().await;
    let mut items = Vec::new();
    let mut errors = false;

    while let Some(line) = lines.next() {
        let action = parse_json(line)?;
        let Some((op, meta)) = action.as_object().and_then(|o| o.iter().next()) else {
            return Err(bad_request("illegal_argument_exception", "Malformed action/metadata line"));
        };
        let index = meta
            .get("_index")
            .and_then(Value::as_str)
            .or(default_index)
            .ok_or_else(|| bad_request("action_request_validation_exception", "index is missing"))?;
        let id = meta.get("_id").and_then(Value::as_str).map(str::to_string);
        let source = match op.as_str() {
            "delete" => None,
            _ => {
                let line = lines
                    .next()
                    .ok_or_else(|| bad_request("illegal_argument_exception", "source line is missing"))?;
                Some(parse_json(line)?)
            }
        };
        let item = bulk_item(&mut store, op, index, id, source);
        if item["status"].as_u64().is_some_and(|s| s >= 300) {
            errors = true;
        }
        items.push(single_entry(op, item));
    }

    tracing::debug!(items = items.len(), errors, "bulk request applied");
    Ok(Json(json!({ "took": 1, "errors": errors, "items": items })))
}

pub async fn bulk_all(State(db): State<Db>, body: String) -> Reply {
    run_bulk(&db, None, &body).await
}

pub async fn bulk(State(db): State<Db>, Path(index): Path<String>, body: String) -> Reply {
    run_bulk(&db, Some(&index), &body).await
}

// Reindex, update by query, tasks, scripts

fn finish_task(store: &mut Store, params: &HashMap<String, String>, action: &str, response: Value) -> Value {
    if waits_for_completion(params) {
        response
    } else {
        json!({ "task": store.register_task(action, response) })
    }
}

pub async fn reindex(State(db): State<Db>, Query(params): Params, body: String) -> Reply {
    let body = required_body(&body)?;
    let source_index = match body.pointer("/source/index") {
        Some(Value::String(name)) => name.clone(),
        Some(Value::Array(names)) => names.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(","),
        _ => return Err(bad_request("action_request_validation_exception", "source index is missing")),
    };
    let dest_index = body
        .pointer("/dest/index")
        .and_then(Value::as_str)
        .ok_or_else(|| bad_request("action_request_validation_exception", "destination index is missing"))?
        .to_string();
    let query = store::Query::from_dsl(body.pointer("/source/query"))?;

    let mut store = db.write().await;
    let names = store.resolve(&source_index)?;
    let hits = store.matching_hits(&names, &query)?;
    let (mut created, mut updated) = (0, 0);
    for hit in &hits {
        let id = hit["_id"].as_str().unwrap_or_default();
        let dest = store.index_or_create(&dest_index)?;
        let (_, doc_created) = dest.put(id, hit["_source"].clone());
        if doc_created {
            created += 1;
        } else {
            updated += 1;
        }
    }
    tracing::debug!(source = %source_index, dest = %dest_index, total = hits.len(), "reindexed");
    let response = json!({
        "took": 1,
        "timed_out": false,
        "total": hits.len(),
        "created": created,
        "updated": updated,
        "deleted": 0,
        "batches": 1,
        "failures": [],
    });
    Ok(Json(finish_task(&mut store, &params, "indices:data/write/reindex", response)))
}

/// Assignments of the form `ctx._source.field = <value>`, separated by `;`.
/// `<value>` is `params.name`, a quoted string or a JSON literal.
fn apply_script(source: &mut Value, script: &Value) -> Result<(), EsFailure> {
    let (code, script_params) = match script {
        Value::String(code) => (code.as_str(), empty_object()),
        other => (
            other.get("source").and_then(Value::as_str).unwrap_or_default(),
            other.get("params").cloned().unwrap_or_else(empty_object),
        ),
    };
    for statement in code.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let Some((lhs, rhs)) = statement.split_once('=') else {
            return Err(bad_request("script_exception", format!("unsupported statement [{statement}]")));
        };
        let Some(field) = lhs.trim().strip_prefix("ctx._source.") else {
            return Err(bad_request("script_exception", format!("unsupported target [{}]", lhs.trim())));
        };
        let rhs = rhs.trim();
        let value = if let Some(name) = rhs.strip_prefix("params.") {
            script_params.get(name).cloned().unwrap_or(Value::Null)
        } else if rhs.len() >= 2 && rhs.starts_with('\'') && rhs.ends_with('\'') {
            Value::String(rhs[1..rhs.len() - 1].to_string())
        } else {
            parse_json(rhs)?
        };
        if let Some(fields) = source.as_object_mut() {
            fields.insert(field.to_string(), value);
        }
    }
    Ok(())
}

async fn run_update_by_query(db: &Db, target: &str, params: &HashMap<String, String>, body: &str) -> Reply {
    let body = parse_body(body)?.unwrap_or_else(empty_object);
    let query = store::Query::from_dsl(body.get("query"))?;
    let mut store = db.write().await;
    let names = store.resolve(target)?;
    let mut updated = 0;
    for name in &names {
        let index = store.index_mut(name)?;
        let ids: Vec<String> = index
            .docs
            .iter()
            .filter(|(_, doc)| query.matches(&doc.source))
            .map(|(id, _)| id.clone())
            .collect();
        for id in ids {
            let mut source = index.docs[&id].source.clone();
            if let Some(script) = body.get("script") {
                apply_script(&mut source, script)?;
            }
            index.put(&id, source);
            updated += 1;
        }
    }
    let response = json!({
        "took": 1,
        "timed_out": false,
        "total": updated,
        "updated": updated,
        "deleted": 0,
        "batches": 1,
        "failures": [],
    });
    Ok(Json(finish_task(&mut store, params, "indices:data/write/update/byquery", response)))
}

pub async fn update_by_query_all(State(db): State<Db>, Query(params): Params, body: String) -> Reply {
    run_update_by_query(&db, "_all", &params, &body).await
}

pub async fn update_by_query(
    State(db): State<Db>,
    Path(index): Path<String>,
    Query(params): Params,
    body: String,
) -> Reply {
    run_update_by_query(&db, &index, &params, &body).await
}

pub async fn get_task(State(db): State<Db>, Path(task_id): Path<String>) -> Reply {
    let store = db.read().await;
    store.tasks.get(&task_id).cloned().map(Json).ok_or_else(|| {
        EsFailure::new(
            StatusCode::NOT_FOUND,
            "resource_not_found_exception",
            format!("task [{task_id}] isn't running and hasn't stored its results"),
        )
    })
}

pub async fn put_script(State(db): State<Db>, Path(id): Path<String>, body: String) -> Reply {
    let body = required_body(&body)?;
    let script = body
        .get("script")
        .cloned()
        .ok_or_else(|| bad_request("illegal_argument_exception", "must specify [script] for storing a script"))?;
    db.write().await.scripts.insert(id, script);
    Ok(acknowledged())
}

pub async fn get_script(State(db): State<Db>, Path(id): Path<String>) -> Reply {
    let store = db.read().await;
    match store.scripts.get(&id) {
        Some(script) => Ok(Json(json!({ "_id": id, "found": true, "script": script }))),
        None => Err(EsFailure::raw(StatusCode::NOT_FOUND, json!({ "_id": id, "found": false }))),
    }
}

// Aliases

fn alias_targets(definition: &Value) -> Vec<String> {
    let mut names: Vec<String> = definition
        .get("indices")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();
    if let Some(index) = definition.get("index").and_then(Value::as_str) {
        names.push(index.to_string());
    }
    names
}

fn alias_properties(definition: &Value) -> Value {
    let mut props = Map::new();
    for key in ["filter", "routing", "index_routing", "search_routing", "is_write_index"] {
        if let Some(value) = definition.get(key) {
            props.insert(key.to_string(), value.clone());
        }
    }
    Value::Object(props)
}

pub async fn update_aliases(State(db): State<Db>, body: String) -> Reply {
    let body = required_body(&body)?;
    let actions = body
        .get("actions")
        .and_then(Value::as_array)
        .ok_or_else(|| bad_request("action_request_validation_exception", "no actions specified"))?;
    let mut store = db.write().await;
    for action in actions {
        let Some((kind, definition)) = action.as_object().and_then(|o| o.iter().next()) else {
            return Err(bad_request("illegal_argument_exception", "malformed alias action"));
        };
        let alias = definition
            .get("alias")
            .and_then(Value::as_str)
            .ok_or_else(|| bad_request("action_request_validation_exception", "alias is missing"))?;
        for target in alias_targets(definition) {
            for name in store.resolve(&target)? {
                let index = store.index_mut(&name)?;
                match kind.as_str() {
                    "add" => {
                        index.aliases.insert(alias.to_string(), alias_properties(definition));
                    }
                    "remove" => {
                        index.aliases.remove(alias);
                    }
                    other => {
                        return Err(bad_request(
                            "illegal_argument_exception",
                            format!("unsupported alias action [{other}]"),
                        ))
                    }
                }
            }
        }
    }
    Ok(acknowledged())
}

pub async fn put_alias(
    State(db): State<Db>,
    Path((index, alias)): Path<(String, String)>,
    body: String,
) -> Reply {
    let definition = parse_body(&body)?.unwrap_or_else(empty_object);
    let mut store = db.write().await;
    for name in store.resolve(&index)? {
        store.index_mut(&name)?.aliases.insert(alias.clone(), alias_properties(&definition));
    }
    Ok(acknowledged())
}

/// Accepts either an index name (its aliases) or an alias name (the indices
/// carrying it).
pub async fn get_alias(State(db): State<Db>, Path(name): Path<String>) -> Reply {
    let store = db.read().await;
    let mut out = Map::new();
    if let Some(index) = store.indices.get(&name) {
        out.insert(name.clone(), json!({ "aliases": index.aliases }));
        return Ok(Json(Value::Object(out)));
    }
    for (index_name, index) in &store.indices {
        if let Some(props) = index.aliases.get(&name) {
            out.insert(index_name.clone(), json!({ "aliases": single_entry(&name, props.clone()) }));
        }
    }
    if out.is_empty() {
        return Err(EsFailure::raw(
            StatusCode::NOT_FOUND,
            json!({ "error": format!("alias [{name}] missing"), "status": 404 }),
        ));
    }
    Ok(Json(Value::Object(out)))
}

pub async fn exists_alias(State(db): State<Db>, Path(name): Path<String>) -> StatusCode {
    let store = db.read().await;
    if store.indices.values().any(|index| index.aliases.contains_key(&name)) {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

// Cat and cluster

fn cat_reply(params: &HashMap<String, String>, rows: Vec<Value>, columns: &[&str]) -> Response {
    if params.get("format").map(String::as_str) == Some("json") {
        return Json(Value::Array(rows)).into_response();
    }
    let text: String = rows
        .iter()
        .map(|row| {
            let cells: Vec<String> = columns
                .iter()
                .map(|c| row.get(*c).and_then(Value::as_str).unwrap_or("").to_string())
                .collect();
            cells.join(" ") + "\n"
        })
        .collect();
    ([(header::CONTENT_TYPE, "text/plain; charset=UTF-8")], text).into_response()
}

async fn run_cat_indices(db: &Db, pattern: &str, params: &HashMap<String, String>) -> Result<Response, EsFailure> {
    let store = db.read().await;
    let mut rows = Vec::new();
    for name in store.resolve(pattern)? {
        let index = store.index(&name)?;
        rows.push(json!({
            "health": "green",
            "status": if index.open { "open" } else { "close" },
            "index": name,
            "uuid": index.uuid,
            "pri": "1",
            "rep": "0",
            "docs.count": index.docs.len().to_string(),
            "docs.deleted": "0",
        }));
    }
    Ok(cat_reply(
        params,
        rows,
        &["health", "status", "index", "uuid", "pri", "rep", "docs.count", "docs.deleted"],
    ))
}

pub async fn cat_indices_all(State(db): State<Db>, Query(params): Params) -> Result<Response, EsFailure> {
    run_cat_indices(&db, "*", &params).await
}

pub async fn cat_indices(
    State(db): State<Db>,
    Path(pattern): Path<String>,
    Query(params): Params,
) -> Result<Response, EsFailure> {
    run_cat_indices(&db, &pattern, &params).await
}

pub async fn cat_health(State(db): State<Db>, Query(params): Params) -> Response {
    let store = db.read().await;
    let shard_count = store.indices.len().to_string();
    let row = json!({
        "cluster": CLUSTER_NAME,
        "status": "green",
        "node.total": "1",
        "node.data": "1",
        "shards": shard_count,
        "pri": shard_count,
        "relo": "0",
        "init": "0",
        "unassign": "0",
        "pending_tasks": "0",
        "active_shards_percent": "100.0%",
    });
    cat_reply(&params, vec![row], &["cluster", "status", "node.total", "shards", "active_shards_percent"])
}

async fn run_cluster_health(db: &Db, target: &str) -> Reply {
    let store = db.read().await;
    let names = store.resolve(target)?;
    Ok(Json(json!({
        "cluster_name": CLUSTER_NAME,
        "status": "green",
        "timed_out": false,
        "number_of_nodes": 1,
        "number_of_data_nodes": 1,
        "active_primary_shards": names.len(),
        "active_shards": names.len(),
        "relocating_shards": 0,
        "initializing_shards": 0,
        "unassigned_shards": 0,
        "number_of_pending_tasks": 0,
        "active_shards_percent_as_number": 100.0,
    })))
}

pub async fn cluster_health_all(State(db): State<Db>) -> Reply {
    run_cluster_health(&db, "_all").await
}

pub async fn cluster_health(State(db): State<Db>, Path(index): Path<String>) -> Reply {
    run_cluster_health(&db, &index).await
}
