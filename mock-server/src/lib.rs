//! In-memory stand-in for an Elasticsearch node.
//!
//! Speaks the part of the REST contract the client's catalog uses: index
//! lifecycle, documents, URI and DSL search, count, bulk, aliases, reindex,
//! update by query, tasks, scroll, cat and cluster health. Documents are
//! searchable as soon as they are written.

mod handlers;
pub mod store;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub use store::Store;

pub type Db = Arc<RwLock<Store>>;

/// An error response shaped like Elasticsearch's.
#[derive(Debug, Clone)]
pub struct EsFailure {
    pub status: StatusCode,
    pub body: Value,
}

impl EsFailure {
    pub fn new(status: StatusCode, kind: &str, reason: String) -> Self {
        Self {
            status,
            body: json!({
                "error": {
                    "root_cause": [{ "type": kind, "reason": reason }],
                    "type": kind,
                    "reason": reason,
                },
                "status": status.as_u16(),
            }),
        }
    }

    /// A non-error body sent with an error status, e.g. `{"found": false}`.
    pub fn raw(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    pub fn index_not_found(index: &str) -> Self {
        let mut failure = Self::new(
            StatusCode::NOT_FOUND,
            "index_not_found_exception",
            format!("no such index [{index}]"),
        );
        failure.body["error"]["index"] = json!(index);
        failure
    }

    pub fn index_closed(index: &str) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "index_closed_exception",
            format!("closed index [{index}]"),
        )
    }
}

impl IntoResponse for EsFailure {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    use handlers::*;
    Router::new()
        .route("/_search", get(search_all).post(search_all))
        .route("/_search/scroll", post(scroll).delete(clear_scroll))
        .route("/_count", get(count_all).post(count_all))
        .route("/_bulk", post(bulk_all))
        .route("/_refresh", post(refresh_all))
        .route("/_reindex", post(reindex))
        .route("/_update_by_query", post(update_by_query_all))
        .route("/_tasks/{task_id}", get(get_task))
        .route("/_aliases", post(update_aliases))
        .route("/_alias/{name}", get(get_alias).head(exists_alias))
        .route("/_cat/indices", get(cat_indices_all))
        .route("/_cat/indices/{pattern}", get(cat_indices))
        .route("/_cat/health", get(cat_health))
        .route("/_cluster/health", get(cluster_health_all))
        .route("/_cluster/health/{index}", get(cluster_health))
        .route("/_scripts/{id}", put(put_script).post(put_script).get(get_script))
        .route(
            "/{index}",
            put(create_index).head(exists_index).get(get_index).delete(delete_index),
        )
        .route("/{index}/_open", post(open_index))
        .route("/{index}/_close", post(close_index))
        .route("/{index}/_stats", get(index_stats_all))
        .route("/{index}/_stats/{metric}", get(index_stats))
        .route("/{index}/_mapping", put(put_mapping).get(get_mapping))
        .route("/{index}/_settings", put(put_settings).get(get_settings))
        .route("/{index}/_search", get(search).post(search))
        .route("/{index}/_count", get(count).post(count))
        .route("/{index}/_bulk", post(bulk))
        .route("/{index}/_refresh", post(refresh))
        .route("/{index}/_update_by_query", post(update_by_query))
        .route("/{index}/_aliases/{alias}", put(put_alias).post(put_alias))
        .route("/{index}/_source/{id}", get(get_source))
        .route("/{index}/_update/{id}", post(update_document))
        .route("/{index}/{doc_type}", post(create_document_auto_id))
        .route(
            "/{index}/{doc_type}/{id}",
            put(index_document)
                .post(index_document)
                .head(exists_document)
                .get(get_document)
                .delete(delete_document),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

