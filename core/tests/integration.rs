//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `Client` over real
//! HTTP with `UreqTransport`. Validates that request building, dispatch and
//! response classification agree with an Elasticsearch-shaped server.

use std::io::{Read, Write};
use std::time::Duration;

use es_client::{BulkAction, Client, ClientConfig, EsError, Params, TransportError, UreqTransport};
use serde_json::json;

fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

/// Answer the first connection with a canned raw HTTP response.
fn raw_server(response: Vec<u8>) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        stream.write_all(&response).unwrap();
    });

    format!("http://{addr}")
}

/// A listener that completes the TCP handshake but never answers. Keep the
/// returned listener alive for the duration of the test.
fn silent_server() -> (std::net::TcpListener, String) {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    (listener, url)
}

fn assert_timed_out(err: EsError) {
    assert!(err.is_transport());
    assert_eq!(err.status(), 500);
    match err {
        EsError::Transport {
            source: TransportError::Timeout,
            ..
        } => {}
        other => panic!("expected timeout, got {other:?}"),
    }
}

fn client() -> Client<UreqTransport> {
    let config = ClientConfig::new(&start_server()).with_timeout(Duration::from_secs(10));
    let transport = UreqTransport::new(&config);
    Client::new(config, transport)
}

fn none() -> Params {
    Params::new()
}

fn refresh() -> Params {
    Params::new().param("refresh", "true")
}

#[test]
fn orders_scenario() {
    let es = client();

    // Step 1: create the index.
    let created = es.create_index("orders", None, &none()).unwrap().unwrap();
    assert_eq!(created["acknowledged"], true);
    assert_eq!(created["index"], "orders");
    assert!(es.exists_index("orders", &none()).unwrap());

    // Step 2: index a document with an explicit id.
    let indexed = es.index_document("orders", "1", &json!({"sku": "X1"}), &refresh()).unwrap().unwrap();
    assert_eq!(indexed["_index"], "orders");
    assert_eq!(indexed["_id"], "1");
    assert_eq!(indexed["result"], "created");

    // Step 3: read it back.
    let doc = es.get_document("orders", "1", &none()).unwrap().unwrap();
    assert_eq!(doc["_id"], "1");
    assert_eq!(doc["found"], true);
    assert_eq!(doc["_source"], json!({"sku": "X1"}));
    assert!(es.exists_document("orders", "1", &none()).unwrap());
    assert!(!es.exists_document("orders", "2", &none()).unwrap());

    // Step 4: delete the index.
    let deleted = es.delete_index("orders", &none()).unwrap().unwrap();
    assert_eq!(deleted["acknowledged"], true);
    assert!(!es.exists_index("orders", &none()).unwrap());
}

#[test]
fn empty_id_gets_server_assigned_id() {
    let es = client();
    let indexed = es.index_document("orders", "", &json!({"sku": "X1"}), &none()).unwrap().unwrap();
    assert_eq!(indexed["result"], "created");
    let id = indexed["_id"].as_str().unwrap();
    assert!(!id.is_empty());

    let source = es.get_source("orders", id, &none()).unwrap().unwrap();
    assert_eq!(source["sku"], "X1");
}

#[test]
fn unicode_round_trips() {
    let es = client();
    let doc = json!({"name": "Zoë", "city": "東京"});
    es.index_document("people", "z", &doc, &refresh()).unwrap();
    let fetched = es.get_document("people", "z", &none()).unwrap().unwrap();
    assert_eq!(fetched["_source"], doc);
}

#[test]
fn get_with_source_disabled() {
    let es = client();
    es.index_document("orders", "1", &json!({"sku": "X1"}), &none()).unwrap();
    let doc = es
        .get_document("orders", "1", &Params::new().param("_source", "false"))
        .unwrap()
        .unwrap();
    assert_eq!(doc["found"], true);
    assert!(doc.get("_source").is_none());
}

#[test]
fn missing_document_is_not_found() {
    let es = client();
    es.create_index("orders", None, &none()).unwrap();
    let err = es.get_document("orders", "nope", &none()).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.data(), None);

    let err = es.delete_document("orders", "nope", &none()).unwrap_err();
    assert_eq!(err.status(), 404);
}

#[test]
fn error_body_carries_type_and_reason() {
    let es = client();
    es.create_index("orders", None, &none()).unwrap();
    let err = es.create_index("orders", None, &none()).unwrap_err();
    assert_eq!(err.status(), 400);
    assert_eq!(err.error_type(), Some("resource_already_exists_exception"));
    assert!(err.reason().unwrap().contains("orders"));

    let err = es.get_index("missing", &none()).unwrap_err();
    assert!(matches!(err, EsError::NotFound { .. }));
    assert_eq!(err.error_type(), Some("index_not_found_exception"));
}

#[test]
fn search_variants_and_count_agree() {
    let es = client();
    for (id, color) in [("1", "red"), ("2", "red"), ("3", "blue")] {
        es.index_document("orders", id, &json!({"color": color}), &none()).unwrap();
    }
    es.index_document("archive", "9", &json!({"color": "red"}), &none()).unwrap();
    es.refresh(&["orders", "archive"], &none()).unwrap();

    let one = es.uri_search_one_index("orders", "color:red", &none()).unwrap().unwrap();
    assert_eq!(one["hits"]["hits"].as_array().unwrap().len(), 2);

    let many = es
        .uri_search_many_indices(&["orders", "archive"], "color:red", &none())
        .unwrap()
        .unwrap();
    assert_eq!(many["hits"]["total"]["value"], 3);

    let all = es.uri_search_all_indices("color:red", &none()).unwrap().unwrap();
    assert_eq!(all["hits"]["total"]["value"], 3);

    let structured = es
        .search_query(&["orders"], &json!({"term": {"color": "red"}}), &none())
        .unwrap()
        .unwrap();
    assert_eq!(structured["hits"]["total"]["value"], 2);

    let count = es
        .count(&["orders"], Some(&json!({"match": {"color": "red"}})), &none())
        .unwrap()
        .unwrap();
    assert_eq!(count["count"], 2);
}

#[test]
fn bulk_batches_add_up() {
    let es = client();
    let total = 25;
    let ids: Vec<String> = (0..total).map(|i| i.to_string()).collect();
    for batch in ids.chunks(10) {
        let actions: Vec<BulkAction> = batch
            .iter()
            .map(|id| BulkAction::index(id.clone(), json!({"n": id})))
            .collect();
        let response = es.bulk(Some("numbers"), &actions, &none()).unwrap().unwrap();
        assert_eq!(response["errors"], false);
        assert_eq!(response["items"].as_array().unwrap().len(), batch.len());
    }
    es.refresh(&["numbers"], &none()).unwrap();

    let count = es.count(&["numbers"], None, &none()).unwrap().unwrap();
    assert_eq!(count["count"], total);
}

#[test]
fn aliases() {
    let es = client();
    es.create_index("orders-v1", None, &none()).unwrap();
    assert!(!es.exists_alias("orders", &none()).unwrap());
    assert_eq!(es.get_aliases("orders-v1", &none()).unwrap()["orders-v1"]["aliases"], json!({}));

    es.update_aliases(&json!([{"add": {"index": "orders-v1", "alias": "orders"}}]), &none())
        .unwrap();
    assert!(es.exists_alias("orders", &none()).unwrap());

    es.put_alias("orders-v1", "red-orders", Some(&json!({"filter": {"term": {"color": "red"}}})), &none())
        .unwrap();
    let aliases = es.get_aliases("orders-v1", &none()).unwrap();
    assert!(aliases["orders-v1"]["aliases"]["red-orders"]["filter"].is_object());

    assert_eq!(es.get_aliases("nothing-here", &none()).unwrap(), json!({}));
}

#[test]
fn reindex_and_task() {
    let es = client();
    es.index_document("src", "1", &json!({"a": 1}), &none()).unwrap();
    es.index_document("src", "2", &json!({"a": 2}), &none()).unwrap();

    let response = es
        .reindex(
            &json!({"source": {"index": "src"}, "dest": {"index": "dst"}}),
            &Params::new().param("wait_for_completion", "false"),
        )
        .unwrap()
        .unwrap();
    let task_id = response["task"].as_str().unwrap();

    let task = es.get_task(task_id, &none()).unwrap().unwrap();
    assert_eq!(task["completed"], true);
    assert_eq!(es.count(&["dst"], None, &none()).unwrap().unwrap()["count"], 2);
}

#[test]
fn update_by_query_and_partial_update() {
    let es = client();
    es.index_document("orders", "1", &json!({"status": "new", "qty": 1}), &none()).unwrap();
    es.index_document("orders", "2", &json!({"status": "new", "qty": 2}), &none()).unwrap();

    let response = es
        .update_by_query(
            &["orders"],
            &json!({
                "query": {"term": {"status": "new"}},
                "script": {"source": "ctx._source.status = params.s", "params": {"s": "shipped"}},
            }),
            &none(),
        )
        .unwrap()
        .unwrap();
    assert_eq!(response["updated"], 2);

    es.update_document("orders", "1", &json!({"doc": {"qty": 7}}), &none()).unwrap();
    let source = es.get_source("orders", "1", &none()).unwrap().unwrap();
    assert_eq!(source, json!({"status": "shipped", "qty": 7}));
}

#[test]
fn index_management() {
    let es = client();
    es.create_index(
        "orders",
        Some(&json!({"settings": {"number_of_shards": 1}, "mappings": {"properties": {}}})),
        &none(),
    )
    .unwrap();
    es.put_mapping("orders", &json!({"sku": {"type": "keyword"}}), &none()).unwrap();
    es.put_settings("orders", &json!({"index": {"refresh_interval": "5s"}}), &none()).unwrap();

    let index = es.get_index("orders", &none()).unwrap().unwrap();
    assert_eq!(index["orders"]["mappings"]["properties"]["sku"]["type"], "keyword");
    assert_eq!(index["orders"]["settings"]["index"]["refresh_interval"], "5s");

    es.close_index("orders", &none()).unwrap();
    assert_eq!(es.get_document("orders", "1", &none()).unwrap_err().status(), 400);
    es.open_index("orders", &none()).unwrap();

    es.index_document("orders", "1", &json!({"sku": "X1"}), &none()).unwrap();
    let stats = es.index_stats("orders", Some("docs"), &none()).unwrap().unwrap();
    assert_eq!(stats["indices"]["orders"]["primaries"]["docs"]["count"], 1);

    let script = json!({"script": {"lang": "painless", "source": "ctx._source.qty += 1"}});
    assert_eq!(es.put_script("bump", &script, &none()).unwrap().unwrap()["acknowledged"], true);
}

#[test]
fn cat_and_cluster_health() {
    let es = client();
    es.create_index("orders", None, &none()).unwrap();

    let indices = es.cat_indices(Some("ord*"), &none()).unwrap().unwrap();
    assert_eq!(indices[0]["index"], "orders");

    let health = es.cat_health(&none()).unwrap().unwrap();
    assert_eq!(health[0]["status"], "green");

    let cluster = es.cluster_health(None, &none()).unwrap().unwrap();
    assert_eq!(cluster["status"], "green");
}

#[test]
fn scroll_through_results() {
    let es = client();
    let actions: Vec<BulkAction> = (0..5).map(|i| BulkAction::index(i.to_string(), json!({"i": i}))).collect();
    es.bulk(Some("items"), &actions, &refresh()).unwrap();

    let first = es
        .search(&["items"], &json!({"size": 2}), &Params::new().param("scroll", "1m"))
        .unwrap()
        .unwrap();
    let scroll_id = first["_scroll_id"].as_str().unwrap().to_string();
    let mut seen = first["hits"]["hits"].as_array().unwrap().len();

    loop {
        let page = es.scroll(&scroll_id, "1m", &none()).unwrap().unwrap();
        let hits = page["hits"]["hits"].as_array().unwrap().len();
        if hits == 0 {
            break;
        }
        seen += hits;
    }
    assert_eq!(seen, 5);

    let cleared = es.clear_scroll(&[&scroll_id], &none()).unwrap().unwrap();
    assert_eq!(cleared["num_freed"], 1);
}

#[test]
fn connection_refused_is_transport_failure() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let es = Client::connect(&format!("http://127.0.0.1:{port}"));
    let err = es
        .index_document("orders", "1", &json!({"sku": "X1"}), &none())
        .unwrap_err();
    assert!(err.is_transport());
    assert_eq!(err.status(), 500);
    match err {
        EsError::Transport { request_body, .. } => assert_eq!(request_body.as_deref(), Some(r#"{"sku":"X1"}"#)),
        other => panic!("expected transport failure, got {other:?}"),
    }
}

#[test]
fn non_utf8_error_page_keeps_its_status() {
    let body: &[u8] = b"<html>\xff\xfe bad gateway</html>";
    let mut response = format!(
        "HTTP/1.1 502 Bad Gateway\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);

    let es = Client::connect(&raw_server(response));
    let err = es.get_index("orders", &none()).unwrap_err();
    assert!(!err.is_transport());
    assert_eq!(err.status(), 502);
    assert!(matches!(err, EsError::Status { status: 502, .. }));
    let raw = err.body().unwrap();
    assert!(raw.contains("bad gateway"));
    assert!(raw.contains('\u{FFFD}'));
}

#[test]
fn per_call_timeout_is_a_transport_failure() {
    let (_listener, url) = silent_server();
    let es = Client::connect(&url);
    let err = es
        .get_index("orders", &Params::new().timeout(Duration::from_millis(200)))
        .unwrap_err();
    assert_timed_out(err);
}

#[test]
fn configured_timeout_is_a_transport_failure() {
    let (_listener, url) = silent_server();
    let config = ClientConfig::new(&url).with_timeout(Duration::from_millis(200));
    let transport = UreqTransport::new(&config);
    let es = Client::new(config, transport);
    assert_timed_out(es.exists_index("orders", &none()).unwrap_err());
}
