//! Verify the operation catalog and response classification against JSON test
//! vectors stored in `test-vectors/`.
//!
//! `requests.json` names a catalog operation, its arguments and the request it
//! must render. `responses.json` lists simulated responses and how they must
//! be classified. Bodies are compared as parsed JSON, not raw strings, so
//! field order does not matter.

use es_client::{catalog, parse_exists, parse_response, Endpoint, EsError, HttpMethod, HttpResponse, Params};
use serde_json::Value;

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "HEAD" => HttpMethod::Head,
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn str_arg<'a>(args: &'a Value, key: &str) -> &'a str {
    args[key].as_str().unwrap_or_else(|| panic!("missing string argument {key}"))
}

fn opt_str_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

fn indices_arg(args: &Value) -> Vec<&str> {
    args["indices"].as_array().unwrap().iter().map(|v| v.as_str().unwrap()).collect()
}

fn params_arg(args: &Value) -> Params {
    match args.get("params").and_then(Value::as_object) {
        Some(map) => map.iter().map(|(k, v)| (k.as_str(), v.as_str().unwrap())).collect(),
        None => Params::new(),
    }
}

/// Map a vector's operation name onto the catalog.
fn build(operation: &str, args: &Value) -> Result<Endpoint, EsError> {
    let params = params_arg(args);
    let body = args.get("body");
    match operation {
        "create_index" => catalog::create_index(str_arg(args, "index"), body, &params),
        "exists_index" => catalog::exists_index(str_arg(args, "index"), &params),
        "delete_index" => catalog::delete_index(str_arg(args, "index"), &params),
        "index_stats" => catalog::index_stats(str_arg(args, "index"), opt_str_arg(args, "metric"), &params),
        "put_mapping" => catalog::put_mapping(str_arg(args, "index"), body.unwrap(), &params),
        "get_task" => catalog::get_task(str_arg(args, "id"), &params),
        "index_document" => catalog::index_document(
            str_arg(args, "index"),
            opt_str_arg(args, "type").unwrap_or(catalog::DEFAULT_TYPE),
            str_arg(args, "id"),
            body.unwrap(),
            &params,
        ),
        "get_document" => {
            catalog::get_document(str_arg(args, "index"), catalog::DEFAULT_TYPE, str_arg(args, "id"), &params)
        }
        "get_source" => catalog::get_source(str_arg(args, "index"), str_arg(args, "id"), &params),
        "delete_document" => {
            catalog::delete_document(str_arg(args, "index"), catalog::DEFAULT_TYPE, str_arg(args, "id"), &params)
        }
        "update_document" => {
            catalog::update_document(str_arg(args, "index"), str_arg(args, "id"), body.unwrap(), &params)
        }
        "uri_search" => catalog::uri_search(&indices_arg(args), str_arg(args, "query"), &params),
        "search_query" => catalog::search_query(&indices_arg(args), body.unwrap(), &params),
        "count" => catalog::count(&indices_arg(args), body, &params),
        "scroll" => catalog::scroll(str_arg(args, "id"), str_arg(args, "scroll"), &params),
        "clear_scroll" => {
            let ids: Vec<&str> = args["ids"].as_array().unwrap().iter().map(|v| v.as_str().unwrap()).collect();
            catalog::clear_scroll(&ids, &params)
        }
        "bulk_lines" => {
            let lines = args["actions"].as_array().unwrap();
            catalog::bulk_lines(opt_str_arg(args, "index"), lines, &params)
        }
        "reindex" => catalog::reindex(body.unwrap(), &params),
        "update_by_query" => catalog::update_by_query(&indices_arg(args), body.unwrap(), &params),
        "update_aliases" => catalog::update_aliases(body.unwrap(), &params),
        "get_aliases" => catalog::get_aliases(str_arg(args, "index"), &params),
        "cat_indices" => catalog::cat_indices(opt_str_arg(args, "pattern"), &params),
        "cluster_health" => catalog::cluster_health(opt_str_arg(args, "index"), &params),
        other => panic!("unknown operation: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let base_url = vectors["base_url"].as_str().unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let built = build(case["operation"].as_str().unwrap(), &case["args"]);

        if let Some(expected_error) = case.get("expected_error") {
            let err = built.unwrap_err();
            match expected_error.as_str().unwrap() {
                "InvalidArgument" => {
                    assert!(matches!(err, EsError::InvalidArgument(_)), "{name}: expected InvalidArgument")
                }
                other => panic!("{name}: unknown expected_error: {other}"),
            }
            continue;
        }

        let expected = &case["expected_request"];
        let req = built.unwrap().to_request(base_url, None);

        assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(
            req.url,
            format!("http://localhost:9200{}", expected["path"].as_str().unwrap()),
            "{name}: url"
        );
        assert_eq!(
            req.header("content-type"),
            expected["content_type"].as_str(),
            "{name}: content type"
        );
        assert_eq!(req.header("accept"), Some("application/json"), "{name}: accept");

        if let Some(body) = expected.get("body") {
            let sent: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
            assert_eq!(&sent, body, "{name}: body");
        } else if let Some(lines) = expected.get("ndjson") {
            let sent = req.body.as_deref().unwrap();
            assert!(sent.ends_with('\n'), "{name}: ndjson must end with a newline");
            let sent: Vec<Value> = sent.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
            assert_eq!(&Value::Array(sent), lines, "{name}: ndjson lines");
        } else {
            assert!(req.body.is_none(), "{name}: body should be None");
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[test]
fn response_test_vectors() {
    let raw = include_str!("../../test-vectors/responses.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["responses"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let status = case["status"].as_u64().unwrap() as u16;
        let response = HttpResponse::new(status, case["body"].as_str().unwrap());
        let expected = &case["expected"];
        let result = parse_response(response);

        match expected["kind"].as_str().unwrap() {
            "value" => assert_eq!(result.unwrap().as_ref(), Some(&expected["value"]), "{name}: value"),
            "none" => assert_eq!(result.unwrap(), None, "{name}: empty"),
            kind => {
                let err = result.unwrap_err();
                match kind {
                    "not_found" => assert!(matches!(err, EsError::NotFound { .. }), "{name}: expected NotFound"),
                    "status" => assert!(matches!(err, EsError::Status { .. }), "{name}: expected Status"),
                    "deserialization" => {
                        assert!(matches!(err, EsError::Deserialization { .. }), "{name}: expected Deserialization")
                    }
                    other => panic!("{name}: unknown kind: {other}"),
                }
                if let Some(status) = expected["status"].as_u64() {
                    assert_eq!(u64::from(err.status()), status, "{name}: status");
                }
                assert_eq!(err.error_type(), expected["error_type"].as_str(), "{name}: error type");
                assert_eq!(err.reason(), expected["reason"].as_str(), "{name}: reason");
                assert_eq!(err.body(), case["body"].as_str(), "{name}: body kept");
            }
        }
    }
}

#[test]
fn exists_test_vectors() {
    let raw = include_str!("../../test-vectors/responses.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["exists"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let status = case["status"].as_u64().unwrap() as u16;
        let result = parse_exists(HttpResponse::new(status, ""));

        match case.get("expected").and_then(Value::as_bool) {
            Some(expected) => assert_eq!(result.unwrap(), expected, "{name}: exists"),
            None => {
                let err = result.unwrap_err();
                assert_eq!(u64::from(err.status()), case["expected_error_status"].as_u64().unwrap(), "{name}");
            }
        }
    }
}
