//! JSON and NDJSON encoding of request bodies, decoding of response bodies.
//!
//! `serde_json` writes non-ASCII characters as literal UTF-8, so bodies stay
//! readable and byte-stable without any extra configuration.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::EsError;

pub fn encode_json<T: Serialize + ?Sized>(body: &T) -> Result<String, EsError> {
    Ok(serde_json::to_string(body)?)
}

/// Encode each document on its own line, every line ending in `\n`.
pub fn encode_ndjson<T: Serialize>(lines: &[T]) -> Result<String, EsError> {
    let mut out = String::new();
    for line in lines {
        out.push_str(&serde_json::to_string(line)?);
        out.push('\n');
    }
    Ok(out)
}

/// Decode a successful response body.
///
/// Empty bodies (HEAD responses, some acknowledgements) and the literal
/// `null` decode to `None`.
pub fn decode_body(status: u16, body: &str) -> Result<Option<Value>, EsError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Null) => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(source) => Err(EsError::Deserialization {
            status,
            body: body.to_string(),
            source,
        }),
    }
}

/// One action in a bulk request.
///
/// `index` is optional: when the bulk call targets `/{index}/_bulk` the
/// per-action `_index` can be left out.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkAction {
    Index {
        index: Option<String>,
        id: Option<String>,
        source: Value,
    },
    Create {
        index: Option<String>,
        id: Option<String>,
        source: Value,
    },
    Update {
        index: Option<String>,
        id: String,
        doc: Value,
    },
    Delete {
        index: Option<String>,
        id: String,
    },
}

impl BulkAction {
    pub fn index(id: impl Into<String>, source: Value) -> Self {
        BulkAction::Index {
            index: None,
            id: Some(id.into()),
            source,
        }
    }

    pub fn delete(id: impl Into<String>) -> Self {
        BulkAction::Delete {
            index: None,
            id: id.into(),
        }
    }

    /// Target a specific index instead of the one in the URL.
    pub fn in_index(mut self, name: impl Into<String>) -> Self {
        let name = Some(name.into());
        match &mut self {
            BulkAction::Index { index, .. }
            | BulkAction::Create { index, .. }
            | BulkAction::Update { index, .. }
            | BulkAction::Delete { index, .. } => *index = name,
        }
        self
    }

    /// The action/metadata line followed by the source line, if any.
    pub fn to_lines(&self) -> Vec<Value> {
        match self {
            BulkAction::Index { index, id, source } => vec![
                json!({ "index": metadata(index.as_deref(), id.as_deref()) }),
                source.clone(),
            ],
            BulkAction::Create { index, id, source } => vec![
                json!({ "create": metadata(index.as_deref(), id.as_deref()) }),
                source.clone(),
            ],
            BulkAction::Update { index, id, doc } => vec![
                json!({ "update": metadata(index.as_deref(), Some(id)) }),
                json!({ "doc": doc }),
            ],
            BulkAction::Delete { index, id } => {
                vec![json!({ "delete": metadata(index.as_deref(), Some(id)) })]
            }
        }
    }
}

fn metadata(index: Option<&str>, id: Option<&str>) -> Value {
    let mut meta = Map::new();
    if let Some(index) = index {
        meta.insert("_index".to_string(), Value::from(index));
    }
    if let Some(id) = id.filter(|id| !id.is_empty()) {
        meta.insert("_id".to_string(), Value::from(id));
    }
    Value::Object(meta)
}

/// Flatten bulk actions into NDJSON.
pub fn encode_bulk(actions: &[BulkAction]) -> Result<String, EsError> {
    let lines: Vec<Value> = actions.iter().flat_map(BulkAction::to_lines).collect();
    encode_ndjson(&lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unicode_is_not_escaped() {
        let body = encode_json(&json!({ "name": "Zoë 東京" })).unwrap();
        assert_eq!(body, r#"{"name":"Zoë 東京"}"#);
    }

    #[test]
    fn empty_body_decodes_to_none() {
        assert_eq!(decode_body(200, "").unwrap(), None);
        assert_eq!(decode_body(200, "  \n").unwrap(), None);
    }

    #[test]
    fn literal_null_decodes_to_none() {
        assert_eq!(decode_body(200, "null").unwrap(), None);
    }

    #[test]
    fn object_body_decodes() {
        let value = decode_body(200, r#"{"acknowledged":true}"#).unwrap().unwrap();
        assert_eq!(value["acknowledged"], true);
    }

    #[test]
    fn invalid_success_body_is_a_deserialization_error() {
        let err = decode_body(200, "green open orders").unwrap_err();
        assert!(matches!(err, EsError::Deserialization { status: 200, .. }));
    }

    #[test]
    fn ndjson_ends_with_newline() {
        let body = encode_ndjson(&[json!({"a": 1}), json!({"b": 2})]).unwrap();
        assert_eq!(body, "{\"a\":1}\n{\"b\":2}\n");
    }

    #[test]
    fn bulk_actions_render_metadata_and_source() {
        let actions = vec![
            BulkAction::index("1", json!({"sku": "X1"})).in_index("orders"),
            BulkAction::Update {
                index: None,
                id: "2".to_string(),
                doc: json!({"qty": 3}),
            },
            BulkAction::delete("3"),
            BulkAction::Create {
                index: None,
                id: None,
                source: json!({"sku": "X4"}),
            },
        ];
        let body = encode_bulk(&actions).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"index":{"_id":"1","_index":"orders"}}"#,
                r#"{"sku":"X1"}"#,
                r#"{"update":{"_id":"2"}}"#,
                r#"{"doc":{"qty":3}}"#,
                r#"{"delete":{"_id":"3"}}"#,
                r#"{"create":{}}"#,
                r#"{"sku":"X4"}"#,
            ]
        );
        assert!(body.ends_with('\n'));
    }
}
