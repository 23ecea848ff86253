//! In-memory cluster state and the small slice of query matching the mock
//! understands.

use std::collections::{BTreeMap, HashMap};

use serde_json::{json, Map, Value};

use crate::EsFailure;

#[derive(Debug, Clone)]
pub struct Doc {
    pub source: Value,
    pub version: u64,
    pub seq_no: u64,
}

#[derive(Debug, Clone)]
pub struct Index {
    pub uuid: String,
    pub docs: BTreeMap<String, Doc>,
    pub settings: Value,
    pub mappings: Value,
    pub aliases: BTreeMap<String, Value>,
    pub open: bool,
    next_seq_no: u64,
}

impl Index {
    pub fn new(body: &Value) -> Self {
        let mut index = Self {
            uuid: uuid::Uuid::new_v4().simple().to_string(),
            docs: BTreeMap::new(),
            settings: body.get("settings").cloned().unwrap_or_else(|| json!({})),
            mappings: body.get("mappings").cloned().unwrap_or_else(|| json!({})),
            aliases: BTreeMap::new(),
            open: true,
            next_seq_no: 0,
        };
        if let Some(Value::Object(aliases)) = body.get("aliases") {
            for (name, definition) in aliases {
                index.aliases.insert(name.clone(), definition.clone());
            }
        }
        index
    }

    /// Insert or replace a document; returns the stored copy and whether it
    /// was newly created.
    pub fn put(&mut self, id: &str, source: Value) -> (Doc, bool) {
        let seq_no = self.next_seq_no;
        self.next_seq_no += 1;
        let (version, created) = match self.docs.get(id) {
            Some(existing) => (existing.version + 1, false),
            None => (1, true),
        };
        let doc = Doc {
            source,
            version,
            seq_no,
        };
        self.docs.insert(id.to_string(), doc.clone());
        (doc, created)
    }
}

/// A search whose later pages are still waiting to be fetched.
#[derive(Debug, Clone)]
pub struct ScrollCursor {
    pub remaining: Vec<Value>,
    pub size: usize,
    pub total: usize,
}

#[derive(Debug, Default)]
pub struct Store {
    pub indices: BTreeMap<String, Index>,
    pub scripts: HashMap<String, Value>,
    pub tasks: HashMap<String, Value>,
    pub scrolls: HashMap<String, ScrollCursor>,
    next_task: u64,
}

impl Store {
    /// Expand a path target (`a,b`, `_all`, `*`, `logs-*`, an alias) into
    /// concrete index names. Missing concrete names are an error; patterns
    /// that match nothing are not.
    pub fn resolve(&self, target: &str) -> Result<Vec<String>, EsFailure> {
        let mut names = Vec::new();
        for part in target.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if part == "_all" || part == "*" {
                names.extend(self.indices.keys().cloned());
            } else if part.contains('*') {
                names.extend(self.indices.keys().filter(|name| glob(part, name)).cloned());
            } else if self.indices.contains_key(part) {
                names.push(part.to_string());
            } else {
                let aliased: Vec<String> = self
                    .indices
                    .iter()
                    .filter(|(_, index)| index.aliases.contains_key(part))
                    .map(|(name, _)| name.clone())
                    .collect();
                if aliased.is_empty() {
                    return Err(EsFailure::index_not_found(part));
                }
                names.extend(aliased);
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    pub fn index(&self, name: &str) -> Result<&Index, EsFailure> {
        self.indices.get(name).ok_or_else(|| EsFailure::index_not_found(name))
    }

    pub fn index_mut(&mut self, name: &str) -> Result<&mut Index, EsFailure> {
        self.indices.get_mut(name).ok_or_else(|| EsFailure::index_not_found(name))
    }

    /// Like `index`, but a closed index is an error too.
    pub fn open_index(&self, name: &str) -> Result<&Index, EsFailure> {
        let index = self.index(name)?;
        if !index.open {
            return Err(EsFailure::index_closed(name));
        }
        Ok(index)
    }

    /// Documents are written into missing indices by creating them, the way
    /// a cluster with automatic index creation behaves.
    pub fn index_or_create(&mut self, name: &str) -> Result<&mut Index, EsFailure> {
        validate_index_name(name)?;
        let index = self
            .indices
            .entry(name.to_string())
            .or_insert_with(|| Index::new(&json!({})));
        if !index.open {
            return Err(EsFailure::index_closed(name));
        }
        Ok(index)
    }

    pub fn register_task(&mut self, action: &str, response: Value) -> String {
        self.next_task += 1;
        let id = format!("mock-node:{}", self.next_task);
        self.tasks.insert(
            id.clone(),
            json!({
                "completed": true,
                "task": { "node": "mock-node", "id": self.next_task, "action": action },
                "response": response,
            }),
        );
        id
    }

    /// Every hit matching `query` across `names`, ordered by index then id.
    pub fn matching_hits(&self, names: &[String], query: &Query) -> Result<Vec<Value>, EsFailure> {
        let mut hits = Vec::new();
        for name in names {
            let index = self.open_index(name)?;
            for (id, doc) in &index.docs {
                if query.matches(&doc.source) {
                    hits.push(json!({
                        "_index": name,
                        "_id": id,
                        "_score": 1.0,
                        "_source": doc.source,
                    }));
                }
            }
        }
        Ok(hits)
    }
}

pub fn validate_index_name(name: &str) -> Result<(), EsFailure> {
    let invalid = name.is_empty()
        || name.starts_with(['_', '-', '+'])
        || name.chars().any(|c| c.is_uppercase() || "\\/*?\"<>| ,#:".contains(c));
    if invalid {
        return Err(EsFailure::new(
            axum::http::StatusCode::BAD_REQUEST,
            "invalid_index_name_exception",
            format!("Invalid index name [{name}]"),
        ));
    }
    Ok(())
}

fn glob(pattern: &str, name: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    let mut rest = name;
    for (i, part) in parts.iter().enumerate() {
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(after) => rest = after,
                None => return false,
            }
        } else if i == parts.len() - 1 {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(at) => rest = &rest[at + part.len()..],
                None => return false,
            }
        }
    }
    rest.is_empty()
}

/// The supported query shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    All,
    /// Exact value on one field.
    Term { field: String, value: Value },
    /// Case-insensitive token match on one field.
    Match { field: String, text: String },
    /// `q=value` without a field: any top-level field equal to it.
    AnyField(String),
}

impl Query {
    /// Parse a Lucene-style `q` parameter: `*`, `field:value` or `value`.
    pub fn from_uri(q: &str) -> Self {
        let q = q.trim();
        if q.is_empty() || q == "*" || q == "*:*" {
            return Query::All;
        }
        match q.split_once(':') {
            Some((field, value)) => Query::Match {
                field: field.to_string(),
                text: value.trim_matches('"').to_string(),
            },
            None => Query::AnyField(q.to_string()),
        }
    }

    /// Parse a query DSL object; `None` or `null` means match all.
    pub fn from_dsl(query: Option<&Value>) -> Result<Self, EsFailure> {
        let Some(query) = query.filter(|q| !q.is_null()) else {
            return Ok(Query::All);
        };
        let Some((kind, clause)) = query.as_object().and_then(|o| o.iter().next()) else {
            return Err(parsing_failure("query must be an object with one clause"));
        };
        match kind.as_str() {
            "match_all" => Ok(Query::All),
            "term" => {
                let (field, value) = single_field(clause)?;
                let value = value.get("value").cloned().unwrap_or_else(|| value.clone());
                Ok(Query::Term { field, value })
            }
            "match" => {
                let (field, value) = single_field(clause)?;
                let value = value.get("query").unwrap_or(value);
                Ok(Query::Match {
                    field,
                    text: scalar_text(value),
                })
            }
            other => Err(parsing_failure(&format!("unknown query [{other}]"))),
        }
    }

    pub fn matches(&self, source: &Value) -> bool {
        match self {
            Query::All => true,
            Query::Term { field, value } => lookup(source, field) == Some(value),
            Query::Match { field, text } => lookup(source, field).is_some_and(|v| text_matches(v, text)),
            Query::AnyField(text) => source
                .as_object()
                .is_some_and(|fields| fields.values().any(|v| text_matches(v, text))),
        }
    }
}

fn single_field(clause: &Value) -> Result<(String, &Value), EsFailure> {
    clause
        .as_object()
        .and_then(|o| o.iter().next())
        .map(|(field, value)| (field.clone(), value))
        .ok_or_else(|| parsing_failure("query clause must name a field"))
}

fn parsing_failure(reason: &str) -> EsFailure {
    EsFailure::new(axum::http::StatusCode::BAD_REQUEST, "parsing_exception", reason.to_string())
}

/// Dotted field lookup, e.g. `customer.name`.
fn lookup<'a>(source: &'a Value, field: &str) -> Option<&'a Value> {
    field.split('.').try_fold(source, |value, key| value.get(key))
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn text_matches(value: &Value, text: &str) -> bool {
    match value {
        Value::Array(items) => items.iter().any(|item| text_matches(item, text)),
        Value::String(s) => {
            let wanted = text.to_lowercase();
            s.to_lowercase() == wanted || s.split_whitespace().any(|token| token.to_lowercase() == wanted)
        }
        other => scalar_text(other) == text,
    }
}

/// Shallow-merge `patch` into `target`, recursing into nested objects.
pub fn merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                merge(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

pub fn shards(count: usize) -> Value {
    json!({ "total": count, "successful": count, "skipped": 0, "failed": 0 })
}

pub fn empty_object() -> Value {
    Value::Object(Map::new())
}
